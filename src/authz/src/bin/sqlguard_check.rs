//! sqlguard rule checker
//!
//! Offline companion for operators editing a rule file:
//! - `validate` parses a rule file and summarizes its sections
//! - `set-user` checks whether a principal may act as a user
//! - `filter-catalogs` prints the catalogs a user can see

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlguard_authz::{FileBasedSystemAccessControl, RuleSet, RuleSource, SystemAccessControl};
use sqlguard_core::Identity;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

/// sqlguard rule checker CLI
#[derive(Parser)]
#[command(name = "sqlguard-check")]
#[command(about = "Validate and exercise sqlguard access control rules")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a rule file and print the size of each section
    Validate {
        /// Path to the JSON rule file
        rules: PathBuf,
    },

    /// Check whether a principal may act as a user
    SetUser {
        /// Path to the JSON rule file
        #[arg(long, env = "SQLGUARD_RULES")]
        rules: PathBuf,

        /// Claimed username
        #[arg(long)]
        user: String,

        /// Authenticated principal, if any
        #[arg(long)]
        principal: Option<String>,
    },

    /// Print the catalogs a user can see
    FilterCatalogs {
        /// Path to the JSON rule file
        #[arg(long, env = "SQLGUARD_RULES")]
        rules: PathBuf,

        #[arg(long)]
        user: String,

        /// Candidate catalog names
        #[arg(required = true)]
        catalogs: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},sqlguard_authz={}", log_level, log_level).into()),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the checked operation was allowed
fn run(command: Command) -> Result<bool> {
    match command {
        Command::Validate { rules } => {
            let rule_set = load(&rules)?;
            println!("{}: ok", rules.display());
            print_section("principals", rule_set.principals().map(|p| p.len()));
            print_section("catalogs", rule_set.catalogs().map(|c| c.len()));
            print_section("schemas", rule_set.schemas().map(|s| s.len()));
            print_section("tables", rule_set.tables().map(|t| t.len()));
            print_section("session_properties", rule_set.session_properties().map(|s| s.len()));
            print_section(
                "system_session_properties",
                rule_set.system_session_properties().map(|s| s.len()),
            );
            Ok(true)
        }

        Command::SetUser { rules, user, principal } => {
            let control = control(&rules)?;
            match control.check_can_set_user(principal.as_deref(), &user) {
                Ok(()) => {
                    println!("allowed");
                    Ok(true)
                }
                Err(e) if e.is_access_denied() => {
                    println!("{}", e);
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }

        Command::FilterCatalogs { rules, user, catalogs } => {
            let control = control(&rules)?;
            let candidates: BTreeSet<String> = catalogs.into_iter().collect();
            debug!("filtering {} catalogs for {}", candidates.len(), user);

            let visible = control
                .filter_catalogs(&Identity::new(user), candidates)
                .context("failed to filter catalogs")?;
            for catalog in &visible {
                println!("{}", catalog);
            }
            Ok(!visible.is_empty())
        }
    }
}

fn load(path: &Path) -> Result<RuleSet> {
    let rules = RuleSet::load(path).with_context(|| format!("failed to load rules from {}", path.display()))?;
    info!("Loaded rules from {}", path.display());
    Ok(rules)
}

fn control(path: &Path) -> Result<FileBasedSystemAccessControl> {
    Ok(FileBasedSystemAccessControl::new(RuleSource::from(load(path)?)))
}

fn print_section(name: &str, rules: Option<usize>) {
    match rules {
        Some(count) => println!("  {:<26} {} rule(s)", name, count),
        None => println!("  {:<26} absent (unrestricted)", name),
    }
}
