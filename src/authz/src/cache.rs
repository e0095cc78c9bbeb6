//! Hot-reloading, fail-closed rule cache
//!
//! Owns the active [`RuleSet`]. Every lookup goes through [`RuleSource::current`].
//! Once the refresh period has elapsed the next lookup reloads the rule file;
//! a failed reload is remembered and returned to every caller until a later
//! reload succeeds. There is no fallback to the previous good rules.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::RuleLoadError;
use crate::rules::RuleSet;

type LoadOutcome = Result<Arc<RuleSet>, RuleLoadError>;

/// Produces a fresh rule set from the backing resource
pub type RuleLoader = Box<dyn Fn() -> Result<RuleSet, RuleLoadError> + Send + Sync>;

/// Outcome of the most recent load attempt, stamped with when it started
///
/// Swapped as a whole, so a reader never sees a rule set paired with a
/// stale failure or the other way around.
#[derive(Debug)]
pub struct CachedRuleSet {
    loaded_at: Instant,
    outcome: LoadOutcome,
}

impl CachedRuleSet {
    fn new(loaded_at: Instant, outcome: LoadOutcome) -> Self {
        Self { loaded_at, outcome }
    }

    fn is_fresh(&self, refresh_period: Duration) -> bool {
        self.loaded_at.elapsed() < refresh_period
    }

    fn outcome(&self) -> LoadOutcome {
        self.outcome.clone()
    }
}

/// Rule set reloaded from its source at most once per refresh period
pub struct ReloadingRuleSet {
    loader: RuleLoader,
    refresh_period: Duration,
    state: RwLock<Arc<CachedRuleSet>>,
    /// Serializes reload attempts
    reload_lock: Mutex<()>,
}

impl ReloadingRuleSet {
    /// Load the rules once up front; a failure here is returned immediately
    pub fn new(refresh_period: Duration, loader: RuleLoader) -> Result<Self, RuleLoadError> {
        let started = Instant::now();
        let rules = loader()?;
        Ok(Self {
            loader,
            refresh_period,
            state: RwLock::new(Arc::new(CachedRuleSet::new(started, Ok(Arc::new(rules))))),
            reload_lock: Mutex::new(()),
        })
    }

    /// Reload from a rule file
    pub fn from_file(path: PathBuf, refresh_period: Duration) -> Result<Self, RuleLoadError> {
        Self::new(
            refresh_period,
            Box::new(move || {
                info!("Refreshing access control rules from {}", path.display());
                RuleSet::load(&path)
            }),
        )
    }

    /// The active rules, or the failure recorded by the last reload
    pub fn current(&self) -> LoadOutcome {
        if let Some(outcome) = self.fresh_outcome() {
            return outcome;
        }

        let _reload = self.reload_lock.lock();

        // Another caller may have reloaded while we waited for the lock
        if let Some(outcome) = self.fresh_outcome() {
            return outcome;
        }

        // The refresh period counts from the start of the attempt
        let started = Instant::now();
        let cached = Arc::new(CachedRuleSet::new(started, (self.loader)().map(Arc::new)));
        match &cached.outcome {
            Ok(_) => debug!("access control rules reloaded"),
            Err(e) => warn!("access control rules failed to reload, denying all requests: {}", e),
        }
        *self.state.write() = Arc::clone(&cached);
        cached.outcome()
    }

    fn fresh_outcome(&self) -> Option<LoadOutcome> {
        let cached = self.state.read().clone();
        cached.is_fresh(self.refresh_period).then(|| cached.outcome())
    }
}

impl fmt::Debug for ReloadingRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadingRuleSet")
            .field("refresh_period", &self.refresh_period)
            .field("state", &*self.state.read())
            .finish()
    }
}

/// Where an authorizer gets its rules from
#[derive(Debug)]
pub enum RuleSource {
    /// Loaded once at activation and never refreshed
    Static(Arc<RuleSet>),
    Reloading(ReloadingRuleSet),
}

impl RuleSource {
    pub fn current(&self) -> LoadOutcome {
        match self {
            Self::Static(rules) => Ok(Arc::clone(rules)),
            Self::Reloading(reloading) => reloading.current(),
        }
    }
}

impl From<RuleSet> for RuleSource {
    fn from(rules: RuleSet) -> Self {
        Self::Static(Arc::new(rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    /// Loader that fails while `failing` is set and counts its calls
    fn toggled_loader(failing: Arc<AtomicBool>, loads: Arc<AtomicUsize>) -> RuleLoader {
        Box::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            if failing.load(Ordering::SeqCst) {
                Err(RuleLoadError::new("rules.json", "unknown field `bogus`"))
            } else {
                RuleSet::parse("rules.json", r#"{"catalogs": []}"#)
            }
        })
    }

    #[test]
    fn test_initial_failure_is_returned() {
        let failing = Arc::new(AtomicBool::new(true));
        let loads = Arc::new(AtomicUsize::new(0));

        let err = ReloadingRuleSet::new(Duration::from_secs(60), toggled_loader(failing, loads)).unwrap_err();
        assert_eq!(err.reason(), "unknown field `bogus`");
    }

    #[test]
    fn test_no_reload_within_refresh_period() {
        let failing = Arc::new(AtomicBool::new(false));
        let loads = Arc::new(AtomicUsize::new(0));
        let cache =
            ReloadingRuleSet::new(Duration::from_secs(60), toggled_loader(failing, loads.clone())).unwrap();

        let first = cache.current().unwrap();
        let second = cache.current().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_sticky_until_next_successful_reload() {
        let period = Duration::from_millis(100);
        let failing = Arc::new(AtomicBool::new(false));
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = ReloadingRuleSet::new(period, toggled_loader(failing.clone(), loads.clone())).unwrap();
        assert!(cache.current().is_ok());

        // Corrupt the source and let the period lapse
        failing.store(true, Ordering::SeqCst);
        thread::sleep(period * 2);
        let first_failure = cache.current().unwrap_err();
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        // Fixed source, but still inside the period: the failure sticks
        failing.store(false, Ordering::SeqCst);
        for _ in 0..5 {
            assert_eq!(cache.current().unwrap_err(), first_failure);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        thread::sleep(period * 2);
        assert!(cache.current().is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_callers_reload_once() {
        let period = Duration::from_millis(300);
        let failing = Arc::new(AtomicBool::new(false));
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(ReloadingRuleSet::new(period, toggled_loader(failing, loads.clone())).unwrap());

        thread::sleep(period * 2);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.current().is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        // One initial load plus exactly one reload for the whole burst
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_period_runs_from_start_of_load() {
        let period = Duration::from_millis(100);
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let slow_loader: RuleLoader = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(period);
            RuleSet::parse("rules.json", "{}")
        });

        let cache = ReloadingRuleSet::new(period, slow_loader).unwrap();
        assert!(cache.state.read().loaded_at.elapsed() >= period);

        // The load itself used up the whole period, so the rules are already stale
        assert!(cache.current().is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert!(cache.state.read().loaded_at.elapsed() >= period);
    }

    #[test]
    fn test_static_source_never_reloads() {
        let source = RuleSource::from(RuleSet::default());
        let a = source.current().unwrap();
        let b = source.current().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
