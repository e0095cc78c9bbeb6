//! Principal-to-user matching
//!
//! Decides whether an authenticated principal (for example the Kerberos
//! principal `alice/example.com@EXAMPLE.COM`) may act as a claimed username.
//! Rules are templates: every `${USER}` in a principal pattern is replaced by
//! the claimed username before matching. The username is always escaped
//! first, so a user called `.*` matches only the two characters `.*`.

use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use super::pattern::{matches_optional, RulePattern};

/// Placeholder substituted with the escaped username
pub const USER_PLACEHOLDER: &str = "${USER}";

/// Principal pattern that may reference the claimed username
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalTemplate {
    source: String,
}

impl PrincipalTemplate {
    /// Validate `source` by compiling it with a plain stand-in for the user
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        RulePattern::new(&source.replace(USER_PLACEHOLDER, "user"))?;
        Ok(Self {
            source: source.to_string(),
        })
    }

    /// Build the concrete pattern for `user`
    ///
    /// The username is escaped before substitution and is never spliced
    /// into the pattern as raw text.
    pub fn resolve(&self, user: &str) -> Result<RulePattern, regex::Error> {
        RulePattern::new(&self.source.replace(USER_PLACEHOLDER, &regex::escape(user)))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl<'de> Deserialize<'de> for PrincipalTemplate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        PrincipalTemplate::new(&source).map_err(|e| {
            serde::de::Error::custom(format!("invalid principal pattern '{}': {}", source, e))
        })
    }
}

/// One principal-to-user rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrincipalRule {
    /// Restricts which claimed usernames the rule applies to
    #[serde(default, alias = "user")]
    user_pattern: Option<RulePattern>,

    #[serde(alias = "principal")]
    principal_pattern: PrincipalTemplate,

    #[serde(default)]
    allow: bool,
}

impl PrincipalRule {
    fn applies_to(&self, user: &str) -> bool {
        matches_optional(&self.user_pattern, user)
    }

    fn principal_matches(&self, principal: &str, user: &str) -> bool {
        match self.principal_pattern.resolve(user) {
            Ok(pattern) => pattern.matches(principal),
            Err(e) => {
                // Only reachable through regex size limits on enormous usernames
                warn!(
                    "principal pattern '{}' could not be built for user {}: {}",
                    self.principal_pattern.as_str(),
                    user,
                    e
                );
                false
            }
        }
    }
}

/// Ordered principal rules; the first rule applicable to the username decides
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PrincipalUserMatcher {
    rules: Vec<PrincipalRule>,
}

impl PrincipalUserMatcher {
    pub fn new(rules: Vec<PrincipalRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `principal` may act as `user`
    ///
    /// Only the first rule applicable to `user` is consulted. If its
    /// principal pattern matches, its allow flag is the answer; otherwise,
    /// or when no rule applies, or no principal was authenticated, the
    /// answer is no.
    pub fn validate(&self, user: &str, principal: Option<&str>) -> bool {
        let Some(principal) = principal else {
            debug!("no authenticated principal for user {}", user);
            return false;
        };

        let Some(rule) = self.rules.iter().find(|rule| rule.applies_to(user)) else {
            debug!("no principal rule applies to user {}", user);
            return false;
        };

        rule.principal_matches(principal, user) && rule.allow
    }
}
