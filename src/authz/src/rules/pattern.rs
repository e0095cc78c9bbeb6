//! Anchored regular expressions used by every rule

use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// A rule pattern that must match the whole value
///
/// `alice` matches only `alice`, never `malice` or `alice2`. Matching is
/// case-sensitive.
#[derive(Clone)]
pub struct RulePattern {
    source: String,
    regex: Regex,
}

impl RulePattern {
    /// Compile `source` anchored at both ends
    ///
    /// `source` must be a valid expression on its own. An unbalanced `)`
    /// would otherwise close the anchoring group and escape it.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source)?;
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Pattern matching exactly `text`, with no metacharacters
    pub fn literal(text: &str) -> Result<Self, regex::Error> {
        Self::new(&regex::escape(text))
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The pattern as written in the rule file
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Match an optional pattern; an omitted pattern matches everything
pub(crate) fn matches_optional(pattern: &Option<RulePattern>, value: &str) -> bool {
    pattern.as_ref().map_or(true, |pattern| pattern.matches(value))
}

impl fmt::Debug for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RulePattern").field(&self.source).finish()
    }
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl<'de> Deserialize<'de> for RulePattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let source = String::deserialize(deserializer)?;
        RulePattern::new(&source)
            .map_err(|e| serde::de::Error::custom(format!("invalid pattern '{}': {}", source, e)))
    }
}
