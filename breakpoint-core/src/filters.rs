// Class and thread filters
//
// Filters use the restricted wildcard form of JDI event-request filters: an
// exact name, or a name with a single '*' at the start or the end
// ("java.*", "*.Handler", "*"). Several filters are written comma-separated.

use crate::error::{BreakpointError, BreakpointResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamePattern {
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> BreakpointResult<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(BreakpointError::MalformedFilter(pattern.to_string()));
        }
        if pattern == "*" {
            return Ok(NamePattern::Any);
        }

        let stars = pattern.matches('*').count();
        match stars {
            0 => Ok(NamePattern::Exact(pattern.to_string())),
            1 if pattern.ends_with('*') => Ok(NamePattern::Prefix(pattern.trim_end_matches('*').to_string())),
            1 if pattern.starts_with('*') => Ok(NamePattern::Suffix(pattern.trim_start_matches('*').to_string())),
            _ => Err(BreakpointError::MalformedFilter(pattern.to_string())),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Any => true,
            NamePattern::Exact(exact) => name == exact,
            NamePattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
            NamePattern::Suffix(suffix) => name.ends_with(suffix.as_str()),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Any => f.write_str("*"),
            NamePattern::Exact(name) => f.write_str(name),
            NamePattern::Prefix(prefix) => write!(f, "{}*", prefix),
            NamePattern::Suffix(suffix) => write!(f, "*{}", suffix),
        }
    }
}

/// A comma-separated list of patterns; a name passes if any pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterList {
    patterns: Vec<NamePattern>,
}

impl FilterList {
    pub fn parse(filters: &str) -> BreakpointResult<Self> {
        let patterns = filters
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(NamePattern::parse)
            .collect::<BreakpointResult<Vec<_>>>()?;

        if patterns.is_empty() {
            return Err(BreakpointError::MalformedFilter(filters.to_string()));
        }
        Ok(Self { patterns })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    pub fn patterns(&self) -> &[NamePattern] {
        &self.patterns
    }
}

impl fmt::Display for FilterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.patterns.iter().map(|p| p.to_string()).collect();
        f.write_str(&joined.join(","))
    }
}
