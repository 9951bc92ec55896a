//! SQL injection detection.
//!
//! Runs an ordered set of compiled regexes over a normalized query and reports
//! the first pattern that matches.

use super::validation::RejectReason;
use crate::constants::DEFAULT_INJECTION_PATTERNS;
use crate::error::GateError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Compiled default patterns.
///
/// All patterns are hardcoded constants that are covered by tests, so a
/// compile failure here is a programming error.
static DEFAULT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_INJECTION_PATTERNS
        .iter()
        .map(|pattern| {
            compile_pattern(pattern).unwrap_or_else(|e| {
                panic!("Internal error: invalid regex pattern '{}': {}", pattern, e)
            })
        })
        .collect()
});

fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// SQL injection detector.
#[derive(Debug, Clone)]
pub struct InjectionDetector {
    patterns: Vec<Regex>,
}

impl InjectionDetector {
    /// Compile a detector from pattern sources, preserving their order.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, GateError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                compile_pattern(p).map_err(|e| {
                    GateError::config(format!("invalid injection pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Check a normalized query for injection patterns.
    ///
    /// Returns `Ok(())` if nothing matches, or the first matching pattern.
    pub fn check(&self, query: &str) -> Result<(), RejectReason> {
        match self.patterns.iter().find(|p| p.is_match(query)) {
            Some(pattern) => Err(RejectReason::InjectionPattern(pattern.as_str().to_string())),
            None => Ok(()),
        }
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for InjectionDetector {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
        }
    }
}
