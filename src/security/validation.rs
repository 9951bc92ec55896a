//! Query validation across database dialects.
//!
//! The validator is a pure function of query text and dialect over rules that
//! were compiled once at startup. It never executes or parses queries into an
//! AST; it classifies them as [`Verdict::Allow`] or [`Verdict::Reject`].

use super::dialect::Dialect;
use super::rules::ValidationRules;
use crate::config::SecurityConfig;
use crate::constants::{MONGO_JAVASCRIPT_OPERATORS, MONGO_READ_METHODS};
use crate::error::GateError;
use crate::telemetry::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a query was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Query was empty or whitespace only.
    EmptyQuery,
    /// Query is longer than the configured limit.
    TooLong { max_length: usize },
    /// A sensitive keyword outside the allowed-operation exception.
    SensitiveKeyword(String),
    /// An injection pattern matched.
    InjectionPattern(String),
    /// JSON-shaped query that does not parse.
    MalformedQuery,
    /// A Mongo operator that runs server-side JavaScript.
    JavaScriptOperator(String),
    /// A destructive Mongo shell method.
    DestructiveOperation(String),
    /// An Elasticsearch body containing a script.
    ScriptExecution,
    /// An InfluxQL statement that is not a read.
    WriteOperation,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyQuery => f.write_str("empty query"),
            RejectReason::TooLong { max_length } => {
                write!(f, "query exceeds maximum length of {} bytes", max_length)
            }
            RejectReason::SensitiveKeyword(kw) => write!(f, "sensitive keyword: {}", kw),
            RejectReason::InjectionPattern(p) => write!(f, "injection pattern: {}", p),
            RejectReason::MalformedQuery => f.write_str("malformed query"),
            RejectReason::JavaScriptOperator(op) => write!(f, "javascript operator: {}", op),
            RejectReason::DestructiveOperation(op) => write!(f, "destructive operation: {}", op),
            RejectReason::ScriptExecution => f.write_str("script execution"),
            RejectReason::WriteOperation => f.write_str("write or administrative operation"),
        }
    }
}

/// Outcome of validating one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Reject { reason: RejectReason },
}

impl Verdict {
    fn reject(reason: RejectReason) -> Self {
        Verdict::Reject { reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_allowed()
    }

    /// Rejection reason, if any.
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Verdict::Allow => None,
            Verdict::Reject { reason } => Some(reason),
        }
    }

    /// Convert into a `Result` so callers can propagate rejections with `?`.
    pub fn into_result(self) -> Result<(), GateError> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Reject { reason } => Err(GateError::rejected(reason)),
        }
    }
}

impl From<Result<(), RejectReason>> for Verdict {
    fn from(result: Result<(), RejectReason>) -> Self {
        match result {
            Ok(()) => Verdict::Allow,
            Err(reason) => Verdict::reject(reason),
        }
    }
}

/// Leading method of a Mongo shell call, e.g. `find` in `db.users.find({})`.
///
/// Hardcoded and covered by tests.
static MONGO_METHOD_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^db\.[^(]*?\.?([A-Za-z_$][A-Za-z0-9_$]*)\s*\(")
        .unwrap_or_else(|e| panic!("Internal error: invalid mongo call pattern: {}", e))
});

/// Query validator.
///
/// Cloning is cheap and clones share the same compiled rules.
#[derive(Debug, Clone)]
pub struct QueryValidator {
    rules: Arc<ValidationRules>,
}

impl QueryValidator {
    /// Create a validator over already compiled rules.
    pub fn new(rules: Arc<ValidationRules>) -> Self {
        Self { rules }
    }

    /// Compile rules from configuration and create a validator.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, GateError> {
        Ok(Self::new(Arc::new(ValidationRules::from_config(config)?)))
    }

    /// Validate a query for a known dialect.
    pub fn validate(&self, query: &str, dialect: Dialect) -> Verdict {
        let verdict: Verdict = self
            .check_common(query)
            .and_then(|()| self.check_dialect(query, dialect))
            .into();
        log_verdict(query, dialect.as_str(), &verdict);
        verdict
    }

    /// Validate a query for a dialect given as a tag.
    ///
    /// Tags that do not name a known dialect have no ruleset, so the query is
    /// allowed and a warning is logged.
    pub fn validate_tag(&self, query: &str, tag: &str) -> Verdict {
        if let Err(reason) = self.check_common(query) {
            let verdict = Verdict::reject(reason);
            log_verdict(query, tag, &verdict);
            return verdict;
        }

        match tag.parse::<Dialect>() {
            Ok(dialect) => self.validate(query, dialect),
            Err(e) => {
                warn!(dialect = %tag, "No validation rules for {}; allowing query unchecked", e);
                Verdict::Allow
            }
        }
    }

    /// Get the compiled rules.
    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    fn check_common(&self, query: &str) -> Result<(), RejectReason> {
        if query.trim().is_empty() {
            return Err(RejectReason::EmptyQuery);
        }
        let max_length = self.rules.max_query_length();
        if query.len() > max_length {
            return Err(RejectReason::TooLong { max_length });
        }
        Ok(())
    }

    fn check_dialect(&self, query: &str, dialect: Dialect) -> Result<(), RejectReason> {
        match dialect {
            Dialect::PostgreSql | Dialect::MySql | Dialect::SqlServer => {
                self.validate_sql(query, dialect)
            }
            Dialect::MongoDb => self.validate_mongo(query),
            Dialect::ElasticSearch => validate_elasticsearch(query),
            Dialect::InfluxDb => self.validate_influx(query),
        }
    }

    /// Keyword pass, then injection pass, over the uppercased query.
    fn validate_sql(&self, query: &str, dialect: Dialect) -> Result<(), RejectReason> {
        let normalized = query.to_uppercase();
        let trimmed = normalized.trim();
        let allowed = self.rules.allowed_operations(dialect);
        let starts_allowed = allowed.iter().any(|op| trimmed.starts_with(op.as_str()));

        for keyword in self.rules.sensitive_keywords() {
            if !normalized.contains(keyword.as_str()) {
                continue;
            }
            if starts_allowed && allowed.contains(keyword) {
                continue;
            }
            return Err(RejectReason::SensitiveKeyword(keyword.clone()));
        }

        self.rules.injection().check(&normalized)
    }

    fn validate_mongo(&self, query: &str) -> Result<(), RejectReason> {
        let trimmed = query.trim();

        if trimmed.starts_with('{') {
            parse_json(trimmed)?;
        }

        if let Some(op) = MONGO_JAVASCRIPT_OPERATORS
            .iter()
            .find(|op| trimmed.contains(*op))
        {
            return Err(RejectReason::JavaScriptOperator(op.to_string()));
        }

        // JavaScript operators were rejected above, even inside read calls.
        if trimmed.starts_with("db.") {
            let method = MONGO_METHOD_CALL
                .captures(trimmed)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str());
            if method.is_some_and(|m| MONGO_READ_METHODS.contains(&m)) {
                return Ok(());
            }

            if let Some(op) = self
                .rules
                .mongo_denied_operations()
                .iter()
                .find(|op| trimmed.contains(op.as_str()))
            {
                return Err(RejectReason::DestructiveOperation(op.clone()));
            }
        }

        // Unrecognized shapes have no rules and pass through.
        Ok(())
    }

    fn validate_influx(&self, query: &str) -> Result<(), RejectReason> {
        let normalized = query.trim().to_uppercase();
        let allowed = self.rules.allowed_operations(Dialect::InfluxDb);
        if allowed.iter().any(|op| normalized.starts_with(op.as_str())) {
            Ok(())
        } else {
            Err(RejectReason::WriteOperation)
        }
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(Arc::new(ValidationRules::default()))
    }
}

fn validate_elasticsearch(query: &str) -> Result<(), RejectReason> {
    let trimmed = query.trim();
    if trimmed.starts_with('{') {
        parse_json(trimmed)?;
    }
    if trimmed.contains("script") {
        return Err(RejectReason::ScriptExecution);
    }
    Ok(())
}

fn parse_json(body: &str) -> Result<serde_json::Value, RejectReason> {
    serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "JSON-shaped query failed to parse");
        RejectReason::MalformedQuery
    })
}

fn log_verdict(query: &str, dialect: &str, verdict: &Verdict) {
    if let Verdict::Reject { reason } = verdict {
        debug!(
            dialect = %dialect,
            reason = %reason,
            query = %truncate_for_log(query),
            "Query rejected"
        );
    }
}
