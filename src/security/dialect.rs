//! Database dialects understood by the validator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Query language spoken by a target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    PostgreSql,
    MySql,
    MongoDb,
    SqlServer,
    ElasticSearch,
    InfluxDb,
}

/// Rule family a dialect is validated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectFamily {
    /// PostgreSQL, MySQL and SQL Server.
    Sql,
    /// MongoDB query documents and shell calls.
    Document,
    /// Elasticsearch query DSL.
    Search,
    /// InfluxQL.
    TimeSeries,
}

impl Dialect {
    /// Every dialect, in declaration order.
    pub const ALL: [Dialect; 6] = [
        Dialect::PostgreSql,
        Dialect::MySql,
        Dialect::MongoDb,
        Dialect::SqlServer,
        Dialect::ElasticSearch,
        Dialect::InfluxDb,
    ];

    /// Canonical lowercase tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::PostgreSql => "postgresql",
            Dialect::MySql => "mysql",
            Dialect::MongoDb => "mongodb",
            Dialect::SqlServer => "sqlserver",
            Dialect::ElasticSearch => "elasticsearch",
            Dialect::InfluxDb => "influxdb",
        }
    }

    pub fn family(&self) -> DialectFamily {
        match self {
            Dialect::PostgreSql | Dialect::MySql | Dialect::SqlServer => DialectFamily::Sql,
            Dialect::MongoDb => DialectFamily::Document,
            Dialect::ElasticSearch => DialectFamily::Search,
            Dialect::InfluxDb => DialectFamily::TimeSeries,
        }
    }

    /// Check if this dialect is validated with the SQL keyword and pattern rules.
    pub fn is_sql(&self) -> bool {
        self.family() == DialectFamily::Sql
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a dialect tag is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDialect(pub String);

impl fmt::Display for UnknownDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dialect '{}'", self.0)
    }
}

impl std::error::Error for UnknownDialect {}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSql),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "mongodb" | "mongo" => Ok(Dialect::MongoDb),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "elasticsearch" | "elastic" => Ok(Dialect::ElasticSearch),
            "influxdb" | "influx" => Ok(Dialect::InfluxDb),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
