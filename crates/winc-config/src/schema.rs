//! Configuration schema and environment parsing.
//!
//! All settings come from the process environment. `from_env` reads the
//! real environment; `from_lookup` takes any key-to-value function so
//! tests never mutate process-global state.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent.
    #[error("missing required environment variable {0}")]
    MissingVar(String),

    /// A variable is present but unparseable.
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// A cross-field validation failed.
    #[error("configuration error: {0}")]
    Validation(String),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Deployment environment, from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeEnv {
    /// Test runs; in-process defaults, secrets optional.
    Test,
    /// Local development.
    #[default]
    Dev,
    /// Production; secrets are mandatory.
    Prod,
}

impl NodeEnv {
    /// Default HTTP port for this environment.
    pub fn default_port(&self) -> u16 {
        match self {
            NodeEnv::Prod => 3000,
            NodeEnv::Dev => 4000,
            NodeEnv::Test => 4010,
        }
    }

    /// Whether this environment requires provider secrets.
    pub fn requires_secrets(&self) -> bool {
        matches!(self, NodeEnv::Prod)
    }
}

impl fmt::Display for NodeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeEnv::Test => "test",
            NodeEnv::Dev => "dev",
            NodeEnv::Prod => "prod",
        };
        f.write_str(s)
    }
}

impl FromStr for NodeEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(NodeEnv::Test),
            "dev" => Ok(NodeEnv::Dev),
            "prod" => Ok(NodeEnv::Prod),
            other => Err(ConfigError::InvalidVar {
                name: "NODE_ENV".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// PostgreSQL connection settings, writer plus optional reader replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Writer (primary) host.
    pub host: String,
    /// Port, shared by writer and reader.
    pub port: u16,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub name: String,
    /// Reader replica host; mutators never use it. Falls back to the
    /// writer when absent.
    pub reader_host: Option<String>,
}

impl DatabaseConfig {
    /// Connection URL for the writer (primary).
    pub fn writer_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }

    /// Connection URL for the reader, falling back to the writer.
    pub fn reader_url(&self) -> String {
        let host = self.reader_host.as_deref().unwrap_or(&self.host);
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, host, self.port, self.name
        )
    }
}

/// Stripe credentials.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StripeConfig {
    /// API secret key.
    pub secret_key: Option<String>,
    /// Webhook signing secret.
    pub webhook_secret: Option<String>,
}

/// Pending-transaction poller cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Tick interval.
    pub poll_interval: Duration,
    /// How long a not-found transaction is tolerated before failing it.
    pub grace_period: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            grace_period: Duration::from_secs(48 * 60 * 60),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Deployment environment.
    pub env: NodeEnv,
    /// HTTP listen port.
    pub port: u16,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Stripe credentials.
    pub stripe: StripeConfig,
    /// Bearer token protecting the reserve/refund admin routes.
    pub admin_api_token: Option<String>,
    /// Addresses refused as crypto-funding destinations.
    pub crypto_fund_excluded_addresses: Vec<String>,
    /// Poller cadence.
    pub poller: PollerConfig,
}

impl LedgerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let env = match lookup("NODE_ENV") {
            Some(raw) => raw.parse()?,
            None => NodeEnv::default(),
        };
        let port = parse_or(&lookup, "PORT", env.default_port())?;

        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&lookup, "DB_PORT", 5432)?,
            user: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_else(|| "postgres".to_string()),
            name: lookup("DB_NAME").unwrap_or_else(|| "ledger".to_string()),
            reader_host: lookup("DB_READER_HOST").filter(|h| !h.is_empty()),
        };

        let stripe = StripeConfig {
            secret_key: lookup("STRIPE_SECRET_KEY").filter(|s| !s.is_empty()),
            webhook_secret: lookup("STRIPE_WEBHOOK_SECRET").filter(|s| !s.is_empty()),
        };

        let crypto_fund_excluded_addresses = lookup("CRYPTO_FUND_EXCLUDED_ADDRESSES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let poller = PollerConfig {
            poll_interval: Duration::from_secs(parse_or(
                &lookup,
                "PENDING_TX_POLL_INTERVAL_SECONDS",
                60,
            )?),
            grace_period: Duration::from_secs(
                parse_or(&lookup, "PENDING_TX_GRACE_PERIOD_HOURS", 48u64)? * 60 * 60,
            ),
        };

        Ok(Self {
            env,
            port,
            database,
            stripe,
            admin_api_token: lookup("ADMIN_API_TOKEN").filter(|t| !t.is_empty()),
            crypto_fund_excluded_addresses,
            poller,
        })
    }
}

/// Parse an optional variable, applying a default when absent.
fn parse_or<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> ConfigResult<T> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
            name: name.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = LedgerConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.env, NodeEnv::Dev);
        assert_eq!(config.port, 4000);
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.writer_url(), config.database.reader_url());
        assert!(config.crypto_fund_excluded_addresses.is_empty());
        assert_eq!(config.poller, PollerConfig::default());
    }

    #[test]
    fn test_env_controls_port_default() {
        let prod =
            LedgerConfig::from_lookup(lookup_from(&[("NODE_ENV", "prod")])).unwrap();
        assert_eq!(prod.port, 3000);

        let test =
            LedgerConfig::from_lookup(lookup_from(&[("NODE_ENV", "test")])).unwrap();
        assert_eq!(test.port, 4010);

        let explicit = LedgerConfig::from_lookup(lookup_from(&[
            ("NODE_ENV", "prod"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(explicit.port, 8080);
    }

    #[test]
    fn test_reader_host_split() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("DB_HOST", "writer.internal"),
            ("DB_READER_HOST", "reader.internal"),
            ("DB_PASSWORD", "hunter2"),
        ]))
        .unwrap();

        assert!(config.database.writer_url().contains("writer.internal"));
        assert!(config.database.reader_url().contains("reader.internal"));
    }

    #[test]
    fn test_excluded_addresses_comma_list() {
        let config = LedgerConfig::from_lookup(lookup_from(&[(
            "CRYPTO_FUND_EXCLUDED_ADDRESSES",
            "addr1, addr2 ,,addr3",
        )]))
        .unwrap();

        assert_eq!(
            config.crypto_fund_excluded_addresses,
            vec!["addr1", "addr2", "addr3"]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = LedgerConfig::from_lookup(lookup_from(&[("DB_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));

        let err =
            LedgerConfig::from_lookup(lookup_from(&[("NODE_ENV", "staging")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));
    }
}
