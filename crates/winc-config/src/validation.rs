//! Configuration validation.

use crate::schema::{ConfigError, ConfigResult, LedgerConfig};

/// Validate a loaded configuration.
pub fn validate_config(config: &LedgerConfig) -> ConfigResult<()> {
    validate_listener(config)?;
    validate_secrets(config)?;
    validate_poller(config)?;
    Ok(())
}

/// Validate the HTTP listener settings.
fn validate_listener(config: &LedgerConfig) -> ConfigResult<()> {
    if config.port == 0 {
        return Err(ConfigError::Validation(
            "PORT must be greater than 0".to_string(),
        ));
    }
    if config.database.host.is_empty() {
        return Err(ConfigError::Validation("DB_HOST cannot be empty".to_string()));
    }
    Ok(())
}

/// Production requires provider secrets and an admin token.
fn validate_secrets(config: &LedgerConfig) -> ConfigResult<()> {
    if !config.env.requires_secrets() {
        return Ok(());
    }

    if config.stripe.secret_key.is_none() {
        return Err(ConfigError::Validation(
            "STRIPE_SECRET_KEY is required in prod".to_string(),
        ));
    }
    if config.stripe.webhook_secret.is_none() {
        return Err(ConfigError::Validation(
            "STRIPE_WEBHOOK_SECRET is required in prod".to_string(),
        ));
    }
    if config.admin_api_token.is_none() {
        return Err(ConfigError::Validation(
            "ADMIN_API_TOKEN is required in prod".to_string(),
        ));
    }
    Ok(())
}

/// Validate poller cadence.
fn validate_poller(config: &LedgerConfig) -> ConfigResult<()> {
    if config.poller.poll_interval.is_zero() {
        return Err(ConfigError::Validation(
            "PENDING_TX_POLL_INTERVAL_SECONDS must be greater than 0".to_string(),
        ));
    }
    if config.poller.grace_period.is_zero() {
        return Err(ConfigError::Validation(
            "PENDING_TX_GRACE_PERIOD_HOURS must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeEnv;

    fn base_config() -> LedgerConfig {
        LedgerConfig::from_lookup(|_| None).unwrap()
    }

    #[test]
    fn test_dev_defaults_validate() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_prod_requires_secrets() {
        let mut config = base_config();
        config.env = NodeEnv::Prod;

        assert!(validate_config(&config).is_err());

        config.stripe.secret_key = Some("sk_live_x".to_string());
        config.stripe.webhook_secret = Some("whsec_x".to_string());
        config.admin_api_token = Some("token".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let mut config = base_config();
        config.poller.poll_interval = std::time::Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }
}
