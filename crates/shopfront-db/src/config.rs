//! Store configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;

use shopfront_core::{DiscountPercent, DEFAULT_ORDER_NUMBER_ATTEMPTS};

use crate::pool::DbConfig;
use crate::repository::bonus::default_welcome_percent;
use crate::repository::order_number::OrderNumberGenerator;

/// Storefront ledger configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Bound on order-number minting attempts per checkout
    pub order_number_attempts: u32,

    /// Percentage granted by the one-time welcome bonus
    pub welcome_bonus_percent: DiscountPercent,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: PathBuf::from("shopfront.db"),
            max_connections: 5,
            order_number_attempts: DEFAULT_ORDER_NUMBER_ATTEMPTS,
            welcome_bonus_percent: default_welcome_percent(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                          | Default        |
    /// |-----------------------------------|----------------|
    /// | `SHOPFRONT_DB_PATH`               | `shopfront.db` |
    /// | `SHOPFRONT_MAX_CONNECTIONS`       | `5`            |
    /// | `SHOPFRONT_ORDER_NUMBER_ATTEMPTS` | `100`          |
    /// | `SHOPFRONT_WELCOME_BONUS_PERCENT` | `10`           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StoreConfig::default();

        let database_path = lookup("SHOPFRONT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let max_connections: u32 = parse_or(&lookup, "SHOPFRONT_MAX_CONNECTIONS", defaults.max_connections)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue("SHOPFRONT_MAX_CONNECTIONS".to_string()));
        }

        let order_number_attempts: u32 = parse_or(
            &lookup,
            "SHOPFRONT_ORDER_NUMBER_ATTEMPTS",
            defaults.order_number_attempts,
        )?;
        if order_number_attempts == 0 {
            return Err(ConfigError::InvalidValue("SHOPFRONT_ORDER_NUMBER_ATTEMPTS".to_string()));
        }

        let percent: i64 = parse_or(
            &lookup,
            "SHOPFRONT_WELCOME_BONUS_PERCENT",
            defaults.welcome_bonus_percent.value(),
        )?;
        let welcome_bonus_percent = DiscountPercent::new(percent)
            .map_err(|_| ConfigError::InvalidValue("SHOPFRONT_WELCOME_BONUS_PERCENT".to_string()))?;

        Ok(StoreConfig {
            database_path,
            max_connections,
            order_number_attempts,
            welcome_bonus_percent,
        })
    }

    /// Pool configuration for this store.
    ///
    /// A `:memory:` path gets the single-connection in-memory settings.
    pub fn db_config(&self) -> DbConfig {
        let config = DbConfig::new(self.database_path.clone());
        if config.is_in_memory() {
            return DbConfig::in_memory();
        }
        config.max_connections(self.max_connections)
    }

    /// Order-number generator honouring the configured attempt bound.
    pub fn order_number_generator(&self) -> OrderNumberGenerator {
        OrderNumberGenerator::new(self.order_number_attempts)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("shopfront.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.order_number_attempts, 100);
        assert_eq!(config.welcome_bonus_percent.value(), 10);
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("SHOPFRONT_DB_PATH", "/var/lib/shop.db"),
            ("SHOPFRONT_MAX_CONNECTIONS", "8"),
            ("SHOPFRONT_ORDER_NUMBER_ATTEMPTS", "20"),
            ("SHOPFRONT_WELCOME_BONUS_PERCENT", "15"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/shop.db"));
        assert_eq!(config.db_config().max_connections, 8);
        assert_eq!(config.order_number_generator().max_attempts(), 20);
        assert_eq!(config.welcome_bonus_percent.value(), 15);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("SHOPFRONT_MAX_CONNECTIONS", "many"),
            ("SHOPFRONT_MAX_CONNECTIONS", "0"),
            ("SHOPFRONT_ORDER_NUMBER_ATTEMPTS", "-1"),
            ("SHOPFRONT_WELCOME_BONUS_PERCENT", "150"),
        ] {
            let err = StoreConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid value for {}", key));
        }
    }
}
