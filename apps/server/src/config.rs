use std::env;

use rust_decimal::Decimal;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_DB_NAME: &str = "storefront";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo: MongoConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

/// Charges added to every cash order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PricingConfig {
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("PORT", value))?,
            None => DEFAULT_PORT,
        };

        let mongo_uri = lookup("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?;
        let mongo_database =
            lookup("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        let tax_price = price(&lookup, "ORDER_TAX_PRICE")?;
        let shipping_price = price(&lookup, "ORDER_SHIPPING_PRICE")?;

        Ok(Self {
            host,
            port,
            mongo: MongoConfig {
                uri: mongo_uri,
                database: mongo_database,
            },
            pricing: PricingConfig {
                tax_price,
                shipping_price,
            },
        })
    }
}

fn price(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Decimal, ConfigError> {
    match lookup(key) {
        None => Ok(Decimal::ZERO),
        Some(value) => value
            .trim()
            .parse::<Decimal>()
            .ok()
            .filter(|price| !price.is_sign_negative())
            .ok_or(ConfigError::Invalid(key, value)),
    }
}
