//! Configuration for the stock intake service.
//!
//! Loaded in layers:
//! 1. Defaults in code
//! 2. An optional file (`config/tillstock.toml` by default)
//! 3. Environment overrides with the `TILLSTOCK` prefix and `__` as the
//!    nesting separator (`TILLSTOCK__PRICING__VAT_RATE=0.2`)

use std::collections::HashMap;

use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use tillstock_catalogue::{MarkupPriceGuess, PriceGuessRegistry};
use tillstock_core::DepartmentId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("pricing.markups has an invalid department id '{0}'")]
    Department(String),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct IntakeConfig {
    /// Currency symbol used when showing prices.
    pub currency: String,

    /// Default tracing filter; `RUST_LOG` overrides it.
    pub log_filter: String,

    pub pricing: PricingConfig,

    pub allocation: AllocationConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PricingConfig {
    /// VAT added on top of a marked-up cost (0.2 = 20%).
    pub vat_rate: Decimal,

    /// Department id → markup multiplier.
    #[serde(default)]
    pub markups: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AllocationConfig {
    /// Report "nothing to allocate" after a confirmation places no stock.
    pub notify_on_no_work: bool,
}

impl IntakeConfig {
    pub const DEFAULT_FILE: &'static str = "config/tillstock";

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::DEFAULT_FILE)
    }

    /// Load with `path` as the optional file source. The extension may be
    /// left off.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("currency", "£")?
            .set_default("log_filter", "info")?
            .set_default("pricing.vat_rate", "0.2")?
            .set_default("allocation.notify_on_no_work", false)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TILLSTOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Markup table keyed by typed department id.
    pub fn markups(&self) -> Result<Vec<(DepartmentId, Decimal)>, ConfigError> {
        let mut markups = self
            .pricing
            .markups
            .iter()
            .map(|(key, multiplier)| {
                key.parse::<DepartmentId>()
                    .map(|id| (id, *multiplier))
                    .map_err(|_| ConfigError::Department(key.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        markups.sort();
        Ok(markups)
    }

    /// The price-guess chain built from this configuration.
    pub fn price_guesses(&self) -> Result<PriceGuessRegistry, ConfigError> {
        let strategy = self
            .markups()?
            .into_iter()
            .fold(MarkupPriceGuess::new(self.pricing.vat_rate), |s, (dept, m)| {
                s.with_markup(dept, m)
            });
        Ok(PriceGuessRegistry::new().register(strategy))
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            currency: "£".to_string(),
            log_filter: "info".to_string(),
            pricing: PricingConfig {
                vat_rate: Decimal::new(2, 1),
                markups: HashMap::new(),
            },
            allocation: AllocationConfig {
                notify_on_no_work: false,
            },
        }
    }
}
