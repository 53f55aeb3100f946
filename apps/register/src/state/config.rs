//! # Configuration State
//!
//! Register configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TILL_*`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use till_core::money::fee_of;
use till_core::{FeeRule, LoyaltyPolicy, Money};

/// Register configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (displayed on receipts)
    pub store_name: String,

    /// Identifies this register; drafts are stored per terminal.
    pub terminal_id: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Service fee applied to dine-in bills when requested.
    /// Default: 10%
    pub service_fee: FeeRule,

    /// Cover charge applied when requested.
    /// Default: none
    pub cover_charge: FeeRule,

    /// Loyalty points program.
    pub loyalty: LoyaltyPolicy,

    /// Database file override; `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for ConfigState {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Store: "Till POS Dev Store", terminal "register-01"
    /// - Service fee: 10%, no cover charge
    /// - Loyalty: 1 point per unit, 0.05 per point
    fn default() -> Self {
        ConfigState {
            store_name: "Till POS Dev Store".to_string(),
            terminal_id: "register-01".to_string(),
            currency_symbol: "R$".to_string(),
            service_fee: FeeRule::Percent(1000),
            cover_charge: FeeRule::Flat(Money::zero()),
            loyalty: LoyaltyPolicy::default(),
            database_path: None,
        }
    }
}

impl ConfigState {
    /// Creates a new ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `TILL_STORE_NAME`: store name
    /// - `TILL_TERMINAL_ID`: terminal identifier
    /// - `TILL_CURRENCY_SYMBOL`: display symbol
    /// - `TILL_SERVICE_FEE_PERCENT`: service fee percentage (e.g., "10")
    /// - `TILL_COVER_CHARGE`: flat cover charge (e.g., "5.00")
    /// - `TILL_POINTS_PER_UNIT`: loyalty points per currency unit
    /// - `TILL_POINT_VALUE`: discount per redeemed point (e.g., "0.05")
    /// - `TILL_DB_PATH`: database file path
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    /// Unparseable values are ignored.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ConfigState::default();

        if let Some(store_name) = var("TILL_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(terminal_id) = var("TILL_TERMINAL_ID").filter(|t| !t.trim().is_empty()) {
            config.terminal_id = terminal_id.trim().to_string();
        }

        if let Some(symbol) = var("TILL_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(rate) = var("TILL_SERVICE_FEE_PERCENT").and_then(|v| v.parse::<f64>().ok()) {
            if rate >= 0.0 {
                config.service_fee = FeeRule::Percent((rate * 100.0).round() as u32);
            }
        }

        if let Some(amount) = var("TILL_COVER_CHARGE").and_then(|v| v.parse::<f64>().ok()) {
            if amount >= 0.0 {
                config.cover_charge = FeeRule::Flat(Money::from_decimal(amount));
            }
        }

        if let Some(points) = var("TILL_POINTS_PER_UNIT").and_then(|v| v.parse::<i64>().ok()) {
            config.loyalty.points_per_unit = points.max(0);
        }

        if let Some(value) = var("TILL_POINT_VALUE").and_then(|v| v.parse::<f64>().ok()) {
            if value >= 0.0 {
                config.loyalty.point_value = Money::from_decimal(value);
            }
        }

        if let Some(path) = var("TILL_DB_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        config
    }

    /// Service fee over a subtotal.
    pub fn service_fee_for(&self, subtotal: Money) -> Money {
        fee_of(subtotal, self.service_fee)
    }

    /// Cover charge over a subtotal.
    pub fn cover_charge_for(&self, subtotal: Money) -> Money {
        fee_of(subtotal, self.cover_charge)
    }

    /// Formats an amount with the configured symbol.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(Money::from_cents(1234)), "R$ 12.34");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        if amount.is_negative() {
            format!("-{} {}", self.currency_symbol, amount.abs())
        } else {
            format!("{} {}", self.currency_symbol, amount)
        }
    }
}
