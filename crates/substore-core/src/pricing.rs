//! Pricing and Currency
//!
//! Display-currency conversion and checkout totals math.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::storage::{CURRENCY_KEY, KeyValueStorage};

/// Tax applied at checkout, percent of subtotal
pub const TAX_RATE_PERCENT: u32 = 10;

/// Display currency
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "BDT")]
    Bdt,
}

impl Currency {
    pub fn as_str(&self) -> &str {
        match self {
            Currency::Usd => "USD",
            Currency::Bdt => "BDT",
        }
    }

    /// Load the persisted preference, defaulting to USD
    pub fn load(storage: &dyn KeyValueStorage) -> Self {
        match storage.get(CURRENCY_KEY) {
            Ok(Some(raw)) if raw == "BDT" => Currency::Bdt,
            _ => Currency::Usd,
        }
    }

    /// Persist the preference; failures are logged, not surfaced
    pub fn save(&self, storage: &dyn KeyValueStorage) {
        if let Err(e) = storage.set(CURRENCY_KEY, self.as_str()) {
            tracing::warn!(error = %e, "Failed to persist currency preference");
        }
    }

    /// Convert a USD amount into this display currency
    pub fn convert(&self, amount_usd: Decimal, usd_to_bdt_rate: Decimal) -> Decimal {
        match self {
            Currency::Usd => amount_usd,
            Currency::Bdt => amount_usd * usd_to_bdt_rate,
        }
    }
}

/// Checkout totals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Compute totals from a subtotal: 10% tax, free shipping.
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let shipping = Decimal::ZERO;
        let tax = subtotal * Decimal::from(TAX_RATE_PERCENT) / Decimal::from(100);
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}
