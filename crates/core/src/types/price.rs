//! Money amounts using decimal arithmetic.
//!
//! Album prices, line totals, and cart totals are all plain [`Decimal`]
//! amounts in the shop's single currency. [`Price`] pairs an amount with its
//! [`CurrencyCode`] for display.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display, e.g. `$19.99` or `€5.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    RUB,
}

impl CurrencyCode {
    /// Symbol printed before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::RUB => "₽",
        }
    }

    /// The three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::RUB => "RUB",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "RUB" => Ok(Self::RUB),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_cents() {
        let price = Price::new(Decimal::new(19_999, 3), CurrencyCode::USD);
        assert_eq!(price.display(), "$20.00");

        let price = Price::new(Decimal::new(5, 0), CurrencyCode::EUR);
        assert_eq!(price.to_string(), "€5.00");
    }

    #[test]
    fn test_zero() {
        assert_eq!(Price::zero(CurrencyCode::GBP).display(), "£0.00");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>(), Ok(CurrencyCode::USD));
        assert_eq!(" RUB ".parse::<CurrencyCode>(), Ok(CurrencyCode::RUB));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
