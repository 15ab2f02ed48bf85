use crate::error::BookingError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A catalog price. Zero is allowed, negative values are not.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, BookingError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BookingError::ValidationFailed(
                "Price must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = BookingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Represents a positive monetary amount that can be charged.
///
/// Payment providers only ever see an `Amount`, so a zero or negative
/// charge cannot reach them.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, BookingError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BookingError::ValidationFailed(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Amount expressed in the currency's minor unit (cents, paise).
    ///
    /// `None` when the amount cannot be charged in whole minor units: it
    /// rounds to zero or does not fit in a `u64`.
    pub fn minor_units(&self) -> Option<u64> {
        (self.0 * Decimal::ONE_HUNDRED)
            .round()
            .to_u64()
            .filter(|minor| *minor > 0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = BookingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<Price> for Amount {
    type Error = BookingError;

    fn try_from(price: Price) -> Result<Self, Self::Error> {
        Self::new(price.0)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO-4217 currency code, always three upper-case ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(BookingError::ValidationFailed(format!(
                "'{}' is not an ISO-4217 currency code",
                s
            )))
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(BookingError::ValidationFailed(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(BookingError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_price_allows_zero() {
        assert_eq!(Price::new(dec!(0)).unwrap(), Price::ZERO);
        assert!(Price::new(dec!(-0.01)).is_err());
        assert!(Amount::try_from(Price::ZERO).is_err());
    }

    #[test]
    fn test_minor_units() {
        let amount = Amount::new(dec!(19.99)).unwrap();
        assert_eq!(amount.minor_units(), Some(1999));
        assert_eq!(Amount::new(dec!(0.006)).unwrap().minor_units(), Some(1));
        assert_eq!(Amount::new(dec!(0.004)).unwrap().minor_units(), None);
        assert_eq!(Amount::new(dec!(0.005)).unwrap().minor_units(), None);
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::usd());
        assert_eq!(" INR ".parse::<Currency>().unwrap().code(), "INR");
        assert!("US".parse::<Currency>().is_err());
        assert!("U5D".parse::<Currency>().is_err());
    }
}
