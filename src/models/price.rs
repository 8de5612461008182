//! Fixed-point recipe price.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Digits allowed before the decimal point (five in total, two after it).
const MAX_WHOLE_DIGITS: usize = 3;
const DECIMAL_PLACES: usize = 2;

/// A non-negative price with two decimal places, stored as cents.
///
/// Serializes as a string (`"5.00"`) so clients never see binary float rounding.
/// Deserializes from either a string or a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Price {
    cents: i64,
}

/// Reasons a price string is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    Empty,
    Negative,
    NotANumber,
    TooManyDecimalPlaces,
    TooManyDigits,
}

impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PriceError::Empty => "A valid number is required.",
            PriceError::Negative => "Ensure this value is greater than or equal to 0.",
            PriceError::NotANumber => "A valid number is required.",
            PriceError::TooManyDecimalPlaces => {
                "Ensure that there are no more than 2 decimal places."
            }
            PriceError::TooManyDigits => "Ensure that there are no more than 5 digits in total.",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for PriceError {}

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PriceError::Empty);
        }
        if s.starts_with('-') {
            return Err(PriceError::Negative);
        }
        let s = s.strip_prefix('+').unwrap_or(s);

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(PriceError::NotANumber);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(PriceError::NotANumber);
        }

        // Trailing zeros after the point never count against the limit ("5.000" is 5.00).
        let frac = frac.trim_end_matches('0');
        if frac.len() > DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces);
        }
        let whole = whole.trim_start_matches('0');
        if whole.len() > MAX_WHOLE_DIGITS {
            return Err(PriceError::TooManyDigits);
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::NotANumber)?
        };
        let frac_value: i64 = format!("{:0<2}", frac)
            .parse()
            .map_err(|_| PriceError::NotANumber)?;

        Ok(Self {
            cents: whole_value * 100 + frac_value,
        })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A price as sent by a client, before any range checks.
///
/// Request bodies carry this so a bad price surfaces as a field validation error
/// instead of a body rejection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Text(String),
    Number(serde_json::Number),
    Other(serde_json::Value),
}

impl RawPrice {
    pub fn to_price(&self) -> Result<Price, PriceError> {
        match self {
            RawPrice::Text(s) => s.parse(),
            RawPrice::Number(n) => n.to_string().parse(),
            RawPrice::Other(_) => Err(PriceError::NotANumber),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawPrice::deserialize(deserializer)?
            .to_price()
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("5.00".parse::<Price>().unwrap().to_string(), "5.00");
        assert_eq!("5".parse::<Price>().unwrap().to_string(), "5.00");
        assert_eq!("5.5".parse::<Price>().unwrap().to_string(), "5.50");
        assert_eq!(".25".parse::<Price>().unwrap().cents(), 25);
        assert_eq!("999.99".parse::<Price>().unwrap().cents(), 99_999);
        assert_eq!("007.10".parse::<Price>().unwrap().to_string(), "7.10");
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!("1000".parse::<Price>(), Err(PriceError::TooManyDigits));
        assert_eq!("1.234".parse::<Price>(), Err(PriceError::TooManyDecimalPlaces));
        assert_eq!("-1".parse::<Price>(), Err(PriceError::Negative));
        assert_eq!("abc".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!(".".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
    }

    #[test]
    fn test_json_accepts_string_or_number() {
        let from_str: Price = serde_json::from_str("\"12.30\"").unwrap();
        let from_num: Price = serde_json::from_str("12.3").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"12.30\"");
        assert!(serde_json::from_str::<Price>("true").is_err());
    }

    #[test]
    fn test_raw_price_defers_range_checks() {
        let raw: RawPrice = serde_json::from_str("\"1000.00\"").unwrap();
        assert_eq!(raw.to_price(), Err(PriceError::TooManyDigits));

        let raw: RawPrice = serde_json::from_str("-1").unwrap();
        assert_eq!(raw.to_price(), Err(PriceError::Negative));

        let raw: RawPrice = serde_json::from_str("[1]").unwrap();
        assert_eq!(raw.to_price(), Err(PriceError::NotANumber));

        let raw: RawPrice = serde_json::from_str("4.5").unwrap();
        assert_eq!(raw.to_price().unwrap().to_string(), "4.50");
    }
}
