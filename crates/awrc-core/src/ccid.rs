//! Client customer identifiers.
//!
//! MCC and sub-account ids arrive either as JSON numbers or as dash-grouped
//! strings (`123-456-7890`). [`Ccid`] is built once at the boundary and
//! rejects anything that does not carry 10 to 12 significant digits.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MIN_DIGITS: usize = 10;
const MAX_DIGITS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CcidError {
    #[error("customer id \"{0}\" contains no digits")]
    Empty(String),

    #[error("customer id \"{input}\" has {digits} digits; expected {MIN_DIGITS} to {MAX_DIGITS}")]
    InvalidLength { input: String, digits: usize },
}

/// A validated client customer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ccid(u64);

impl Ccid {
    /// Parses any string form of an id, ignoring every non-digit character.
    ///
    /// Leading zeros are not significant: `0123456789` has nine digits and is
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CcidError::Empty`] when the input holds no digits and
    /// [`CcidError::InvalidLength`] when the significant digit count is
    /// outside 10..=12.
    pub fn parse(raw: &str) -> Result<Self, CcidError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(CcidError::Empty(raw.to_owned()));
        }

        let significant = digits.trim_start_matches('0');
        if significant.len() < MIN_DIGITS || significant.len() > MAX_DIGITS {
            return Err(CcidError::InvalidLength {
                input: raw.to_owned(),
                digits: significant.len(),
            });
        }

        // At most 12 digits, always fits.
        let value = significant
            .parse::<u64>()
            .map_err(|_| CcidError::InvalidLength {
                input: raw.to_owned(),
                digits: significant.len(),
            })?;
        Ok(Self(value))
    }

    /// Wraps a numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`CcidError::InvalidLength`] when `value` does not have 10 to
    /// 12 decimal digits.
    pub fn from_u64(value: u64) -> Result<Self, CcidError> {
        let digits = digit_count(value);
        if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
            Ok(Self(value))
        } else {
            Err(CcidError::InvalidLength {
                input: value.to_string(),
                digits,
            })
        }
    }

    /// The digits-only numeric form sent on the wire.
    #[must_use]
    pub fn normalized(self) -> u64 {
        self.0
    }

    /// Dash-grouped display form: `XXX-XXX-XXXX`.
    ///
    /// Ids longer than ten digits keep the remainder in the last group.
    #[must_use]
    pub fn formatted(self) -> String {
        let s = self.0.to_string();
        format!("{}-{}-{}", &s[..3], &s[3..6], &s[6..])
    }
}

fn digit_count(mut value: u64) -> usize {
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}

impl fmt::Display for Ccid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl FromStr for Ccid {
    type Err = CcidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<u64> for Ccid {
    type Error = CcidError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::from_u64(value)
    }
}

impl Serialize for Ccid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Ccid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CcidVisitor;

        impl Visitor<'_> for CcidVisitor {
            type Value = Ccid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 10-12 digit customer id as a number or string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Ccid, E> {
                Ccid::from_u64(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Ccid, E> {
                let v = u64::try_from(v).map_err(|_| E::custom("negative customer id"))?;
                Ccid::from_u64(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Ccid, E> {
                Ccid::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CcidVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_dashed_and_plain_forms() {
        let dashed = Ccid::parse("123-456-7890").unwrap();
        let plain = Ccid::parse("1234567890").unwrap();
        assert_eq!(dashed, plain);
        assert_eq!(dashed.normalized(), 1_234_567_890);
    }

    #[test]
    fn parse_ignores_whitespace_and_separators() {
        let id = Ccid::parse("  123 456 7890 ").unwrap();
        assert_eq!(id.formatted(), "123-456-7890");
    }

    #[test]
    fn parse_rejects_short_and_long_ids() {
        assert!(matches!(
            Ccid::parse("123-456-789"),
            Err(CcidError::InvalidLength { digits: 9, .. })
        ));
        assert!(matches!(
            Ccid::parse("1234567890123"),
            Err(CcidError::InvalidLength { digits: 13, .. })
        ));
    }

    #[test]
    fn parse_rejects_input_without_digits() {
        assert!(matches!(Ccid::parse("abc-def"), Err(CcidError::Empty(_))));
    }

    #[test]
    fn leading_zeros_are_not_significant() {
        assert!(Ccid::parse("0123456789").is_err());
    }

    #[test]
    fn formatting_round_trips_for_every_valid_length() {
        for raw in ["1234567890", "12345678901", "123456789012"] {
            let id = Ccid::parse(raw).unwrap();
            assert_eq!(Ccid::parse(&id.formatted()).unwrap(), id, "{raw}");
        }
    }

    #[test]
    fn long_ids_keep_remainder_in_last_group() {
        let id = Ccid::from_u64(123_456_789_012).unwrap();
        assert_eq!(id.formatted(), "123-456-789012");
    }

    #[test]
    fn from_u64_enforces_digit_count() {
        assert!(Ccid::from_u64(999_999_999).is_err());
        assert!(Ccid::from_u64(1_000_000_000).is_ok());
        assert!(Ccid::from_u64(999_999_999_999).is_ok());
        assert!(Ccid::from_u64(1_000_000_000_000).is_err());
    }

    #[test]
    fn deserializes_from_number_or_string() {
        let from_number: Ccid = serde_json::from_str("1234567890").unwrap();
        let from_string: Ccid = serde_json::from_str("\"123-456-7890\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn deserialize_rejects_bad_length() {
        assert!(serde_json::from_str::<Ccid>("12345").is_err());
    }

    #[test]
    fn serializes_as_normalized_number() {
        let id = Ccid::parse("123-456-7890").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "1234567890");
    }
}
