//! Phone number type.

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone cannot be empty")]
    Empty,
    /// The input contains a character that is not part of a phone number.
    #[error("phone contains unexpected character {0:?}")]
    InvalidCharacter(char),
    /// A `+` appears anywhere but at the start.
    #[error("phone may only start with +")]
    MisplacedPlus,
    /// Too few or too many digits.
    #[error("phone must have between {min} and {max} digits (got {got})")]
    DigitCount {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
        /// Digits found.
        got: usize,
    },
}

/// A phone number as typed by a customer.
///
/// Formatting characters (spaces, dashes, parentheses) are allowed and kept;
/// only the digit count is constrained. The upper bound is the E.164 limit.
///
/// ```
/// use larek_core::Phone;
///
/// assert!(Phone::parse("+7 (999) 123-45-67").is_ok());
/// assert!(Phone::parse("12345678").is_ok());
/// assert!(Phone::parse("12-34").is_err());
/// assert!(Phone::parse("call me").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains anything other than
    /// digits, spaces, `-`, `(`, `)` and a leading `+`, or has a digit count
    /// outside `MIN_DIGITS..=MAX_DIGITS`.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut digits = 0;
        for (i, c) in s.chars().enumerate() {
            match c {
                '0'..='9' => digits += 1,
                ' ' | '-' | '(' | ')' => {}
                '+' if i == 0 => {}
                '+' => return Err(PhoneError::MisplacedPlus),
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(PhoneError::DigitCount {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
                got: digits,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as typed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Phone::parse("12345678").is_ok());
        assert!(Phone::parse("+7 999 123 45 67").is_ok());
        assert!(Phone::parse("(495) 123-45-67").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(Phone::parse("12345abc"), Err(PhoneError::InvalidCharacter('a')));
    }

    #[test]
    fn test_parse_rejects_inner_plus() {
        assert_eq!(Phone::parse("123+4567890"), Err(PhoneError::MisplacedPlus));
    }

    #[test]
    fn test_parse_digit_bounds() {
        assert!(matches!(
            Phone::parse("123456"),
            Err(PhoneError::DigitCount { got: 6, .. })
        ));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::DigitCount { got: 16, .. })
        ));
    }

    #[test]
    fn test_keeps_formatting() {
        let phone = Phone::parse("+7 (999) 123-45-67").unwrap();
        assert_eq!(phone.as_str(), "+7 (999) 123-45-67");
        assert_eq!(
            serde_json::to_string(&phone).unwrap(),
            "\"+7 (999) 123-45-67\""
        );
    }
}
