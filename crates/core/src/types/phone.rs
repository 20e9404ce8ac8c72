//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains too few digits.
    #[error("phone number must contain at least {min} digits")]
    TooShort {
        /// Minimum number of digits required.
        min: usize,
    },
    /// The input contains a character that is not a digit, space, or one of `+ - ( )`.
    #[error("phone number contains invalid character: {0:?}")]
    InvalidCharacter(char),
}

/// A phone number.
///
/// Validation is deliberately loose: the backend owns real verification and
/// delivery, the client only rejects obvious garbage before the round trip.
/// Accepted characters are digits, spaces, and `+ - ( )`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits in a phone number.
    pub const MIN_DIGITS: usize = 7;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains fewer than
    /// [`Self::MIN_DIGITS`] digits, or contains a disallowed character.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        for c in trimmed.chars() {
            if !(c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')')) {
                return Err(PhoneNumberError::InvalidCharacter(c));
            }
        }

        let digits = trimmed.chars().filter(char::is_ascii_digit).count();
        if digits < Self::MIN_DIGITS {
            return Err(PhoneNumberError::TooShort {
                min: Self::MIN_DIGITS,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PhoneNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
