use crate::{AuthError, Result as AuthErrorResult};

use std::fmt;

pub const MIN_PIN_LENGTH: usize = 4;
pub const MAX_PIN_LENGTH: usize = 6;

/// A validated 4-6 digit PIN.
///
/// The digits are only reachable through [`Pin::expose`]; `Debug` is redacted
/// so a PIN never ends up in a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Strip non-digits and truncate to the maximum length.
    pub fn sanitize(input: &str) -> String {
        input
            .chars()
            .filter(char::is_ascii_digit)
            .take(MAX_PIN_LENGTH)
            .collect()
    }

    /// Sanitize, then enforce the minimum length.
    #[track_caller]
    pub fn parse(input: &str) -> AuthErrorResult<Self> {
        let digits = Self::sanitize(input);

        if digits.len() < MIN_PIN_LENGTH {
            return Err(AuthError::invalid_pin(format!(
                "PIN must be at least {MIN_PIN_LENGTH} digits"
            )));
        }

        Ok(Self(digits))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({})", "*".repeat(self.0.len()))
    }
}
