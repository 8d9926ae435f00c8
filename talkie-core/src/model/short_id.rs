use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact user-facing numeric identifier, distinct from the opaque
/// identity. Digits only; leading zeros are significant for widths >= 2.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct ShortId(String);

impl ShortId {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let digits = raw.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ServiceError::InvalidArgument(
                "provide a numeric ID".to_owned(),
            ));
        }
        Ok(Self(digits.to_owned()))
    }

    /// Render a numeric value at a fixed digit width, zero-padded.
    pub fn from_value(value: u64, width: u32) -> Self {
        Self(format!("{value:0width$}", width = width as usize))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.len() as u32
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
