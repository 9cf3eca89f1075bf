//! Address validation. Purely syntactic, nothing is fetched.

use crate::error::InputError;
use url::Url;

/// Parse a candidate address as an absolute URL.
pub fn parse_address(candidate: &str) -> Result<Url, InputError> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    // `Url::parse` rejects relative references, so anything that parses is absolute.
    Url::parse(trimmed).map_err(|e| InputError::Malformed(format!("{} ({})", trimmed, e)))
}

/// Whether the candidate is a syntactically valid absolute URL.
pub fn is_valid_address(candidate: &str) -> bool {
    parse_address(candidate).is_ok()
}

/// Address text as typed, with its validity tracked alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressField {
    value: String,
    valid: bool,
}

impl AddressField {
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.valid = is_valid_address(&self.value);
    }

    pub fn value(&self) -> &str {
        self.value.trim()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
