use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantError {
    #[error("Missing accountant identifier")]
    MissingAccountant,
    #[error("Missing client identifier")]
    MissingClient,
    #[error("Invalid {field} identifier: {value}")]
    InvalidSegment { field: &'static str, value: String },
}

/// The `(accountant, client)` pair that scopes every stored chunk and blob.
///
/// Both parts become storage key segments, so they are trimmed, must not
/// contain path separators and must not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tenant {
    accountant: String,
    client: String,
}

impl Tenant {
    pub fn new(accountant: &str, client: &str) -> Result<Self, TenantError> {
        let accountant = validate_segment("accountant", accountant)?
            .ok_or(TenantError::MissingAccountant)?;
        let client = validate_segment("client", client)?.ok_or(TenantError::MissingClient)?;

        Ok(Self { accountant, client })
    }

    pub fn accountant(&self) -> &str {
        &self.accountant
    }

    pub fn client(&self) -> &str {
        &self.client
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.accountant, self.client)
    }
}

/// Validates a single key segment. `Ok(None)` means the segment was blank.
pub fn validate_segment(field: &'static str, raw: &str) -> Result<Option<String>, TenantError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.starts_with('.') {
        return Err(TenantError::InvalidSegment {
            field,
            value: trimmed.to_string(),
        });
    }

    Ok(Some(trimmed.to_string()))
}
