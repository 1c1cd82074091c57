/// Input validation for dashboard requests
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("{0} cannot contain '/'")]
    ContainsSlash(&'static str),

    #[error("Server name cannot be empty")]
    ServerNameEmpty,
}

/// Validates a value used as a document id (IPs, Steam64 IDs)
///
/// Rules:
/// - Cannot be empty
/// - Cannot contain '/', which separates path segments in the store
pub fn validate_id(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    if value.contains('/') {
        return Err(ValidationError::ContainsSlash(field));
    }

    Ok(())
}

pub fn validate_server_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::ServerNameEmpty);
    }
    Ok(())
}
