//! Shared primitives for all Rust crates in Strata.

#![forbid(unsafe_code)]

/// Caller identity primitives shared across services.
pub mod auth;
mod error;
mod page;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use auth::{CallerIdentity, SubjectKind};
pub use error::{AppError, ErrorKind, ResultExt, classify_error};
pub use page::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, Page, PageQuery};

/// Result type used across Strata crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Domain identifier used as the partition key for every tenant-owned resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    /// Creates a validated domain identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("domain id is required".to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for DomainId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainId, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn domain_id_is_trimmed() {
        let domain_id = DomainId::new("  domain-1 ").unwrap_or_else(|_| unreachable!());
        assert_eq!(domain_id.as_str(), "domain-1");
        assert_eq!(domain_id.to_string(), "domain-1");
    }

    #[test]
    fn blank_domain_id_is_rejected() {
        assert!(DomainId::new("").is_err());
    }
}
