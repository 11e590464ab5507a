use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller identity is missing or invalid.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Message wrapped around an underlying cause.
    #[error("{context}: {source}")]
    Context {
        /// Message describing what was being attempted.
        context: String,
        /// Wrapped cause.
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wraps this error with an additional message.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        classify_error(self)
    }

    fn sentinel_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Validation(_) => Some(ErrorKind::Malformed),
            Self::NotFound(_) => Some(ErrorKind::NotFound),
            Self::Conflict(_) => Some(ErrorKind::Conflict),
            Self::Unauthorized(_) => Some(ErrorKind::Unauthenticated),
            Self::Forbidden(_) => Some(ErrorKind::Forbidden),
            Self::Internal(_) => Some(ErrorKind::Internal),
            Self::Context { .. } => None,
        }
    }
}

/// Taxonomy bucket that transport boundaries translate into statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client input failed validation.
    Malformed,
    /// Caller identity is missing or invalid.
    Unauthenticated,
    /// Caller identity is known but permission was denied.
    Forbidden,
    /// Entity or role is absent.
    NotFound,
    /// Duplicate name, cyclic attach or concurrent modification.
    Conflict,
    /// Storage or policy failure not attributable to the caller.
    Internal,
}

impl ErrorKind {
    /// Returns a stable label for logs and payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Walks the full cause chain and returns the first sentinel classification.
///
/// Wrappers that are not [`AppError`] sentinels are skipped; a chain without
/// any sentinel is classified as [`ErrorKind::Internal`]. Boxed context causes
/// are looked through.
#[must_use]
pub fn classify_error(error: &(dyn StdError + 'static)) -> ErrorKind {
    std::iter::successors(Some(error), |&current| current.source())
        .filter_map(|current| {
            current.downcast_ref::<AppError>().or_else(|| {
                current
                    .downcast_ref::<Box<AppError>>()
                    .map(|boxed| boxed.as_ref())
            })
        })
        .find_map(AppError::sentinel_kind)
        .unwrap_or(ErrorKind::Internal)
}

/// Extension for attaching context to fallible results.
pub trait ResultExt<T> {
    /// Wraps the error, if any, with a message.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Wraps the error, if any, with a lazily built message.
    fn with_context<F, S>(self, build: F) -> Result<T, AppError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|error| error.context(context))
    }

    fn with_context<F, S>(self, build: F) -> Result<T, AppError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|error| error.context(build()))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use std::fmt::{Display, Formatter};

    use super::{AppError, ErrorKind, ResultExt, classify_error};

    #[derive(Debug)]
    struct ForeignWrapper(AppError);

    impl Display for ForeignWrapper {
        fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("foreign wrapper")
        }
    }

    impl StdError for ForeignWrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn sentinel_is_found_below_nested_context() {
        let error = AppError::NotFound("role 'role-x'".to_owned())
            .context("failed to retrieve role")
            .context("failed to update role");

        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(
            error.to_string(),
            "failed to update role: failed to retrieve role: not found: role 'role-x'"
        );
    }

    #[test]
    fn sentinel_is_found_below_foreign_wrapper() {
        let error = ForeignWrapper(AppError::Conflict("cycle".to_owned()).context("attach"));
        assert_eq!(classify_error(&error), ErrorKind::Conflict);
    }

    #[test]
    fn chain_without_sentinel_is_internal() {
        let error = std::io::Error::other("disk");
        assert_eq!(classify_error(&error), ErrorKind::Internal);
    }

    #[test]
    fn result_context_preserves_kind() {
        let result: Result<(), AppError> =
            Err(AppError::Forbidden("denied".to_owned())).with_context(|| "group g1");
        assert!(matches!(
            result.map_err(|error| error.kind()),
            Err(ErrorKind::Forbidden)
        ));
    }
}
