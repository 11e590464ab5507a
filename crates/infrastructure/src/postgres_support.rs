//! Retry, error mapping and paging shared by the PostgreSQL repositories.

use std::future::Future;
use std::time::Duration;

use strata_core::{AppError, AppResult, Page, PageQuery};
use tracing::{info, warn};

/// SQLSTATE raised for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Retry policy for transient database failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseRetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl DatabaseRetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Duration::from_millis(backoff_ms),
        }
    }

    /// Returns the attempt limit.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for DatabaseRetryPolicy {
    fn default() -> Self {
        Self::new(3, 50)
    }
}

/// Failure of one database attempt.
#[derive(Debug)]
pub(crate) enum StoreError {
    /// Driver or server error; may be retried.
    Database(sqlx::Error),
    /// Domain rejection decided inside the transaction; never retried.
    Rejected(AppError),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error)
    }
}

impl From<AppError> for StoreError {
    fn from(error: AppError) -> Self {
        Self::Rejected(error)
    }
}

impl StoreError {
    fn into_app_error(self, operation: &str) -> AppError {
        match self {
            Self::Rejected(error) => error,
            Self::Database(error) if is_unique_violation(&error) => {
                AppError::Conflict(format!("failed to {operation}: {error}"))
            }
            Self::Database(error) => AppError::Internal(format!("failed to {operation}: {error}")),
        }
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(database_error) => database_error
            .code()
            .is_some_and(|code| code == UNIQUE_VIOLATION),
        _ => false,
    }
}

/// Returns whether the failure is transient.
pub(crate) fn is_retryable(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::WorkerCrashed => true,
        // serialization_failure, deadlock_detected, shutdown and connection exceptions
        sqlx::Error::Database(database_error) => database_error.code().is_some_and(|code| {
            matches!(
                code.as_ref(),
                "40001" | "40P01" | "57P01" | "57P02" | "57P03" | "08000" | "08003" | "08006"
            )
        }),
        _ => false,
    }
}

/// Runs `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// Each attempt must be a complete transaction so a retry never observes
/// partial writes of a failed attempt.
pub(crate) async fn with_retry<F, Fut, T>(
    policy: DatabaseRetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        operation = operation_name,
                        attempt, "database operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(StoreError::Database(error))
                if is_retryable(&error) && attempt < policy.max_attempts =>
            {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "database operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error.into_app_error(operation_name)),
        }
    }
}

/// Returns `(limit, offset)` as SQL bind values.
pub(crate) fn page_bounds(page: PageQuery) -> (i64, i64) {
    (
        i64::try_from(page.limit).unwrap_or(i64::MAX),
        i64::try_from(page.offset).unwrap_or(i64::MAX),
    )
}

/// Assembles a page from fetched rows and a `COUNT(*)` result.
pub(crate) fn page_of<T>(items: Vec<T>, total: i64, page: PageQuery) -> Page<T> {
    Page {
        items,
        total: usize::try_from(total).unwrap_or_default(),
        limit: page.limit,
        offset: page.offset,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use strata_core::AppError;

    use super::{DatabaseRetryPolicy, StoreError, is_retryable, with_retry};

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(DatabaseRetryPolicy::new(3, 1), "load", || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(StoreError::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_internal() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> =
            with_retry(DatabaseRetryPolicy::new(2, 1), "load", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Database(sqlx::Error::PoolTimedOut)) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejections_are_returned_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AppError> =
            with_retry(DatabaseRetryPolicy::default(), "attach", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Rejected(AppError::Conflict("cycle".to_owned()))) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_rows_are_not_transient() {
        assert!(!is_retryable(&sqlx::Error::RowNotFound));
        assert!(is_retryable(&sqlx::Error::PoolTimedOut));
    }
}
