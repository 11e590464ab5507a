use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Default page size applied when a caller does not provide one.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Largest page size accepted from callers.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Offset pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped.
    pub offset: usize,
}

impl PageQuery {
    /// Creates a validated page query.
    pub fn new(limit: usize, offset: usize) -> AppResult<Self> {
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
            )));
        }

        Ok(Self { limit, offset })
    }

    /// Builds a page query from optional transport values.
    pub fn from_optional(limit: Option<usize>, offset: Option<usize>) -> AppResult<Self> {
        Self::new(
            limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            offset.unwrap_or_default(),
        )
    }

    /// Slices an already filtered and ordered result set.
    #[must_use]
    pub fn paginate<T>(&self, matching: Vec<T>) -> Page<T> {
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();

        Page {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// One page of a listing; `total` counts every matching row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows in this page.
    pub items: Vec<T>,
    /// Number of rows matching the query regardless of limit and offset.
    pub total: usize,
    /// Limit used for the page.
    pub limit: usize,
    /// Offset used for the page.
    pub offset: usize,
}

impl<T> Page<T> {
    /// Maps every row while keeping pagination metadata.
    #[must_use]
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(transform).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
