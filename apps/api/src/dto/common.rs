use serde::{Deserialize, Serialize};
use strata_core::{AppResult, PageQuery};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Offset pagination query string.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageParams {
    pub fn into_page_query(self) -> AppResult<PageQuery> {
        PageQuery::from_optional(self.limit, self.offset)
    }
}
