use async_trait::async_trait;
use tracing::debug;

use strata_application::{PolicyClient, PolicyRequest};
use strata_core::AppResult;

/// Policy client used when no policy service is configured; every check is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllPolicyClient;

#[async_trait]
impl PolicyClient for DenyAllPolicyClient {
    async fn authorize(&self, request: &PolicyRequest) -> AppResult<bool> {
        debug!(
            subject = %request.subject,
            permission = %request.permission,
            object = %request.object,
            "no policy service configured, denying"
        );
        Ok(false)
    }
}
