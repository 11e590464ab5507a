use async_trait::async_trait;

use strata_core::{AppResult, DomainId, SubjectKind};
use strata_domain::EntityKind;

/// Relationship check sent to the external policy service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRequest {
    /// Subject identifier.
    pub subject: String,
    /// Subject kind.
    pub subject_kind: SubjectKind,
    /// Permission evaluated on the object.
    pub permission: String,
    /// Object identifier.
    pub object: String,
    /// Object kind.
    pub object_kind: EntityKind,
    /// Domain the check is scoped to, when known.
    pub domain: Option<DomainId>,
}

/// Port for relationship-based policy decisions.
///
/// `Ok(false)` is a denial. Errors mean no decision was reached and must never
/// be treated as a grant.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Returns whether the subject holds the permission on the object.
    async fn authorize(&self, request: &PolicyRequest) -> AppResult<bool>;
}
