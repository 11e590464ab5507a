use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use strata_core::{AppError, AppResult, CallerIdentity, SubjectKind};
use strata_domain::EntityKind;

use crate::policy_ports::{PolicyClient, PolicyRequest};
use crate::role_ports::RoleRepository;

/// Default bound on one policy service round trip.
pub const DEFAULT_POLICY_TIMEOUT: Duration = Duration::from_secs(2);

/// Permission check against one entity.
#[derive(Debug, Clone, Copy)]
pub struct AccessCheck<'a> {
    /// Entity the action targets.
    pub entity_id: &'a str,
    /// Kind of the target entity.
    pub entity_kind: EntityKind,
    /// Action a local role must grant.
    pub action: &'a str,
    /// Permission asked from the policy service, `None` when not delegable.
    pub external_permission: Option<&'a str>,
}

/// Source of a granted decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// A role held on the entity grants the action.
    LocalRole,
    /// The policy service granted the permission.
    Policy,
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Access granted.
    Granted(DecisionSource),
    /// Access denied.
    Denied,
}

impl Decision {
    /// Returns whether access was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Decides grant or deny by combining local roles with the policy service.
#[derive(Clone)]
pub struct PermissionResolver {
    roles: Arc<dyn RoleRepository>,
    policy: Arc<dyn PolicyClient>,
    policy_timeout: Duration,
}

impl PermissionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        policy: Arc<dyn PolicyClient>,
        policy_timeout: Duration,
    ) -> Self {
        Self {
            roles,
            policy,
            policy_timeout,
        }
    }

    /// Resolves a check for `caller`.
    ///
    /// A user without a domain is rejected before any lookup. The policy
    /// service is asked only when no local role grants the action and the
    /// check carries an external permission.
    pub async fn decide(
        &self,
        caller: &CallerIdentity,
        check: AccessCheck<'_>,
    ) -> AppResult<Decision> {
        if caller.kind() == SubjectKind::User {
            caller.require_domain()?;
        }

        if self.has_local_grant(caller.subject(), check).await? {
            debug!(
                subject = caller.subject(),
                entity_id = check.entity_id,
                action = check.action,
                "granted by local role"
            );
            return Ok(Decision::Granted(DecisionSource::LocalRole));
        }

        let Some(permission) = check.external_permission else {
            return Ok(Decision::Denied);
        };

        let request = PolicyRequest {
            subject: caller.subject().to_owned(),
            subject_kind: caller.kind(),
            permission: permission.to_owned(),
            object: check.entity_id.to_owned(),
            object_kind: check.entity_kind,
            domain: caller.domain_id().cloned(),
        };

        if self.ask_policy(&request).await? {
            debug!(
                subject = caller.subject(),
                entity_id = check.entity_id,
                permission,
                "granted by policy service"
            );
            return Ok(Decision::Granted(DecisionSource::Policy));
        }

        Ok(Decision::Denied)
    }

    /// Resolves a check and turns a denial into `Forbidden`.
    pub async fn require(
        &self,
        caller: &CallerIdentity,
        check: AccessCheck<'_>,
    ) -> AppResult<DecisionSource> {
        match self.decide(caller, check).await? {
            Decision::Granted(source) => Ok(source),
            Decision::Denied => Err(AppError::Forbidden(format!(
                "subject '{}' is missing action '{}' on {} '{}'",
                caller.subject(),
                check.action,
                check.entity_kind.as_str(),
                check.entity_id
            ))),
        }
    }

    async fn has_local_grant(&self, subject: &str, check: AccessCheck<'_>) -> AppResult<bool> {
        let snapshot = self
            .roles
            .retrieve_entities_roles_actions_members(&[check.entity_id.to_owned()])
            .await?;

        Ok(snapshot
            .member_actions(check.entity_id, subject)
            .contains(check.action))
    }

    async fn ask_policy(&self, request: &PolicyRequest) -> AppResult<bool> {
        match tokio::time::timeout(self.policy_timeout, self.policy.authorize(request)).await {
            Ok(decision) => decision,
            Err(_) => {
                warn!(
                    subject = %request.subject,
                    object = %request.object,
                    timeout_ms = self.policy_timeout.as_millis() as u64,
                    "policy decision timed out"
                );
                Err(AppError::Internal(format!(
                    "policy decision for '{}' on '{}' timed out",
                    request.subject, request.object
                )))
            }
        }
    }
}
