use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, DomainId};

/// Kind of principal issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Human user authenticated through the identity provider.
    User,
    /// Device or service client authenticated with its secret.
    Client,
}

impl SubjectKind {
    /// Returns a stable transport value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Client => "client",
        }
    }
}

impl FromStr for SubjectKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "client" => Ok(Self::Client),
            _ => Err(AppError::Validation(format!(
                "unknown subject type '{value}'"
            ))),
        }
    }
}

/// Authenticated caller of a domain-service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    subject: String,
    kind: SubjectKind,
    domain_id: Option<DomainId>,
}

impl CallerIdentity {
    /// Creates a caller identity from authentication data.
    #[must_use]
    pub fn new(subject: impl Into<String>, kind: SubjectKind, domain_id: Option<DomainId>) -> Self {
        Self {
            subject: subject.into(),
            kind,
            domain_id,
        }
    }

    /// Creates a user identity acting inside one domain.
    #[must_use]
    pub fn user(subject: impl Into<String>, domain_id: DomainId) -> Self {
        Self::new(subject, SubjectKind::User, Some(domain_id))
    }

    /// Returns the stable subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the principal kind.
    #[must_use]
    pub fn kind(&self) -> SubjectKind {
        self.kind
    }

    /// Returns the domain the caller acts in, if any.
    #[must_use]
    pub fn domain_id(&self) -> Option<&DomainId> {
        self.domain_id.as_ref()
    }

    /// Returns the domain, failing for users that did not provide one.
    pub fn require_domain(&self) -> AppResult<&DomainId> {
        self.domain_id.as_ref().ok_or_else(|| {
            AppError::Validation(format!(
                "domain id is required for {} subject '{}'",
                self.kind.as_str(),
                self.subject
            ))
        })
    }
}
