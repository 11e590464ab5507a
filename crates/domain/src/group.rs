use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{AppError, AppResult, DomainId, NonEmptyString};

/// Lifecycle status shared by groups and channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Entity is active.
    Enabled,
    /// Entity is kept but inactive.
    Disabled,
    /// Entity was deleted and is no longer addressable.
    Deleted,
}

impl EntityStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for EntityStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "deleted" => Ok(Self::Deleted),
            _ => Err(AppError::Validation(format!("unknown status '{value}'"))),
        }
    }
}

/// Whether group status changes propagate to the subtree below the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCascade {
    /// Only the targeted group changes; on delete its children become roots.
    #[default]
    TargetOnly,
    /// The targeted group and every descendant change together.
    Descendants,
}

impl FromStr for StatusCascade {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "target_only" => Ok(Self::TargetOnly),
            "descendants" => Ok(Self::Descendants),
            _ => Err(AppError::Validation(format!(
                "status cascade must be 'target_only' or 'descendants', got '{value}'"
            ))),
        }
    }
}

/// Group node in a domain's hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: String,
    domain_id: DomainId,
    parent_id: Option<String>,
    name: NonEmptyString,
    description: String,
    status: EntityStatus,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates a new enabled root group.
    pub fn new(
        id: impl Into<String>,
        domain_id: DomainId,
        name: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let created_by = created_by.into();
        Ok(Self {
            id: NonEmptyString::new(id)?.into(),
            domain_id,
            parent_id: None,
            name: NonEmptyString::new(name.into().trim())?,
            description: description.into(),
            status: EntityStatus::Enabled,
            updated_by: created_by.clone(),
            created_by,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rebuilds a group from persisted values.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: impl Into<String>,
        domain_id: DomainId,
        parent_id: Option<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        status: EntityStatus,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_by: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: id.into(),
            domain_id,
            parent_id,
            name: NonEmptyString::new(name)?,
            description: description.into(),
            status,
            created_by: created_by.into(),
            created_at,
            updated_by: updated_by.into(),
            updated_at,
        })
    }

    /// Returns the group identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the owning domain.
    #[must_use]
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    /// Returns the parent group identifier, if attached.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the group description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> EntityStatus {
        self.status
    }

    /// Returns the subject that created the group.
    #[must_use]
    pub fn created_by(&self) -> &str {
        self.created_by.as_str()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the subject that last updated the group.
    #[must_use]
    pub fn updated_by(&self) -> &str {
        self.updated_by.as_str()
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the group is still addressable.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == EntityStatus::Deleted
    }

    /// Sets or clears the parent link.
    pub fn set_parent(&mut self, parent_id: Option<String>) {
        self.parent_id = parent_id;
    }

    /// Applies a status transition stamped with the updating subject.
    pub fn set_status(
        &mut self,
        status: EntityStatus,
        updated_by: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) {
        self.status = status;
        self.updated_by = updated_by.into();
        self.updated_at = updated_at;
    }

    /// Applies attribute changes stamped with the updating subject.
    pub fn apply_update(
        &mut self,
        name: Option<String>,
        description: Option<String>,
        updated_by: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(name) = name {
            self.name = NonEmptyString::new(name.trim())?;
        }
        if let Some(description) = description {
            self.description = description;
        }
        self.updated_by = updated_by.into();
        self.updated_at = updated_at;
        Ok(())
    }
}
