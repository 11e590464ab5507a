use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{AppError, AppResult, DomainId, NonEmptyString};

use crate::{EntityStatus, actions};

/// Message channel owned by a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    id: String,
    domain_id: DomainId,
    parent_group_id: Option<String>,
    name: NonEmptyString,
    status: EntityStatus,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl Channel {
    /// Creates a new enabled channel.
    pub fn new(
        id: impl Into<String>,
        domain_id: DomainId,
        name: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: NonEmptyString::new(id)?.into(),
            domain_id,
            parent_group_id: None,
            name: NonEmptyString::new(name.into().trim())?,
            status: EntityStatus::Enabled,
            created_by: created_by.into(),
            created_at,
        })
    }

    /// Rebuilds a channel from persisted values.
    pub fn restore(
        id: impl Into<String>,
        domain_id: DomainId,
        parent_group_id: Option<String>,
        name: impl Into<String>,
        status: EntityStatus,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: id.into(),
            domain_id,
            parent_group_id,
            name: NonEmptyString::new(name)?,
            status,
            created_by: created_by.into(),
            created_at,
        })
    }

    /// Returns the channel identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the owning domain.
    #[must_use]
    pub fn domain_id(&self) -> &DomainId {
        &self.domain_id
    }

    /// Returns the parent group, if any.
    #[must_use]
    pub fn parent_group_id(&self) -> Option<&str> {
        self.parent_group_id.as_deref()
    }

    /// Returns the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> EntityStatus {
        self.status
    }

    /// Returns the creating subject.
    #[must_use]
    pub fn created_by(&self) -> &str {
        self.created_by.as_str()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sets or clears the parent group.
    pub fn set_parent_group(&mut self, parent_group_id: Option<String>) {
        self.parent_group_id = parent_group_id;
    }
}

/// Direction of traffic a client may use on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Client may publish messages.
    Publish,
    /// Client may receive messages.
    Subscribe,
}

impl ConnectionType {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Subscribe => "subscribe",
        }
    }

    /// Returns the channel action a user needs for this connection type.
    #[must_use]
    pub fn required_action(&self) -> &'static str {
        match self {
            Self::Publish => actions::PUBLISH,
            Self::Subscribe => actions::SUBSCRIBE,
        }
    }
}

impl FromStr for ConnectionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "publish" => Ok(Self::Publish),
            "subscribe" => Ok(Self::Subscribe),
            _ => Err(AppError::Validation(format!(
                "unknown connection type '{value}'"
            ))),
        }
    }
}

/// Client connection to a channel for one traffic direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    /// Channel identifier.
    pub channel_id: String,
    /// Client identifier.
    pub client_id: String,
    /// Domain both sides belong to.
    pub domain_id: DomainId,
    /// Allowed traffic direction.
    pub connection_type: ConnectionType,
}

/// Minimal entity projection served to peer services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Entity identifier.
    pub id: String,
    /// Owning domain.
    pub domain_id: DomainId,
    /// Parent group, if any.
    pub parent_group_id: Option<String>,
    /// Lifecycle status.
    pub status: EntityStatus,
}

impl From<&Channel> for EntitySummary {
    fn from(value: &Channel) -> Self {
        Self {
            id: value.id().to_owned(),
            domain_id: value.domain_id().clone(),
            parent_group_id: value.parent_group_id().map(str::to_owned),
            status: value.status(),
        }
    }
}

impl From<&crate::Group> for EntitySummary {
    fn from(value: &crate::Group) -> Self {
        Self {
            id: value.id().to_owned(),
            domain_id: value.domain_id().clone(),
            parent_group_id: value.parent_id().map(str::to_owned),
            status: value.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::ConnectionType;

    #[test]
    fn connection_type_maps_to_channel_action() {
        assert_eq!(ConnectionType::Publish.required_action(), "publish");
        assert_eq!(
            ConnectionType::from_str("subscribe").ok(),
            Some(ConnectionType::Subscribe)
        );
        assert!(ConnectionType::from_str("both").is_err());
    }
}
