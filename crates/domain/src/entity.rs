use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_core::{AppError, AppResult};

/// Stable action names shared by role definitions and permission maps.
pub mod actions {
    /// Read the entity.
    pub const READ: &str = "read";
    /// Update entity attributes or status.
    pub const UPDATE: &str = "update";
    /// Delete the entity.
    pub const DELETE: &str = "delete";
    /// Be listed as a member of the entity.
    pub const MEMBERSHIP: &str = "membership";
    /// Attach or detach child groups.
    pub const SET_CHILD: &str = "set_child";
    /// Attach or detach the parent group.
    pub const SET_PARENT: &str = "set_parent";
    /// Attach or detach the parent group of a channel or client.
    pub const SET_PARENT_GROUP: &str = "set_parent_group";
    /// Publish messages on a channel.
    pub const PUBLISH: &str = "publish";
    /// Subscribe to messages on a channel.
    pub const SUBSCRIBE: &str = "subscribe";
    /// Connect clients to a channel.
    pub const CONNECT_TO_CLIENT: &str = "connect_to_client";
    /// Connect a client to channels.
    pub const CONNECT_TO_CHANNEL: &str = "connect_to_channel";
    /// Create, rename and delete roles and edit their actions.
    pub const MANAGE_ROLE: &str = "manage_role";
    /// Add members to roles.
    pub const ADD_ROLE_USERS: &str = "add_role_users";
    /// Remove members from roles.
    pub const REMOVE_ROLE_USERS: &str = "remove_role_users";
    /// View roles, their actions and members.
    pub const VIEW_ROLE_USERS: &str = "view_role_users";
    /// Administer the domain.
    pub const ADMIN: &str = "admin";
    /// Create groups inside the domain.
    pub const GROUP_CREATE: &str = "group_create";
    /// Create channels inside the domain.
    pub const CHANNEL_CREATE: &str = "channel_create";
    /// Create clients inside the domain.
    pub const CLIENT_CREATE: &str = "client_create";
}

/// Name of the built-in administrator role provisioned for every entity.
pub const BUILT_IN_ADMIN_ROLE: &str = "admin";

/// Kind of resource that can own roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Group of channels, clients and sub-groups.
    Group,
    /// Message channel.
    Channel,
    /// Device or service client.
    Client,
    /// Tenant domain.
    Domain,
}

impl EntityKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Channel => "channel",
            Self::Client => "client",
            Self::Domain => "domain",
        }
    }

    /// Returns the actions a role on this kind of entity may hold.
    #[must_use]
    pub fn available_actions(&self) -> &'static [&'static str] {
        const GROUP: &[&str] = &[
            actions::READ,
            actions::UPDATE,
            actions::DELETE,
            actions::MEMBERSHIP,
            actions::SET_CHILD,
            actions::SET_PARENT,
            actions::MANAGE_ROLE,
            actions::ADD_ROLE_USERS,
            actions::REMOVE_ROLE_USERS,
            actions::VIEW_ROLE_USERS,
        ];
        const CHANNEL: &[&str] = &[
            actions::READ,
            actions::UPDATE,
            actions::DELETE,
            actions::PUBLISH,
            actions::SUBSCRIBE,
            actions::CONNECT_TO_CLIENT,
            actions::SET_PARENT_GROUP,
            actions::MANAGE_ROLE,
            actions::ADD_ROLE_USERS,
            actions::REMOVE_ROLE_USERS,
            actions::VIEW_ROLE_USERS,
        ];
        const CLIENT: &[&str] = &[
            actions::READ,
            actions::UPDATE,
            actions::DELETE,
            actions::CONNECT_TO_CHANNEL,
            actions::SET_PARENT_GROUP,
            actions::MANAGE_ROLE,
            actions::ADD_ROLE_USERS,
            actions::REMOVE_ROLE_USERS,
            actions::VIEW_ROLE_USERS,
        ];
        const DOMAIN: &[&str] = &[
            actions::READ,
            actions::UPDATE,
            actions::MEMBERSHIP,
            actions::ADMIN,
            actions::GROUP_CREATE,
            actions::CHANNEL_CREATE,
            actions::CLIENT_CREATE,
            actions::MANAGE_ROLE,
            actions::ADD_ROLE_USERS,
            actions::REMOVE_ROLE_USERS,
            actions::VIEW_ROLE_USERS,
        ];

        match self {
            Self::Group => GROUP,
            Self::Channel => CHANNEL,
            Self::Client => CLIENT,
            Self::Domain => DOMAIN,
        }
    }

    /// Validates that every action belongs to this kind's catalog.
    pub fn validate_actions<S: AsRef<str>>(&self, requested: &[S]) -> AppResult<()> {
        let available = self.available_actions();
        let unknown: Vec<&str> = requested
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|action| !available.contains(action))
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "actions [{}] are not available for {} roles",
            unknown.join(", "),
            self.as_str()
        )))
    }

    /// Returns the built-in roles applied to every entity of this kind.
    #[must_use]
    pub fn built_in_roles(&self) -> Vec<BuiltInRole> {
        vec![BuiltInRole {
            kind: *self,
            name: BUILT_IN_ADMIN_ROLE,
        }]
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "group" => Ok(Self::Group),
            "channel" => Ok(Self::Channel),
            "client" => Ok(Self::Client),
            "domain" => Ok(Self::Domain),
            _ => Err(AppError::Validation(format!(
                "unknown entity kind '{value}'"
            ))),
        }
    }
}

/// Implicit role with a fixed action set, provisioned with every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuiltInRole {
    kind: EntityKind,
    name: &'static str,
}

impl BuiltInRole {
    /// Finds the built-in role with the given name for an entity kind.
    #[must_use]
    pub fn find(kind: EntityKind, name: &str) -> Option<Self> {
        kind.built_in_roles()
            .into_iter()
            .find(|role| role.name == name)
    }

    /// Returns whether the role name is reserved for a built-in role.
    #[must_use]
    pub fn is_reserved(kind: EntityKind, name: &str) -> bool {
        Self::find(kind, name).is_some()
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the entity kind the role applies to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the fixed action set of the role.
    #[must_use]
    pub fn actions(&self) -> &'static [&'static str] {
        // The only built-in role today is the administrator, which holds every action.
        self.kind.available_actions()
    }
}
