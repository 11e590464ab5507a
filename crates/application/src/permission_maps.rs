//! Static tables from operations to the action they require.

use std::collections::HashMap;

use strata_domain::actions;

/// Group service operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupOperation {
    /// Create a group in the caller's domain.
    Create,
    /// List groups of the caller's domain.
    List,
    /// View one group.
    View,
    /// Change group attributes.
    Update,
    /// Enable a group.
    Enable,
    /// Disable a group.
    Disable,
    /// Delete a group.
    Delete,
    /// Query ancestors or descendants.
    RetrieveHierarchy,
    /// Attach the group under a parent.
    AddParent,
    /// Detach the group from its parent.
    RemoveParent,
    /// Attach children under the group.
    AddChildren,
    /// Detach listed children.
    RemoveChildren,
    /// Detach every child.
    RemoveAllChildren,
    /// List direct children.
    ListChildren,
}

/// Channel service operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOperation {
    /// Create a channel in the caller's domain.
    Create,
    /// View one channel.
    View,
    /// Delete a channel.
    Delete,
    /// Connect clients to the channel.
    Connect,
    /// Disconnect clients from the channel.
    Disconnect,
    /// Attach the channel to a parent group.
    SetParentGroup,
    /// Detach the channel from its parent group.
    RemoveParentGroup,
}

/// Role management operations scoped to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleOperation {
    /// Create a role.
    Add,
    /// Remove a role.
    Remove,
    /// Rename a role.
    Update,
    /// View one role.
    View,
    /// List roles.
    List,
    /// List the action catalog.
    ListAvailableActions,
    /// Add actions to a role.
    AddActions,
    /// List role actions.
    ListActions,
    /// Check role actions.
    CheckActions,
    /// Remove listed actions.
    RemoveActions,
    /// Remove every action.
    RemoveAllActions,
    /// Add members to a role.
    AddMembers,
    /// List role members.
    ListMembers,
    /// Check role members.
    CheckMembers,
    /// Remove listed members.
    RemoveMembers,
    /// Remove every member.
    RemoveAllMembers,
    /// List members of the entity with their roles.
    ListEntityMembers,
    /// Remove members from every role of the entity.
    RemoveEntityMembers,
}

/// Any operation guarded by the authorization middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Group service operation.
    Group(GroupOperation),
    /// Channel service operation.
    Channel(ChannelOperation),
    /// Role management operation.
    Role(RoleOperation),
}

impl Operation {
    /// Returns a stable name used in logs and error messages.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Group(operation) => format!("group.{operation:?}"),
            Self::Channel(operation) => format!("channel.{operation:?}"),
            Self::Role(operation) => format!("role.{operation:?}"),
        }
    }
}

/// Operation to action lookup used by the authorization middleware.
///
/// `operations` covers resource operations, `roles` covers role management and
/// `external` lists operations that may be delegated to the policy service
/// together with the permission asked there.
#[derive(Debug, Clone, Default)]
pub struct PermissionMaps {
    operations: HashMap<Operation, &'static str>,
    roles: HashMap<RoleOperation, &'static str>,
    external: HashMap<Operation, &'static str>,
}

impl PermissionMaps {
    /// Creates maps from explicit tables.
    #[must_use]
    pub fn new(
        operations: HashMap<Operation, &'static str>,
        roles: HashMap<RoleOperation, &'static str>,
        external: HashMap<Operation, &'static str>,
    ) -> Self {
        Self {
            operations,
            roles,
            external,
        }
    }

    /// Returns the action required for `operation`, `None` when unmapped.
    #[must_use]
    pub fn required_action(&self, operation: Operation) -> Option<&'static str> {
        match operation {
            Operation::Role(role_operation) => self.roles.get(&role_operation).copied(),
            resource => self.operations.get(&resource).copied(),
        }
    }

    /// Returns the permission to ask the policy service for, if delegable.
    #[must_use]
    pub fn external_permission(&self, operation: Operation) -> Option<&'static str> {
        self.external.get(&operation).copied()
    }
}

/// Returns the resource operation table.
#[must_use]
pub fn operation_permission_map() -> HashMap<Operation, &'static str> {
    use ChannelOperation as C;
    use GroupOperation as G;

    HashMap::from([
        (Operation::Group(G::Create), actions::GROUP_CREATE),
        (Operation::Group(G::List), actions::MEMBERSHIP),
        (Operation::Group(G::View), actions::READ),
        (Operation::Group(G::Update), actions::UPDATE),
        (Operation::Group(G::Enable), actions::UPDATE),
        (Operation::Group(G::Disable), actions::UPDATE),
        (Operation::Group(G::Delete), actions::DELETE),
        (Operation::Group(G::RetrieveHierarchy), actions::READ),
        (Operation::Group(G::AddParent), actions::SET_PARENT),
        (Operation::Group(G::RemoveParent), actions::SET_PARENT),
        (Operation::Group(G::AddChildren), actions::SET_CHILD),
        (Operation::Group(G::RemoveChildren), actions::SET_CHILD),
        (Operation::Group(G::RemoveAllChildren), actions::SET_CHILD),
        (Operation::Group(G::ListChildren), actions::READ),
        (Operation::Channel(C::Create), actions::CHANNEL_CREATE),
        (Operation::Channel(C::View), actions::READ),
        (Operation::Channel(C::Delete), actions::DELETE),
        (Operation::Channel(C::Connect), actions::CONNECT_TO_CLIENT),
        (Operation::Channel(C::Disconnect), actions::CONNECT_TO_CLIENT),
        (Operation::Channel(C::SetParentGroup), actions::SET_PARENT_GROUP),
        (Operation::Channel(C::RemoveParentGroup), actions::SET_PARENT_GROUP),
    ])
}

/// Returns the role management table.
#[must_use]
pub fn roles_operation_permission_map() -> HashMap<RoleOperation, &'static str> {
    use RoleOperation as R;

    HashMap::from([
        (R::Add, actions::MANAGE_ROLE),
        (R::Remove, actions::MANAGE_ROLE),
        (R::Update, actions::MANAGE_ROLE),
        (R::AddActions, actions::MANAGE_ROLE),
        (R::RemoveActions, actions::MANAGE_ROLE),
        (R::RemoveAllActions, actions::MANAGE_ROLE),
        (R::View, actions::VIEW_ROLE_USERS),
        (R::List, actions::VIEW_ROLE_USERS),
        (R::ListAvailableActions, actions::VIEW_ROLE_USERS),
        (R::ListActions, actions::VIEW_ROLE_USERS),
        (R::CheckActions, actions::VIEW_ROLE_USERS),
        (R::ListMembers, actions::VIEW_ROLE_USERS),
        (R::CheckMembers, actions::VIEW_ROLE_USERS),
        (R::ListEntityMembers, actions::VIEW_ROLE_USERS),
        (R::AddMembers, actions::ADD_ROLE_USERS),
        (R::RemoveMembers, actions::REMOVE_ROLE_USERS),
        (R::RemoveAllMembers, actions::REMOVE_ROLE_USERS),
        (R::RemoveEntityMembers, actions::REMOVE_ROLE_USERS),
    ])
}

/// Returns the table of operations the policy service may grant.
///
/// Resource operations and read-only role operations are delegable; role
/// mutations need a local role.
#[must_use]
pub fn external_operation_permission_map() -> HashMap<Operation, &'static str> {
    let mut external = operation_permission_map();
    for (operation, action) in roles_operation_permission_map() {
        if action == actions::VIEW_ROLE_USERS {
            external.insert(Operation::Role(operation), action);
        }
    }

    external
}

/// Returns the default tables.
#[must_use]
pub fn default_permission_maps() -> PermissionMaps {
    PermissionMaps::new(
        operation_permission_map(),
        roles_operation_permission_map(),
        external_operation_permission_map(),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use strata_domain::{EntityKind, actions};

    use super::{
        ChannelOperation, GroupOperation, Operation, PermissionMaps, RoleOperation,
        default_permission_maps, operation_permission_map, roles_operation_permission_map,
    };

    #[test]
    fn hierarchy_operations_require_link_actions() {
        let maps = default_permission_maps();
        assert_eq!(
            maps.required_action(Operation::Group(GroupOperation::AddParent)),
            Some(actions::SET_PARENT)
        );
        assert_eq!(
            maps.required_action(Operation::Group(GroupOperation::AddChildren)),
            Some(actions::SET_CHILD)
        );
    }

    #[test]
    fn role_mutations_are_not_delegated() {
        let maps = default_permission_maps();
        assert!(
            maps.external_permission(Operation::Role(RoleOperation::AddMembers))
                .is_none()
        );
        assert_eq!(
            maps.external_permission(Operation::Role(RoleOperation::List)),
            Some(actions::VIEW_ROLE_USERS)
        );
    }

    #[test]
    fn entity_actions_come_from_the_owning_catalog() {
        for (operation, action) in operation_permission_map() {
            let kind = match operation {
                Operation::Group(GroupOperation::Create | GroupOperation::List)
                | Operation::Channel(ChannelOperation::Create) => EntityKind::Domain,
                Operation::Group(_) => EntityKind::Group,
                Operation::Channel(_) => EntityKind::Channel,
                Operation::Role(_) => continue,
            };
            assert!(kind.validate_actions(&[action]).is_ok(), "{operation:?}");
        }

        for action in roles_operation_permission_map().into_values() {
            assert!(EntityKind::Group.validate_actions(&[action]).is_ok());
        }
    }

    #[test]
    fn empty_tables_map_nothing() {
        let maps = PermissionMaps::new(HashMap::new(), HashMap::new(), HashMap::new());
        assert!(
            maps.required_action(Operation::Group(GroupOperation::View))
                .is_none()
        );
    }
}
