use async_trait::async_trait;
use chrono::{DateTime, Utc};

use strata_core::{AppResult, DomainId, Page, PageQuery};
use strata_domain::{EntityStatus, Group, HierarchyEntry, HierarchyQuery, StatusCascade};

/// Input payload for group creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGroupInput {
    /// Group name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Optional parent to attach the new group under.
    pub parent_id: Option<String>,
}

/// Input payload for group attribute updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateGroupInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// Filters for listing groups in one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupListQuery {
    /// Page parameters.
    pub page: PageQuery,
    /// Case-insensitive name fragment.
    pub name: Option<String>,
    /// Status filter; deleted groups are listed only when asked for.
    pub status: Option<EntityStatus>,
}

impl GroupListQuery {
    /// Returns whether `group` matches the filters.
    #[must_use]
    pub fn matches(&self, group: &Group) -> bool {
        let status_matches = match self.status {
            Some(status) => group.status() == status,
            None => !group.is_deleted(),
        };
        let name_matches = self.name.as_deref().is_none_or(|fragment| {
            group
                .name()
                .to_lowercase()
                .contains(fragment.to_lowercase().as_str())
        });

        status_matches && name_matches
    }
}

/// Status transition applied to a group and, by policy, its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Target group.
    pub group_id: String,
    /// New status.
    pub status: EntityStatus,
    /// Whether descendants change too.
    pub cascade: StatusCascade,
    /// Updating subject.
    pub updated_by: String,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Persistence port for groups and their hierarchy.
///
/// Every mutation runs in one storage transaction; tree invariants are checked
/// against the state read inside that transaction.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Stores a new group.
    async fn create_group(&self, group: Group) -> AppResult<Group>;

    /// Finds a group by identifier in any status.
    async fn find_group(&self, group_id: &str) -> AppResult<Option<Group>>;

    /// Replaces group attributes.
    async fn update_group(&self, group: Group) -> AppResult<Group>;

    /// Lists groups of one domain in name order.
    async fn list_groups(
        &self,
        domain_id: &DomainId,
        query: &GroupListQuery,
    ) -> AppResult<Page<Group>>;

    /// Lists direct children of a group in name order, deleted ones excluded.
    async fn list_children(&self, parent_id: &str, page: PageQuery) -> AppResult<Page<Group>>;

    /// Returns ancestors or descendants nearest first.
    async fn retrieve_hierarchy(
        &self,
        group_id: &str,
        query: &HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>>;

    /// Attaches children under a parent, all or nothing.
    ///
    /// Returns the ids that were newly attached.
    async fn assign_parent(&self, parent_id: &str, child_ids: &[String]) -> AppResult<Vec<String>>;

    /// Detaches children of `parent_id`; `None` detaches every child.
    ///
    /// Listed ids that are not children of the parent are ignored.
    async fn unassign_children(
        &self,
        parent_id: &str,
        child_ids: Option<&[String]>,
    ) -> AppResult<Vec<String>>;

    /// Makes the group a root.
    async fn detach_from_parent(&self, group_id: &str) -> AppResult<()>;

    /// Applies a status change and returns the ids of every changed group.
    ///
    /// Deleting detaches the target from its parent. Under `TargetOnly` the
    /// children of a deleted group become roots.
    async fn change_status(&self, change: StatusChange) -> AppResult<Vec<String>>;
}

/// Port notified when groups disappear so dependents can drop their links.
#[async_trait]
pub trait GroupDependents: Send + Sync {
    /// Clears references to the deleted groups.
    async fn groups_deleted(&self, group_ids: &[String]) -> AppResult<()>;
}
