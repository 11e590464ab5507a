use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use strata_application::{GroupListQuery, GroupRepository, StatusChange};
use strata_core::{AppError, AppResult, DomainId, Page, PageQuery};
use strata_domain::hierarchy::{collect_ancestors, collect_descendants, plan_parent_assignment};
use strata_domain::{
    EntityStatus, Group, HierarchyDirection, HierarchyEntry, HierarchyQuery, StatusCascade,
};

/// In-memory group repository.
///
/// Mutations hold the write lock for their whole duration, so each one sees a
/// consistent tree.
#[derive(Debug, Default)]
pub struct InMemoryGroupRepository {
    groups: RwLock<HashMap<String, Group>>,
}

impl InMemoryGroupRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn require<'a>(groups: &'a HashMap<String, Group>, group_id: &str) -> AppResult<&'a Group> {
    groups
        .get(group_id)
        .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' was not found")))
}

fn live_children(groups: &HashMap<String, Group>, parent_id: &str) -> Vec<Group> {
    groups
        .values()
        .filter(|group| group.parent_id() == Some(parent_id) && !group.is_deleted())
        .cloned()
        .collect()
}

fn sort_by_name(groups: &mut [Group]) {
    groups.sort_by(|left, right| {
        left.name()
            .cmp(right.name())
            .then_with(|| left.id().cmp(right.id()))
    });
}

fn ancestor_ids(groups: &HashMap<String, Group>, group: &Group) -> AppResult<Vec<String>> {
    let query = HierarchyQuery::new(HierarchyDirection::Up, 0)?;
    let entries = collect_ancestors(group, &query, |id| Ok(groups.get(id).cloned()))?;
    Ok(entries
        .into_iter()
        .map(|entry| entry.group.id().to_owned())
        .collect())
}

fn descendant_ids(groups: &HashMap<String, Group>, group: &Group) -> AppResult<Vec<String>> {
    let query = HierarchyQuery::new(HierarchyDirection::Down, 0)?;
    let entries = collect_descendants(group, &query, |id| Ok(live_children(groups, id)))?;
    Ok(entries
        .into_iter()
        .map(|entry| entry.group.id().to_owned())
        .collect())
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create_group(&self, group: Group) -> AppResult<Group> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(group.id()) {
            return Err(AppError::Conflict(format!(
                "group '{}' already exists",
                group.id()
            )));
        }

        groups.insert(group.id().to_owned(), group.clone());
        Ok(group)
    }

    async fn find_group(&self, group_id: &str) -> AppResult<Option<Group>> {
        Ok(self.groups.read().await.get(group_id).cloned())
    }

    async fn update_group(&self, group: Group) -> AppResult<Group> {
        let mut groups = self.groups.write().await;
        require(&groups, group.id())?;
        groups.insert(group.id().to_owned(), group.clone());
        Ok(group)
    }

    async fn list_groups(
        &self,
        domain_id: &DomainId,
        query: &GroupListQuery,
    ) -> AppResult<Page<Group>> {
        let groups = self.groups.read().await;
        let mut listed: Vec<Group> = groups
            .values()
            .filter(|group| group.domain_id() == domain_id && query.matches(group))
            .cloned()
            .collect();
        sort_by_name(&mut listed);
        Ok(query.page.paginate(listed))
    }

    async fn list_children(&self, parent_id: &str, page: PageQuery) -> AppResult<Page<Group>> {
        let groups = self.groups.read().await;
        require(&groups, parent_id)?;
        let mut children = live_children(&groups, parent_id);
        sort_by_name(&mut children);
        Ok(page.paginate(children))
    }

    async fn retrieve_hierarchy(
        &self,
        group_id: &str,
        query: &HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>> {
        let groups = self.groups.read().await;
        let start = require(&groups, group_id)?;

        match query.direction() {
            HierarchyDirection::Up => {
                collect_ancestors(start, query, |id| Ok(groups.get(id).cloned()))
            }
            HierarchyDirection::Down => {
                collect_descendants(start, query, |id| Ok(live_children(&groups, id)))
            }
        }
    }

    async fn assign_parent(&self, parent_id: &str, child_ids: &[String]) -> AppResult<Vec<String>> {
        let mut groups = self.groups.write().await;
        let parent = require(&groups, parent_id)?;
        let ancestors = ancestor_ids(&groups, parent)?;
        let children = child_ids
            .iter()
            .map(|child_id| require(&groups, child_id).cloned())
            .collect::<AppResult<Vec<_>>>()?;

        let pending = plan_parent_assignment(parent, &ancestors, &children)?;
        for child_id in &pending {
            if let Some(child) = groups.get_mut(child_id) {
                child.set_parent(Some(parent_id.to_owned()));
            }
        }

        Ok(pending)
    }

    async fn unassign_children(
        &self,
        parent_id: &str,
        child_ids: Option<&[String]>,
    ) -> AppResult<Vec<String>> {
        let mut groups = self.groups.write().await;
        require(&groups, parent_id)?;

        let mut detached = Vec::new();
        for group in groups.values_mut() {
            let listed = child_ids.is_none_or(|ids| ids.iter().any(|id| id == group.id()));
            if group.parent_id() == Some(parent_id) && listed {
                group.set_parent(None);
                detached.push(group.id().to_owned());
            }
        }

        detached.sort();
        Ok(detached)
    }

    async fn detach_from_parent(&self, group_id: &str) -> AppResult<()> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' was not found")))?;
        group.set_parent(None);
        Ok(())
    }

    async fn change_status(&self, change: StatusChange) -> AppResult<Vec<String>> {
        let mut groups = self.groups.write().await;
        let target = require(&groups, change.group_id.as_str())?;

        let mut changed = vec![target.id().to_owned()];
        if change.cascade == StatusCascade::Descendants {
            changed.extend(descendant_ids(&groups, target)?);
        }
        let orphaned = if change.status == EntityStatus::Deleted
            && change.cascade == StatusCascade::TargetOnly
        {
            live_children(&groups, change.group_id.as_str())
                .into_iter()
                .map(|child| child.id().to_owned())
                .collect()
        } else {
            Vec::new()
        };

        for group_id in &changed {
            if let Some(group) = groups.get_mut(group_id) {
                group.set_status(change.status, change.updated_by.as_str(), change.updated_at);
            }
        }
        if change.status == EntityStatus::Deleted {
            if let Some(target) = groups.get_mut(change.group_id.as_str()) {
                target.set_parent(None);
            }
            for child_id in &orphaned {
                if let Some(child) = groups.get_mut(child_id) {
                    child.set_parent(None);
                }
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests;
