//! Group tree invariants and traversal.
//!
//! Storage adapters load the rows involved in a mutation inside their own
//! transaction and run the checks here before writing, so the rules are the
//! same for every backend.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strata_core::{AppError, AppResult};

use crate::Group;

/// Deepest level a hierarchy query may request.
pub const MAX_HIERARCHY_LEVEL: u32 = 20;

/// Traversal direction of a hierarchy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyDirection {
    /// Ancestors, nearest parent first.
    Up,
    /// Descendants, direct children first.
    Down,
}

impl HierarchyDirection {
    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl FromStr for HierarchyDirection {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(AppError::Validation(format!(
                "direction must be 'up' or 'down', got '{value}'"
            ))),
        }
    }
}

/// Validated hierarchy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyQuery {
    direction: HierarchyDirection,
    max_level: Option<u32>,
}

impl HierarchyQuery {
    /// Creates a query; `level == 0` means no depth bound.
    pub fn new(direction: HierarchyDirection, level: u32) -> AppResult<Self> {
        if level > MAX_HIERARCHY_LEVEL {
            return Err(AppError::Validation(format!(
                "level must not exceed {MAX_HIERARCHY_LEVEL}, got {level}"
            )));
        }

        Ok(Self {
            direction,
            max_level: (level > 0).then_some(level),
        })
    }

    /// Returns the traversal direction.
    #[must_use]
    pub fn direction(&self) -> HierarchyDirection {
        self.direction
    }

    /// Returns the depth bound, `None` when unbounded.
    #[must_use]
    pub fn max_level(&self) -> Option<u32> {
        self.max_level
    }

    /// Returns whether entries at `level` are still inside the bound.
    #[must_use]
    pub fn includes_level(&self, level: u32) -> bool {
        self.max_level.is_none_or(|max_level| level <= max_level)
    }
}

/// Group found by a hierarchy query with its distance from the query root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyEntry {
    /// Group at this position.
    pub group: Group,
    /// Distance from the query root, starting at 1.
    pub level: u32,
}

/// Walks parent links from `start`, nearest ancestor first.
///
/// `lookup` resolves a group id to the stored group. A repeated id means the
/// stored tree is corrupt and is reported as an internal error.
pub fn collect_ancestors<F>(
    start: &Group,
    query: &HierarchyQuery,
    mut lookup: F,
) -> AppResult<Vec<HierarchyEntry>>
where
    F: FnMut(&str) -> AppResult<Option<Group>>,
{
    let mut visited = HashSet::from([start.id().to_owned()]);
    let mut entries = Vec::new();
    let mut next_parent = start.parent_id().map(str::to_owned);
    let mut level = 1;

    while let Some(parent_id) = next_parent {
        if !query.includes_level(level) {
            break;
        }
        if !visited.insert(parent_id.clone()) {
            return Err(AppError::Internal(format!(
                "group hierarchy above '{}' contains a cycle at '{parent_id}'",
                start.id()
            )));
        }

        let Some(parent) = lookup(parent_id.as_str())? else {
            break;
        };
        next_parent = parent.parent_id().map(str::to_owned);
        entries.push(HierarchyEntry {
            group: parent,
            level,
        });
        level += 1;
    }

    Ok(entries)
}

/// Walks child links breadth-first from `start`, direct children first.
pub fn collect_descendants<F>(
    start: &Group,
    query: &HierarchyQuery,
    mut children_of: F,
) -> AppResult<Vec<HierarchyEntry>>
where
    F: FnMut(&str) -> AppResult<Vec<Group>>,
{
    let mut visited = HashSet::from([start.id().to_owned()]);
    let mut entries = Vec::new();
    let mut frontier = VecDeque::from([(start.id().to_owned(), 0_u32)]);

    while let Some((group_id, depth)) = frontier.pop_front() {
        let level = depth + 1;
        if !query.includes_level(level) {
            continue;
        }

        let mut children = children_of(group_id.as_str())?;
        children.sort_by(|left, right| {
            left.name()
                .cmp(right.name())
                .then_with(|| left.id().cmp(right.id()))
        });

        for child in children {
            if !visited.insert(child.id().to_owned()) {
                return Err(AppError::Internal(format!(
                    "group hierarchy below '{}' contains a cycle at '{}'",
                    start.id(),
                    child.id()
                )));
            }
            frontier.push_back((child.id().to_owned(), level));
            entries.push(HierarchyEntry {
                group: child,
                level,
            });
        }
    }

    Ok(entries)
}

/// Checks that `children` may be attached under `parent`.
///
/// `parent_ancestor_ids` is the full ancestor chain of `parent`. Returns the ids
/// of children that still need a parent link; children already under `parent`
/// are skipped. Any violation rejects the whole batch.
pub fn plan_parent_assignment(
    parent: &Group,
    parent_ancestor_ids: &[String],
    children: &[Group],
) -> AppResult<Vec<String>> {
    if parent.is_deleted() {
        return Err(AppError::NotFound(format!(
            "parent group '{}' was not found",
            parent.id()
        )));
    }

    let mut seen = BTreeSet::new();
    let mut pending = Vec::new();

    for child in children {
        if !seen.insert(child.id()) {
            continue;
        }
        if child.is_deleted() {
            return Err(AppError::NotFound(format!(
                "group '{}' was not found",
                child.id()
            )));
        }
        if child.id() == parent.id() {
            return Err(AppError::Conflict(format!(
                "group '{}' cannot be its own parent",
                child.id()
            )));
        }
        if child.domain_id() != parent.domain_id() {
            return Err(AppError::Validation(format!(
                "group '{}' belongs to domain '{}' but parent '{}' belongs to domain '{}'",
                child.id(),
                child.domain_id(),
                parent.id(),
                parent.domain_id()
            )));
        }
        if parent_ancestor_ids.iter().any(|ancestor| ancestor == child.id()) {
            return Err(AppError::Conflict(format!(
                "attaching group '{}' under '{}' would create a cycle",
                child.id(),
                parent.id()
            )));
        }

        match child.parent_id() {
            Some(current) if current == parent.id() => {}
            Some(current) => {
                return Err(AppError::Conflict(format!(
                    "group '{}' already has parent '{current}'",
                    child.id()
                )));
            }
            None => pending.push(child.id().to_owned()),
        }
    }

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use proptest::prelude::*;
    use strata_core::{AppError, DomainId};

    use crate::Group;

    use super::{
        HierarchyDirection, HierarchyQuery, MAX_HIERARCHY_LEVEL, collect_ancestors,
        collect_descendants, plan_parent_assignment,
    };

    fn group(id: &str, domain: &str, parent: Option<&str>) -> Group {
        let mut group = Group::new(
            id,
            DomainId::new(domain).unwrap_or_else(|_| unreachable!()),
            id,
            "",
            "user-1",
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());
        group.set_parent(parent.map(str::to_owned));
        group
    }

    fn chain(length: usize) -> HashMap<String, Group> {
        (0..length)
            .map(|index| {
                let id = format!("g{index}");
                let parent = (index > 0).then(|| format!("g{}", index - 1));
                (id.clone(), group(id.as_str(), "d1", parent.as_deref()))
            })
            .collect()
    }

    #[test]
    fn level_zero_is_unbounded() {
        let query = HierarchyQuery::new(HierarchyDirection::Up, 0);
        assert!(query.is_ok());
        let query = query.unwrap_or_else(|_| unreachable!());
        assert_eq!(query.max_level(), None);
        assert!(query.includes_level(MAX_HIERARCHY_LEVEL + 100));
    }

    #[test]
    fn level_above_maximum_is_rejected() {
        let query = HierarchyQuery::new(HierarchyDirection::Down, MAX_HIERARCHY_LEVEL + 1);
        assert!(matches!(query, Err(AppError::Validation(_))));
    }

    #[test]
    fn ancestors_are_nearest_first_and_bounded() {
        let groups = chain(5);
        let query =
            HierarchyQuery::new(HierarchyDirection::Up, 2).unwrap_or_else(|_| unreachable!());
        let start = groups.get("g4").cloned().unwrap_or_else(|| unreachable!());

        let entries = collect_ancestors(&start, &query, |id| Ok(groups.get(id).cloned()));
        let entries = entries.unwrap_or_default();

        let ids: Vec<(&str, u32)> = entries
            .iter()
            .map(|entry| (entry.group.id(), entry.level))
            .collect();
        assert_eq!(ids, vec![("g3", 1), ("g2", 2)]);
    }

    #[test]
    fn descendants_are_breadth_first() {
        let groups = chain(4);
        let query =
            HierarchyQuery::new(HierarchyDirection::Down, 0).unwrap_or_else(|_| unreachable!());
        let start = groups.get("g0").cloned().unwrap_or_else(|| unreachable!());

        let entries = collect_descendants(&start, &query, |id| {
            Ok(groups
                .values()
                .filter(|candidate| candidate.parent_id() == Some(id))
                .cloned()
                .collect())
        })
        .unwrap_or_default();

        let levels: Vec<u32> = entries.iter().map(|entry| entry.level).collect();
        assert_eq!(levels, vec![1, 2, 3]);
    }

    #[test]
    fn corrupt_parent_loop_is_reported() {
        let mut groups = HashMap::new();
        groups.insert("a".to_owned(), group("a", "d1", Some("b")));
        groups.insert("b".to_owned(), group("b", "d1", Some("a")));
        let query =
            HierarchyQuery::new(HierarchyDirection::Up, 0).unwrap_or_else(|_| unreachable!());
        let start = groups.get("a").cloned().unwrap_or_else(|| unreachable!());

        let result = collect_ancestors(&start, &query, |id| Ok(groups.get(id).cloned()));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn attaching_an_ancestor_is_a_cycle() {
        let parent = group("b", "d1", Some("a"));
        let child = group("a", "d1", None);

        let result = plan_parent_assignment(&parent, &["a".to_owned()], &[child]);
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn cross_domain_attach_is_rejected() {
        let parent = group("p", "d1", None);
        let child = group("c", "d2", None);

        let result = plan_parent_assignment(&parent, &[], &[child]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn child_under_same_parent_is_skipped() {
        let parent = group("p", "d1", None);
        let attached = group("c1", "d1", Some("p"));
        let fresh = group("c2", "d1", None);

        let pending = plan_parent_assignment(&parent, &[], &[attached, fresh]);
        assert_eq!(pending.unwrap_or_default(), vec!["c2".to_owned()]);
    }

    #[test]
    fn one_bad_child_rejects_the_batch() {
        let parent = group("p", "d1", None);
        let fresh = group("c1", "d1", None);
        let adopted = group("c2", "d1", Some("other"));

        let result = plan_parent_assignment(&parent, &[], &[fresh, adopted]);
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    proptest! {
        #[test]
        fn ancestor_count_respects_level(length in 2usize..12, level in 1u32..12) {
            let groups = chain(length);
            let query = HierarchyQuery::new(HierarchyDirection::Up, level)
                .unwrap_or_else(|_| unreachable!());
            let start = groups
                .get(&format!("g{}", length - 1))
                .cloned()
                .unwrap_or_else(|| unreachable!());

            let entries = collect_ancestors(&start, &query, |id| Ok(groups.get(id).cloned()))
                .unwrap_or_default();
            prop_assert_eq!(entries.len(), (length - 1).min(level as usize));
        }
    }
}
