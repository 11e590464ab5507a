use std::str::FromStr;

use strata_application::{CreateGroupInput, GroupListQuery, UpdateGroupInput};
use strata_core::{AppResult, PageQuery};
use strata_domain::{EntityStatus, Group, HierarchyDirection, HierarchyEntry, HierarchyQuery};

use super::types::{
    CreateGroupRequest, GroupListParams, GroupResponse, HierarchyEntryResponse, HierarchyParams,
    UpdateGroupRequest,
};

impl From<Group> for GroupResponse {
    fn from(value: Group) -> Self {
        Self {
            id: value.id().to_owned(),
            domain_id: value.domain_id().to_string(),
            parent_id: value.parent_id().map(str::to_owned),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            status: value.status().as_str(),
            created_by: value.created_by().to_owned(),
            created_at: value.created_at(),
            updated_by: value.updated_by().to_owned(),
            updated_at: value.updated_at(),
        }
    }
}

impl From<HierarchyEntry> for HierarchyEntryResponse {
    fn from(value: HierarchyEntry) -> Self {
        Self {
            group: GroupResponse::from(value.group),
            level: value.level,
        }
    }
}

impl From<CreateGroupRequest> for CreateGroupInput {
    fn from(value: CreateGroupRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            parent_id: value.parent_id.filter(|parent_id| !parent_id.trim().is_empty()),
        }
    }
}

impl From<UpdateGroupRequest> for UpdateGroupInput {
    fn from(value: UpdateGroupRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
        }
    }
}

impl GroupListParams {
    pub fn into_query(self) -> AppResult<GroupListQuery> {
        Ok(GroupListQuery {
            page: PageQuery::from_optional(self.limit, self.offset)?,
            name: self.name.filter(|name| !name.trim().is_empty()),
            status: self
                .status
                .as_deref()
                .map(EntityStatus::from_str)
                .transpose()?,
        })
    }
}

impl HierarchyParams {
    pub fn into_query(self) -> AppResult<HierarchyQuery> {
        let direction = self
            .direction
            .as_deref()
            .map(HierarchyDirection::from_str)
            .transpose()?
            .unwrap_or(HierarchyDirection::Up);

        HierarchyQuery::new(direction, self.level.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use strata_core::ErrorKind;
    use strata_domain::{EntityStatus, HierarchyDirection};

    use crate::dto::{GroupListParams, HierarchyParams};

    #[test]
    fn hierarchy_params_default_to_full_ancestor_chain() {
        let query = HierarchyParams::default()
            .into_query()
            .unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(query.direction(), HierarchyDirection::Up);
        assert_eq!(query.max_level(), None);

        let error = HierarchyParams {
            level: Some(21),
            direction: Some("down".to_owned()),
        }
        .into_query()
        .err()
        .map(|error| error.kind());
        assert_eq!(error, Some(ErrorKind::Malformed));
    }

    #[test]
    fn list_params_parse_status_filter() {
        let query = GroupListParams {
            status: Some("disabled".to_owned()),
            name: Some("  ".to_owned()),
            ..GroupListParams::default()
        }
        .into_query()
        .unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(query.status, Some(EntityStatus::Disabled));
        assert_eq!(query.name, None);

        assert!(
            GroupListParams {
                status: Some("archived".to_owned()),
                ..GroupListParams::default()
            }
            .into_query()
            .is_err()
        );
    }
}
