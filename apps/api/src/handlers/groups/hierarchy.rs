use super::*;

pub async fn retrieve_group_hierarchy_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Query(params): Query<HierarchyParams>,
) -> ApiResult<Json<Vec<HierarchyEntryResponse>>> {
    let entries = state
        .group_operations
        .retrieve_group_hierarchy(&caller, &group_id, params.into_query()?)
        .await?;

    Ok(Json(
        entries
            .into_iter()
            .map(HierarchyEntryResponse::from)
            .collect(),
    ))
}

pub async fn add_parent_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Json(payload): Json<AddParentRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_operations
        .add_parent_group(&caller, &group_id, &payload.parent_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_parent_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .group_operations
        .remove_parent_group(&caller, &group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_children_groups_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Json(payload): Json<ChildrenRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_operations
        .add_children_groups(&caller, &group_id, &payload.children)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_children_groups_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Json(payload): Json<ChildrenRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_operations
        .remove_children_groups(&caller, &group_id, &payload.children)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_all_children_groups_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .group_operations
        .remove_all_children_groups(&caller, &group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_children_groups_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<GroupResponse>>> {
    let page = state
        .group_operations
        .list_children_groups(&caller, &group_id, params.into_page_query()?)
        .await?;
    Ok(Json(page.map(GroupResponse::from)))
}
