use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod internal;

use internal::build_internal_routes;

pub fn build_router(app_state: AppState, request_timeout: Duration) -> Router {
    let group_routes = Router::new()
        .route(
            "/api/groups",
            get(handlers::groups::list_groups_handler).post(handlers::groups::create_group_handler),
        )
        .route(
            "/api/groups/{group_id}",
            get(handlers::groups::view_group_handler)
                .patch(handlers::groups::update_group_handler)
                .delete(handlers::groups::delete_group_handler),
        )
        .route(
            "/api/groups/{group_id}/enable",
            post(handlers::groups::enable_group_handler),
        )
        .route(
            "/api/groups/{group_id}/disable",
            post(handlers::groups::disable_group_handler),
        )
        .route(
            "/api/groups/{group_id}/hierarchy",
            get(handlers::groups::retrieve_group_hierarchy_handler),
        )
        .route(
            "/api/groups/{group_id}/parent",
            post(handlers::groups::add_parent_group_handler)
                .delete(handlers::groups::remove_parent_group_handler),
        )
        .route(
            "/api/groups/{group_id}/children",
            get(handlers::groups::list_children_groups_handler)
                .post(handlers::groups::add_children_groups_handler)
                .delete(handlers::groups::remove_all_children_groups_handler),
        )
        .route(
            "/api/groups/{group_id}/children/remove",
            post(handlers::groups::remove_children_groups_handler),
        );

    let group_role_routes = Router::new()
        .route(
            "/api/groups/{group_id}/roles",
            get(handlers::group_roles::retrieve_all_roles_handler)
                .post(handlers::group_roles::add_role_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/available-actions",
            get(handlers::group_roles::list_available_actions_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/members",
            get(handlers::group_roles::list_entity_members_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/members/remove",
            post(handlers::group_roles::remove_entity_members_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}",
            get(handlers::group_roles::retrieve_role_handler)
                .put(handlers::group_roles::rename_role_handler)
                .delete(handlers::group_roles::remove_role_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}/actions",
            get(handlers::group_roles::role_list_actions_handler)
                .post(handlers::group_roles::role_add_actions_handler)
                .delete(handlers::group_roles::role_remove_all_actions_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}/actions/check",
            post(handlers::group_roles::role_check_actions_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}/actions/remove",
            post(handlers::group_roles::role_remove_actions_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}/members",
            get(handlers::group_roles::role_list_members_handler)
                .post(handlers::group_roles::role_add_members_handler)
                .delete(handlers::group_roles::role_remove_all_members_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}/members/check",
            post(handlers::group_roles::role_check_members_handler),
        )
        .route(
            "/api/groups/{group_id}/roles/{role_id}/members/remove",
            post(handlers::group_roles::role_remove_members_handler),
        );

    let channel_routes = Router::new()
        .route(
            "/api/channels",
            post(handlers::channels::create_channel_handler),
        )
        .route(
            "/api/channels/{channel_id}",
            get(handlers::channels::view_channel_handler)
                .delete(handlers::channels::delete_channel_handler),
        )
        .route(
            "/api/channels/{channel_id}/connect",
            post(handlers::channels::connect_handler),
        )
        .route(
            "/api/channels/{channel_id}/disconnect",
            post(handlers::channels::disconnect_handler),
        )
        .route(
            "/api/channels/{channel_id}/parent",
            post(handlers::channels::set_parent_group_handler)
                .delete(handlers::channels::remove_parent_group_handler),
        );

    let caller_routes = Router::new()
        .merge(group_routes)
        .merge(group_role_routes)
        .merge(channel_routes)
        .route_layer(from_fn(middleware::require_caller));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(caller_routes)
        .merge(build_internal_routes(app_state.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests;
