mod ab_testing;
mod admins;
mod auth;
mod calculator;
mod dashboard;
mod gtm;
mod leads;
mod pages;
mod submissions;
mod tracking;
mod webhooks;

use axum::{middleware, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::middleware::{require_auth, require_super_admin, require_writer};
use crate::AppState;

/// Success envelope: `{"success": true, "data": ...}`.
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Soft failure: HTTP 200 with `success:false` and an explanation, for
/// conditions that are expected operational states rather than errors.
pub fn soft_fail(code: &str, message: &str) -> Json<serde_json::Value> {
    Json(json!({
        "success": false,
        "error": { "code": code, "message": message }
    }))
}

/// Unauthenticated routes serving the public site.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .nest("/submissions", submissions::routes())
        .nest("/ab", ab_testing::public_routes())
        .nest("/track", tracking::routes())
        .nest("/calculator", calculator::routes())
        .nest("/public/pages", pages::public_routes())
        .nest("/public/gtm", gtm::public_routes())
        .nest("/auth", auth::public_routes())
}

/// Authenticated back-office routes. Reads require a valid token; writes
/// additionally require an admin role, and admin-user management requires
/// super_admin.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let reads = Router::new()
        .nest("/auth", auth::session_routes())
        .nest("/dashboard", dashboard::routes())
        .nest("/leads", leads::read_routes())
        .nest("/pages", pages::read_routes())
        .nest("/ab", ab_testing::read_routes())
        .nest("/webhooks", webhooks::read_routes())
        .nest("/gtm", gtm::read_routes())
        .nest("/visitors", tracking::admin_routes());

    let writes = Router::new()
        .nest("/leads", leads::write_routes())
        .nest("/pages", pages::write_routes())
        .nest("/ab", ab_testing::write_routes())
        .nest("/webhooks", webhooks::write_routes())
        .nest("/gtm", gtm::write_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_writer,
        ));

    let admin_management = Router::new()
        .nest("/admins", admins::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_super_admin,
        ));

    reads
        .merge(writes)
        .merge(admin_management)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
