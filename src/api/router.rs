//! API route table.
//!
//! Registration and login are public; everything else sits behind the
//! bearer-token middleware. Routes are nested under `/api/`.

use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::{middleware as axum_middleware, Json, Router};

use crate::api::handlers;
use crate::api::middleware::require_auth;
use crate::api::types::ApiContext;
use crate::config;
use crate::core_state::CoreState;

/// Build the full application router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": config::APP_VERSION,
    }))
}

fn build_router(ctx: ApiContext) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/register/patient", post(handlers::auth::register_patient))
        .route("/register/doctor", post(handlers::auth::register_doctor))
        .route(
            "/register/laboratory",
            post(handlers::auth::register_laboratory),
        )
        .route("/auth/login", post(handlers::auth::login));

    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route("/dep", get(handlers::dep::consult))
        .route("/dep/prescriptions", get(handlers::dep::prescriptions))
        .route("/dep/lab-tests", get(handlers::dep::lab_tests))
        .route("/access/grants", get(handlers::access::list_grants))
        .route("/access/grant", post(handlers::access::grant))
        .route("/access/:id/revoke", post(handlers::access::revoke))
        .route("/access/check", get(handlers::access::check_and_consult))
        .route("/doctor/notes", post(handlers::doctor::add_note))
        .route(
            "/doctor/prescriptions",
            post(handlers::doctor::create_prescription),
        )
        .route("/doctor/lab-tests", post(handlers::doctor::order_lab_test))
        .route(
            "/doctor/lab-tests/:id/interpret",
            patch(handlers::doctor::interpret_lab_result),
        )
        .route("/labo/tests", get(handlers::labo::worklist))
        .route("/labo/tests/:id/status", patch(handlers::labo::set_status))
        .route("/labo/tests/:id/result", post(handlers::labo::upload_result))
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/users/:id", delete(handlers::admin::delete_user))
        .route(
            "/admin/pending-professionals",
            get(handlers::admin::pending_professionals),
        )
        .route(
            "/admin/professionals/:id/activate",
            patch(handlers::admin::activate_professional),
        )
        .route("/admin/audit-logs", get(handlers::admin::audit_logs))
        .layer(axum_middleware::from_fn_with_state(
            ctx.clone(),
            require_auth,
        ));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(ctx)
}

// ═══════════════════════════════════════════════════════════
// End-to-end tests over the router
// ═══════════════════════════════════════════════════════════
