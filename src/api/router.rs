//! HTTP API router.
//!
//! Returns a composable `Router` with every endpoint nested under `/api/`.
//!
//! Layer stack (outermost → innermost):
//! 1. CORS → 2. Cache-Control → 3. Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router around shared core state.
pub fn api_router(core: Arc<CoreState>, cors_origins: &[String]) -> Router {
    build_router(ApiContext::new(core), cors_origins)
}

/// Browser origins allowed to call the API. Unparseable entries are
/// skipped; an empty list emits no CORS headers at all.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

/// Build the router from a pre-constructed `ApiContext`.
///
/// Split out so tests can inject a fixed clock.
pub(crate) fn build_router(ctx: ApiContext, cors_origins: &[String]) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/users",
            get(endpoints::users::list).post(endpoints::users::create),
        )
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::remove),
        )
        .route(
            "/patients/by-user/:user_id",
            get(endpoints::patients::by_user),
        )
        .route(
            "/patients/:id/assign-doctor",
            patch(endpoints::patients::assign_doctor),
        )
        .route("/patients/:id/risk", post(endpoints::patients::save_risk))
        .route(
            "/patients/:id/apply-prediction-hba1c3",
            post(endpoints::patients::apply_prediction_hba1c3),
        )
        .route(
            "/patients/:id/therapy-pathline",
            post(endpoints::prediction::therapy_pathline),
        )
        .route(
            "/patients/:id/treatment-recommendation",
            post(endpoints::prediction::treatment_recommendation),
        )
        .route(
            "/patients/:id/treatment-chat",
            post(endpoints::prediction::treatment_chat),
        )
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail)
                .put(endpoints::appointments::update)
                .delete(endpoints::appointments::remove),
        )
        .route(
            "/appointments/:id/status",
            patch(endpoints::appointments::update_status),
        )
        .route(
            "/dashboard/appointments",
            get(endpoints::dashboard::appointments),
        )
        .route("/dashboard/therapy", get(endpoints::dashboard::therapy))
        .with_state(ctx)
        // Innermost first, outermost last
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors_layer(cors_origins));

    Router::new().nest("/api", routes)
}
