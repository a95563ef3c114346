//! Route assembly. Grounded on the teacher's `create_router`
//! (`crates/server/src/http.rs`): one `Router::new()` with every route
//! registered, auth enforced per-handler via extractors rather than a
//! blanket middleware (this service has public routes — `/user/init`,
//! `/user/login`, and the proxy passthrough itself, which does its own
//! header-based lookup), then `TraceLayer`/`CompressionLayer`/CORS
//! layered on top.

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::forwarder::forward;
use crate::metrics::metrics_handler;
use crate::routes::{ai_model, api_key, endpoint, plan, setting, user};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.app.cors_origins);

    let api_v2 = Router::new()
        .route("/user/init", post(user::init))
        .route("/user/login", post(user::login))
        .route("/user/me", get(user::me))
        .route("/user/me/change-password", patch(user::change_password))
        .route("/user/", post(user::create).get(user::list))
        .route("/user/:id", get(user::get).patch(user::update))
        .route(
            "/endpoint/",
            post(endpoint::create).get(endpoint::list),
        )
        .route("/endpoint/batch", post(endpoint::batch_create))
        .route("/endpoint/batch-test", post(endpoint::batch_test))
        .route("/endpoint/batch-delete", post(endpoint::batch_delete))
        .route("/endpoint/tasks/:task_id", get(endpoint::get_task))
        .route(
            "/endpoint/:id",
            patch(endpoint::rename).delete(endpoint::delete).get(endpoint::get),
        )
        .route("/endpoint/:id/test", post(endpoint::test))
        .route("/endpoint/:id/task", get(endpoint::current_task))
        .route("/ai_model/", get(ai_model::list))
        .route("/ai_model/:id", get(ai_model::get))
        .route("/apikey", post(api_key::create).get(api_key::list))
        .route("/apikey/:id", delete(api_key::revoke))
        .route("/apikey/:id/usage", get(api_key::usage))
        .route("/plan/", post(plan::create).get(plan::list))
        .route("/plan/me", get(plan::me))
        .route("/plan/:id", get(plan::get).patch(plan::update))
        .route("/setting/", get(setting::list))
        .route("/setting/:key", get(setting::get).put(setting::put))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v2", api_v2)
        .route("/metrics", get(metrics_handler))
        .fallback(forward)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    if parsed.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
