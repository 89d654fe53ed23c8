mod base;
pub mod paths;
pub mod store;
pub mod version;

use std::borrow::Cow;

use axum::{
    error_handling::HandleErrorLayer, extract::FromRef, http::StatusCode, response::IntoResponse,
    routing, Router,
};
use tokio::time::Duration;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

pub use base::AboutResponse;

use crate::version::VersionService;

/// Shared handler state; each handler extracts only the part it needs.
#[derive(Clone, Debug, FromRef)]
pub struct AppState {
    pub store: store::Store,
    pub versions: VersionService,
}

/// Build the public API: store operations plus the version-check surface.
pub fn api(state: AppState) -> Router {
    Router::new()
        .route(paths::base::ROOT, routing::get(base::root))
        .route(paths::base::HEALTH, routing::get(base::health))
        .route(paths::base::ABOUT, routing::get(base::about))
        // Store
        .route(
            paths::store::KEY,
            routing::put(store::put_key)
                .get(store::get_key)
                .delete(store::delete_key),
        )
        .route(paths::store::RANGE, routing::get(store::range))
        .route(paths::store::INDEX, routing::get(store::index_dump))
        .route(paths::store::MAINTENANCE, routing::post(store::run_maintenance))
        // Version check
        .route(paths::version::CHECK_UPDATE, routing::get(version::check_update))
        .route(paths::version::UPDATE_VERSION, routing::post(version::update_version))
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .timeout(Duration::from_secs(10)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Cow::from("service is overloaded, try again later"),
        );
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Cow::from(format!("Unhandled internal error: {}", error)),
    )
}
