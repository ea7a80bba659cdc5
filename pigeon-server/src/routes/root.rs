use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(get::health))
        .route("/version", get(get::version))
}

mod get {
    use crate::config::HEALTH_CHECK_TIMEOUT;
    use crate::http::ApiResult;
    use crate::state::AppState;
    use axum::Json;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde::Serialize;
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize)]
    pub struct VersionInfo {
        pub name: &'static str,
        pub version: &'static str,
    }

    pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, state.health_check()).await {
            Ok(Ok(_)) => (StatusCode::OK, "OK"),
            _ => (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"),
        }
    }

    pub async fn version() -> ApiResult<VersionInfo> {
        Ok(Json(VersionInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }))
    }
}
