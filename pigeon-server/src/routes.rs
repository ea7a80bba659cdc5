mod root;
mod token;

use crate::state::AppState;
use axum::Router;
use axum::http::Request;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{Span, debug_span};

pub fn create_app() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", token::routes())
        .merge(root::routes())
        .layer(
            TraceLayer::new_for_http().make_span_with(move |req: &Request<_>| {
                let path = req.uri().path();
                match path {
                    "/health" | "/favicon.ico" => Span::none(),
                    _ => debug_span!(
                        "request",
                        method = %req.method(),
                        uri = %req.uri(),
                        version = ?req.version()),
                }
            }),
        )
        .layer(TimeoutLayer::new(crate::config::SERVER_SHUTDOWN_TIMEOUT))
}
