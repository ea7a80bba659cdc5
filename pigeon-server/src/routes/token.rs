use crate::state::AppState;
use axum::Router;
use axum::routing::post;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/token", post(post::token).fallback(method_not_allowed))
}

async fn method_not_allowed() -> crate::http::AppError {
    crate::http::AppError::MethodNotAllowed
}

mod post {
    use crate::http::{ApiResult, AppError};
    use crate::state::AppState;
    use axum::Json;
    use axum::extract::State;
    use axum::extract::rejection::JsonRejection;
    use pigeon_protocol::CallKind;
    use pigeon_protocol::http::token::TokenResponse;
    use serde::Deserialize;
    use std::sync::Arc;

    /// Raw request body. Fields are optional so that missing ones are reported as a 400 with a
    /// JSON error body instead of an extractor rejection.
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawTokenRequest {
        identity: Option<String>,
        room_name: Option<String>,
        call_type: Option<String>,
    }

    pub async fn token(
        State(state): State<Arc<AppState>>,
        payload: Result<Json<RawTokenRequest>, JsonRejection>,
    ) -> ApiResult<TokenResponse> {
        if !state.issuer.has_credentials() {
            tracing::warn!("Token requested, but room service credentials are not configured");
            return Err(AppError::MissingCredentials);
        }

        let Json(request) = payload.map_err(|err| {
            tracing::debug!(?err, "Failed to parse token request body");
            AppError::BadRequest("identity and callType are required".to_string())
        })?;

        let identity = request.identity.filter(|s| !s.is_empty());
        let call_type = request.call_type.filter(|s| !s.is_empty());
        let (Some(identity), Some(call_type)) = (identity, call_type) else {
            return Err(AppError::BadRequest(
                "identity and callType are required".to_string(),
            ));
        };

        let call_kind: CallKind = call_type.parse().map_err(|_| {
            AppError::BadRequest(r#"Invalid callType. Must be "video" or "voice""#.to_string())
        })?;

        let Some(room_name) = request.room_name.filter(|s| !s.is_empty()) else {
            return Err(AppError::BadRequest(format!(
                "roomName required for {call_kind} call"
            )));
        };

        tracing::debug!(?identity, ?room_name, %call_kind, "Issuing room token");
        let token = state.issuer.issue(&identity, &room_name, call_kind)?;

        Ok(Json(TokenResponse {
            token,
            identity,
            room_name: Some(room_name),
        }))
    }
}
