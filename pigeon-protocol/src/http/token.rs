use crate::CallKind;
use serde::{Deserialize, Serialize};

/// Path of the token endpoint, relative to the issuer's base URL.
pub const TOKEN_ENDPOINT_PATH: &str = "/api/token";

/// Request for a room grant, sent by a client before joining a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    /// Identity the grant is issued for.
    pub identity: String,
    /// Name of the room the grant is scoped to.
    pub room_name: String,
    /// Kind of call the room is joined for.
    pub call_type: CallKind,
}

/// Successful response of the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Signed, time-limited access token.
    pub token: String,
    pub identity: String,
    pub room_name: Option<String>,
}
