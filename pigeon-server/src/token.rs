use crate::config::{CredentialsConfig, TokenConfig};
use crate::http::AppError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pigeon_protocol::CallKind;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Content type marking the token as a room service access token.
pub const ACCESS_TOKEN_CONTENT_TYPE: &str = "twilio-fpa;v=1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub jti: String,
    /// API key the token was signed with.
    pub iss: String,
    /// Account the API key belongs to.
    pub sub: String,
    pub iat: u64,
    pub nbf: u64,
    pub exp: u64,
    pub grants: Grants,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grants {
    pub identity: String,
    pub video: RoomGrant,
}

/// Grant to join a single room. Voice calls join audio-only rooms with the same grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomGrant {
    pub room: String,
}

pub struct TokenIssuer {
    credentials: CredentialsConfig,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(credentials: CredentialsConfig, token_config: &TokenConfig) -> Self {
        Self {
            credentials,
            ttl_secs: token_config.ttl_secs,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_complete()
    }

    /// Issues a signed grant for `identity` to join `room_name`.
    #[instrument(level = "debug", skip(self), err)]
    pub fn issue(
        &self,
        identity: &str,
        room_name: &str,
        call_kind: CallKind,
    ) -> Result<String, AppError> {
        if !self.has_credentials() {
            return Err(AppError::MissingCredentials);
        }

        let claims = self.claims(identity, room_name, jsonwebtoken::get_current_timestamp());

        let mut header = Header::new(Algorithm::HS256);
        header.cty = Some(ACCESS_TOKEN_CONTENT_TYPE.to_string());

        let token = jsonwebtoken::encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.credentials.api_secret.as_bytes()),
        )?;

        match call_kind {
            CallKind::Video => tracing::info!("Video token generated"),
            CallKind::Voice => tracing::info!("Voice token generated (audio-only room)"),
        }
        Ok(token)
    }

    fn claims(&self, identity: &str, room_name: &str, now: u64) -> AccessTokenClaims {
        AccessTokenClaims {
            jti: format!("{}-{}", self.credentials.api_key, now),
            iss: self.credentials.api_key.clone(),
            sub: self.credentials.account_sid.clone(),
            iat: now,
            nbf: now,
            exp: now + self.ttl_secs,
            grants: Grants {
                identity: identity.to_string(),
                video: RoomGrant {
                    room: room_name.to_string(),
                },
            },
        }
    }
}
