use thiserror::Error;

/// Errors surfaced by a call attempt.
///
/// Every variant puts the session into the visible error state, except [`CallError::CallActive`]
/// (the active session is left untouched) and [`CallError::Cancelled`] (the attempt was
/// superseded by a disconnect).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("{0}")]
    Validation(String),
    #[error("Failed to get token: {0}")]
    TokenAcquisition(String),
    #[error("Media access denied: {0}")]
    MediaAccess(String),
    #[error("Failed to connect to room: {0}")]
    RoomConnection(String),
    #[error("Call active")]
    CallActive,
    #[error("Connect attempt cancelled")]
    Cancelled,
}

impl CallError {
    /// Message rendered in the error panel of the call view.
    pub fn user_message(&self) -> String {
        match self {
            CallError::MediaAccess(_) => format!(
                "{self}. Please allow access to your camera and microphone in your browser settings and try again."
            ),
            CallError::Validation(_) | CallError::TokenAcquisition(_) | CallError::RoomConnection(_) => {
                format!("{self}. Go back and try again.")
            }
            CallError::CallActive => "Another call is already active.".to_string(),
            CallError::Cancelled => "The call was cancelled.".to_string(),
        }
    }
}

/// Failure to bind a single track to a render slot. Isolated to that track, never tears down the
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to attach track {track_sid}: {reason}")]
pub struct TrackAttachmentError {
    pub track_sid: String,
    pub reason: String,
}

impl TrackAttachmentError {
    pub fn new(track_sid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            track_sid: track_sid.into(),
            reason: reason.into(),
        }
    }
}
