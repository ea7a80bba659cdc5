#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use crate::error::CallError;
use crate::media::{TrackKind, VideoConstraints};
use async_trait::async_trait;
use pigeon_protocol::CallKind;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

pub const ROOM_EVENTS_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrackInfo {
    pub sid: String,
    pub kind: TrackKind,
    /// Whether the media of this track is already flowing to the local client.
    pub subscribed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub sid: String,
    pub identity: String,
    pub tracks: Vec<RemoteTrackInfo>,
}

impl ParticipantInfo {
    pub fn subscribed_tracks(&self) -> impl Iterator<Item = &RemoteTrackInfo> {
        self.tracks.iter().filter(|track| track.subscribed)
    }
}

/// Events delivered by a connected room, in the order the room observed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    ParticipantConnected(ParticipantInfo),
    ParticipantDisconnected(ParticipantInfo),
    TrackSubscribed {
        participant_sid: String,
        track: RemoteTrackInfo,
    },
    TrackUnsubscribed {
        participant_sid: String,
        track: RemoteTrackInfo,
    },
    /// The room connection ended, either remotely or because of a transport error.
    Disconnected { error: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkQuality {
    pub local: u8,
    pub remote: u8,
}

/// Options passed to the room provider when joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub room_name: String,
    pub audio: bool,
    /// `None` disables the camera entirely.
    pub video: Option<VideoConstraints>,
    pub dominant_speaker: bool,
    pub network_quality: Option<NetworkQuality>,
}

impl ConnectOptions {
    pub fn for_call(room_name: impl Into<String>, kind: CallKind) -> Self {
        match kind {
            CallKind::Video => Self {
                room_name: room_name.into(),
                audio: true,
                video: Some(VideoConstraints::default()),
                dominant_speaker: true,
                network_quality: None,
            },
            CallKind::Voice => Self {
                room_name: room_name.into(),
                audio: true,
                video: None,
                dominant_speaker: true,
                network_quality: Some(NetworkQuality {
                    local: 1,
                    remote: 1,
                }),
            },
        }
    }
}

/// Locally captured track published into the room.
pub trait LocalTrack: Send + Sync {
    fn sid(&self) -> &str;
    fn kind(&self) -> TrackKind;
    fn is_enabled(&self) -> bool;
    /// Mutes or unmutes the track without unpublishing it.
    fn set_enabled(&self, enabled: bool);
    /// Releases the underlying capture device. Idempotent.
    fn stop(&self);
}

/// Handle of a joined room.
pub trait RoomConnection: Send + Sync {
    fn name(&self) -> &str;
    fn local_identity(&self) -> &str;
    fn local_tracks(&self) -> Vec<Arc<dyn LocalTrack>>;
    /// Remote participants present at the time of the call.
    fn participants(&self) -> Vec<ParticipantInfo>;
    /// Leaves the room. Idempotent, never fails.
    fn disconnect(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("{0}")]
    MediaAccess(String),
    #[error("{0}")]
    Connection(String),
}

impl From<RoomError> for CallError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::MediaAccess(msg) => CallError::MediaAccess(msg),
            RoomError::Connection(msg) => CallError::RoomConnection(msg),
        }
    }
}

/// Real-time room service: acquires local media and joins a named room using an access token.
#[async_trait]
pub trait RoomProvider: Send + Sync + 'static {
    async fn connect(
        &self,
        token: &str,
        options: ConnectOptions,
    ) -> Result<(Arc<dyn RoomConnection>, mpsc::Receiver<RoomEvent>), RoomError>;
}
