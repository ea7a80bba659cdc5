use crate::media::TrackKind;
use crate::room::{
    ConnectOptions, LocalTrack, ParticipantInfo, ROOM_EVENTS_CAPACITY, RoomConnection, RoomError,
    RoomEvent, RoomProvider,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};

#[derive(Debug)]
pub struct MockLocalTrack {
    sid: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl MockLocalTrack {
    pub fn new(sid: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            sid: sid.into(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl LocalTrack for MockLocalTrack {
    fn sid(&self) -> &str {
        &self.sid
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct MockRoom {
    name: String,
    identity: String,
    token: String,
    local_tracks: Vec<Arc<MockLocalTrack>>,
    participants: Mutex<Vec<ParticipantInfo>>,
    events_tx: mpsc::Sender<RoomEvent>,
    disconnected: AtomicBool,
}

impl MockRoom {
    /// Pushes an event to the session as if the room service had produced it.
    pub fn emit(&self, event: RoomEvent) {
        match &event {
            RoomEvent::ParticipantConnected(info) => self.participants.lock().push(info.clone()),
            RoomEvent::ParticipantDisconnected(info) => {
                self.participants.lock().retain(|p| p.sid != info.sid);
            }
            _ => {}
        }
        if let Err(err) = self.events_tx.try_send(event) {
            tracing::warn!(?err, "Failed to emit mock room event");
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub fn mock_local_tracks(&self) -> &[Arc<MockLocalTrack>] {
        &self.local_tracks
    }

    pub fn local_track(&self, kind: TrackKind) -> Option<Arc<MockLocalTrack>> {
        self.local_tracks.iter().find(|t| t.kind == kind).cloned()
    }

    pub fn all_tracks_stopped(&self) -> bool {
        self.local_tracks.iter().all(|t| t.is_stopped())
    }
}

impl RoomConnection for MockRoom {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_identity(&self) -> &str {
        &self.identity
    }

    fn local_tracks(&self) -> Vec<Arc<dyn LocalTrack>> {
        self.local_tracks
            .iter()
            .map(|t| t.clone() as Arc<dyn LocalTrack>)
            .collect()
    }

    fn participants(&self) -> Vec<ParticipantInfo> {
        self.participants.lock().clone()
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// Scriptable [`RoomProvider`]. Every successful connect creates a new [`MockRoom`], kept for
/// inspection.
#[derive(Debug, Default)]
pub struct MockRoomProvider {
    identity: String,
    participants: Vec<ParticipantInfo>,
    failure: Option<RoomError>,
    gate: Option<Arc<Notify>>,
    connect_calls: AtomicUsize,
    last_options: Mutex<Option<ConnectOptions>>,
    rooms: Mutex<Vec<Arc<MockRoom>>>,
}

impl MockRoomProvider {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Remote participants already present when the room is joined.
    pub fn with_participants(mut self, participants: Vec<ParticipantInfo>) -> Self {
        self.participants = participants;
        self
    }

    pub fn failing(mut self, err: RoomError) -> Self {
        self.failure = Some(err);
        self
    }

    /// Holds every connect until the returned [`Notify`] is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.last_options.lock().clone()
    }

    pub fn rooms(&self) -> Vec<Arc<MockRoom>> {
        self.rooms.lock().clone()
    }

    pub fn last_room(&self) -> Option<Arc<MockRoom>> {
        self.rooms.lock().last().cloned()
    }
}

#[async_trait]
impl RoomProvider for MockRoomProvider {
    #[tracing::instrument(level = "debug", skip(self, token))]
    async fn connect(
        &self,
        token: &str,
        options: ConnectOptions,
    ) -> Result<(Arc<dyn RoomConnection>, mpsc::Receiver<RoomEvent>), RoomError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock() = Some(options.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let mut local_tracks = vec![Arc::new(MockLocalTrack::new(
            "local-audio",
            TrackKind::Audio,
        ))];
        if options.video.is_some() {
            local_tracks.push(Arc::new(MockLocalTrack::new(
                "local-video",
                TrackKind::Video,
            )));
        }

        let (events_tx, events_rx) = mpsc::channel(ROOM_EVENTS_CAPACITY);
        let room = Arc::new(MockRoom {
            name: options.room_name,
            identity: self.identity.clone(),
            token: token.to_string(),
            local_tracks,
            participants: Mutex::new(self.participants.clone()),
            events_tx,
            disconnected: AtomicBool::new(false),
        });
        self.rooms.lock().push(room.clone());

        Ok((room, events_rx))
    }
}
