use crate::error::CallError;
use crate::media::{MediaSink, TrackKind};
use crate::room::{ConnectOptions, LocalTrack, RoomConnection, RoomEvent, RoomProvider};
use crate::token::TokenSource;
use crate::tracks::{Participant, ParticipantTrackManager};
use parking_lot::Mutex;
use pigeon_protocol::CallKind;
use pigeon_protocol::http::token::TokenRequest;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error,
    Ended,
}

/// Snapshot of the current call as rendered by the call view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    pub room_name: String,
    pub local_identity: String,
    pub kind: CallKind,
    pub state: ConnectionState,
    pub audio_enabled: bool,
    video_enabled: bool,
    pub last_error: Option<String>,
}

impl CallSession {
    fn new(room_name: &str, local_identity: &str, kind: CallKind, state: ConnectionState) -> Self {
        Self {
            room_name: room_name.to_string(),
            local_identity: local_identity.to_string(),
            kind,
            state,
            audio_enabled: true,
            video_enabled: kind.has_video(),
            last_error: None,
        }
    }

    /// Camera flag, only present for video calls.
    pub fn video_enabled(&self) -> Option<bool> {
        self.kind.has_video().then_some(self.video_enabled)
    }

    fn fail(&mut self, err: &CallError) {
        self.state = ConnectionState::Error;
        self.last_error = Some(err.to_string());
    }
}

struct ActiveRoom {
    connection: Arc<dyn RoomConnection>,
    local_tracks: Vec<Arc<dyn LocalTrack>>,
}

impl ActiveRoom {
    fn set_enabled(&self, kind: TrackKind, enabled: bool) {
        for track in self.local_tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
        }
    }

    fn release(&self) {
        release_room(self.connection.as_ref(), &self.local_tracks);
    }
}

fn release_room(connection: &dyn RoomConnection, local_tracks: &[Arc<dyn LocalTrack>]) {
    connection.disconnect();
    for track in local_tracks {
        track.stop();
    }
}

#[derive(Default)]
struct ControllerState {
    session: Option<CallSession>,
    room: Option<ActiveRoom>,
    /// Cancelled on disconnect. Scopes the in-flight connect and the event forwarding task.
    cancel: Option<CancellationToken>,
}

/// State shared with the room event forwarding task. Lock order: `state`, then `tracks`.
struct SessionShared {
    state: Mutex<ControllerState>,
    tracks: Mutex<ParticipantTrackManager>,
    state_tx: watch::Sender<ConnectionState>,
}

impl SessionShared {
    fn publish(&self, state: ConnectionState) {
        tracing::trace!(?state, "Connection state changed");
        self.state_tx.send_replace(state);
    }

    /// Moves the session into the error state unless the attempt was superseded.
    fn fail_attempt(&self, cancel: &CancellationToken, err: CallError) -> CallError {
        let mut state = self.state.lock();
        if cancel.is_cancelled() {
            tracing::debug!(?err, "Connect attempt superseded, discarding failure");
            return CallError::Cancelled;
        }

        tracing::warn!(?err, "Call connect failed");
        if let Some(session) = state.session.as_mut() {
            session.fail(&err);
        }
        state.cancel = None;
        self.publish(ConnectionState::Error);
        err
    }

    fn handle_event(&self, cancel: &CancellationToken, event: &RoomEvent) -> bool {
        let _state = self.state.lock();
        if cancel.is_cancelled() {
            return false;
        }
        self.tracks.lock().handle_event(event);
        true
    }

    #[instrument(level = "debug", skip(self, cancel))]
    fn room_disconnected(&self, cancel: &CancellationToken, error: Option<String>) {
        let room = {
            let mut state = self.state.lock();
            if cancel.is_cancelled() {
                return;
            }
            cancel.cancel();
            state.cancel = None;

            let next = if error.is_some() {
                ConnectionState::Error
            } else {
                ConnectionState::Ended
            };
            if let Some(session) = state.session.as_mut() {
                session.state = next;
                session.last_error = error;
            }
            self.tracks.lock().reset();
            self.publish(next);
            state.room.take()
        };

        if let Some(room) = room {
            room.release();
        }
        tracing::info!("Room disconnected");
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        if let Some(room) = state.room.take() {
            room.release();
        }
        self.tracks.get_mut().reset();
    }
}

/// Drives a single call from token acquisition through room join to teardown.
///
/// Cloning yields another handle to the same call. The room is released when the last handle is
/// dropped.
pub struct CallSessionController<RP, TS> {
    provider: Arc<RP>,
    tokens: Arc<TS>,
    shared: Arc<SessionShared>,
}

impl<RP, TS> Clone for CallSessionController<RP, TS> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            tokens: self.tokens.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<RP, TS> CallSessionController<RP, TS>
where
    RP: RoomProvider,
    TS: TokenSource,
{
    pub fn new(provider: Arc<RP>, tokens: Arc<TS>, sink: Arc<dyn MediaSink>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            provider,
            tokens,
            shared: Arc::new(SessionShared {
                state: Mutex::new(ControllerState::default()),
                tracks: Mutex::new(ParticipantTrackManager::new(sink)),
                state_tx,
            }),
        }
    }

    /// Joins `room_name` as `local_identity`.
    ///
    /// Returns [`CallError::Cancelled`] if [`Self::disconnect`] ran while the attempt was in flight;
    /// the controller state is left as the disconnect set it.
    #[instrument(level = "info", skip(self), err)]
    pub async fn connect(
        &self,
        room_name: &str,
        local_identity: &str,
        kind: CallKind,
    ) -> Result<(), CallError> {
        let cancel = {
            let mut state = self.shared.state.lock();
            let active = state.session.as_ref().is_some_and(|s| {
                matches!(
                    s.state,
                    ConnectionState::Connecting | ConnectionState::Connected
                )
            });

            if room_name.trim().is_empty() || local_identity.trim().is_empty() {
                let err = CallError::Validation("Room name and identity are required".to_string());
                if active {
                    tracing::debug!("Invalid connect request while a call is active");
                    return Err(err);
                }
                let mut session =
                    CallSession::new(room_name, local_identity, kind, ConnectionState::Error);
                session.fail(&err);
                state.session = Some(session);
                self.shared.publish(ConnectionState::Error);
                return Err(err);
            }

            if active {
                tracing::debug!("Call already active, rejecting connect");
                return Err(CallError::CallActive);
            }

            if let Some(stale) = state.room.take() {
                stale.release();
            }
            let cancel = CancellationToken::new();
            state.cancel = Some(cancel.clone());
            state.session = Some(CallSession::new(
                room_name,
                local_identity,
                kind,
                ConnectionState::Connecting,
            ));
            self.shared.publish(ConnectionState::Connecting);
            cancel
        };

        let request = TokenRequest {
            identity: local_identity.to_string(),
            room_name: room_name.to_string(),
            call_type: kind,
        };
        tracing::debug!("Requesting access token");
        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Connect attempt superseded while fetching token");
                return Err(CallError::Cancelled);
            }
            result = self.tokens.fetch_token(&request) => result,
        };
        let token = match token {
            Ok(token) => token,
            Err(err) => return Err(self.shared.fail_attempt(&cancel, err)),
        };

        tracing::debug!("Joining room");
        let (connection, events) = match self
            .provider
            .connect(&token, ConnectOptions::for_call(room_name, kind))
            .await
        {
            Ok(joined) => joined,
            Err(err) => return Err(self.shared.fail_attempt(&cancel, err.into())),
        };
        let local_tracks = connection.local_tracks();

        {
            let mut state = self.shared.state.lock();
            if cancel.is_cancelled() {
                drop(state);
                tracing::debug!("Connect attempt superseded, releasing late room");
                release_room(connection.as_ref(), &local_tracks);
                return Err(CallError::Cancelled);
            }

            {
                let mut tracks = self.shared.tracks.lock();
                tracks.attach_local_tracks(&local_tracks);
                for participant in connection.participants() {
                    tracks.participant_connected(&participant);
                }
            }

            state.room = Some(ActiveRoom {
                connection,
                local_tracks,
            });
            if let Some(session) = state.session.as_mut() {
                session.state = ConnectionState::Connected;
            }
            self.shared.publish(ConnectionState::Connected);
        }

        tokio::spawn(forward_room_events(
            Arc::downgrade(&self.shared),
            events,
            cancel,
        ));
        tracing::info!("Call connected");
        Ok(())
    }
}

impl<RP, TS> CallSessionController<RP, TS> {
    pub fn snapshot(&self) -> Option<CallSession> {
        self.shared.state.lock().session.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.shared.tracks.lock().participants().to_vec()
    }

    /// Leaves the room, stops local capture and clears every render slot. Idempotent.
    #[instrument(level = "info", skip(self))]
    pub fn disconnect(&self) {
        let room = {
            let mut state = self.shared.state.lock();
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            let had_session = state.session.take().is_some();
            self.shared.tracks.lock().reset();
            if had_session {
                self.shared.publish(ConnectionState::Idle);
            }
            state.room.take()
        };

        if let Some(room) = room {
            room.release();
            tracing::info!("Call disconnected");
        }
    }

    /// Flips the microphone. Returns the new flag, or `None` without a connected call.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle_audio(&self) -> Option<bool> {
        let mut state = self.shared.state.lock();
        let ControllerState { session, room, .. } = &mut *state;
        let (Some(session), Some(room)) = (session.as_mut(), room.as_ref()) else {
            return None;
        };
        if session.state != ConnectionState::Connected {
            return None;
        }

        session.audio_enabled = !session.audio_enabled;
        room.set_enabled(TrackKind::Audio, session.audio_enabled);
        Some(session.audio_enabled)
    }

    /// Flips the camera. Returns the new flag, or `None` for voice calls or without a connected
    /// call.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle_video(&self) -> Option<bool> {
        let mut state = self.shared.state.lock();
        let ControllerState { session, room, .. } = &mut *state;
        let (Some(session), Some(room)) = (session.as_mut(), room.as_ref()) else {
            return None;
        };
        if session.state != ConnectionState::Connected || !session.kind.has_video() {
            return None;
        }

        session.video_enabled = !session.video_enabled;
        room.set_enabled(TrackKind::Video, session.video_enabled);
        Some(session.video_enabled)
    }
}

async fn forward_room_events(
    shared: Weak<SessionShared>,
    mut events: mpsc::Receiver<RoomEvent>,
    cancel: CancellationToken,
) {
    tracing::trace!("Forwarding room events");
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };

        match event {
            Some(RoomEvent::Disconnected { error }) => {
                shared.room_disconnected(&cancel, error);
                break;
            }
            Some(event) => {
                tracing::trace!(?event, "Received room event");
                if !shared.handle_event(&cancel, &event) {
                    break;
                }
            }
            None => {
                tracing::debug!("Room event stream closed");
                shared.room_disconnected(&cancel, None);
                break;
            }
        }
    }
    tracing::trace!("Stopped forwarding room events");
}
