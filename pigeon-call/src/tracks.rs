use crate::error::TrackAttachmentError;
use crate::media::{
    AttachOptions, ElementHandle, MediaSink, MediaSource, RenderSlot, TrackKind,
};
use crate::room::{LocalTrack, ParticipantInfo, RemoteTrackInfo, RoomEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// A subscribed remote track and the element currently rendering it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    pub sid: String,
    pub kind: TrackKind,
    pub owner_participant_sid: String,
    pub element: Option<ElementHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: String,
    pub sid: String,
    pub tracks: HashMap<String, TrackRef>,
}

impl Participant {
    fn new(info: &ParticipantInfo) -> Self {
        Self {
            identity: info.identity.clone(),
            sid: info.sid.clone(),
            tracks: HashMap::new(),
        }
    }
}

/// Keeps the elements mounted in the render slots consistent with the room's participants and
/// their subscribed tracks.
///
/// The remote video slot shows a single video: the most recently subscribed one. Remote audio of
/// every participant is mounted into the shared audio sink. Local audio is never rendered.
pub struct ParticipantTrackManager {
    sink: Arc<dyn MediaSink>,
    participants: Vec<Participant>,
    /// (participant sid, track sid) of the track occupying the remote video slot.
    remote_video: Option<(String, String)>,
    local_video: Option<ElementHandle>,
}

impl ParticipantTrackManager {
    pub fn new(sink: Arc<dyn MediaSink>) -> Self {
        Self {
            sink,
            participants: Vec::new(),
            remote_video: None,
            local_video: None,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, sid: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.sid == sid)
    }

    /// Sid of the remote track rendered in the remote video slot.
    pub fn remote_video_track(&self) -> Option<&str> {
        self.remote_video.as_ref().map(|(_, track)| track.as_str())
    }

    pub fn local_video_element(&self) -> Option<ElementHandle> {
        self.local_video
    }

    pub fn handle_event(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::ParticipantConnected(info) => {
                self.participant_connected(info);
            }
            RoomEvent::ParticipantDisconnected(info) => self.participant_disconnected(&info.sid),
            RoomEvent::TrackSubscribed {
                participant_sid,
                track,
            } => self.track_subscribed(participant_sid, track),
            RoomEvent::TrackUnsubscribed {
                participant_sid,
                track,
            } => self.track_unsubscribed(participant_sid, &track.sid),
            RoomEvent::Disconnected { .. } => {}
        }
    }

    /// Starts tracking a participant and renders its already subscribed tracks. Returns `false`
    /// if the participant was already tracked.
    #[instrument(level = "debug", skip(self, info), fields(participant_sid = %info.sid, identity = %info.identity))]
    pub fn participant_connected(&mut self, info: &ParticipantInfo) -> bool {
        if self.participant(&info.sid).is_some() {
            tracing::debug!("Participant already tracked, ignoring");
            return false;
        }

        tracing::debug!("Participant connected");
        self.participants.push(Participant::new(info));
        for track in info.subscribed_tracks() {
            self.track_subscribed(&info.sid, track);
        }
        true
    }

    #[instrument(level = "debug", skip(self))]
    pub fn participant_disconnected(&mut self, participant_sid: &str) {
        let Some(index) = self
            .participants
            .iter()
            .position(|p| p.sid == participant_sid)
        else {
            tracing::debug!("Ignoring departure of untracked participant");
            return;
        };

        let participant = self.participants.remove(index);
        for element in participant.tracks.values().filter_map(|t| t.element) {
            self.sink.detach(element);
        }
        if self
            .remote_video
            .as_ref()
            .is_some_and(|(owner, _)| owner == participant_sid)
        {
            self.remote_video = None;
        }
        tracing::debug!(identity = %participant.identity, "Participant disconnected");
    }

    #[instrument(level = "debug", skip(self, track), fields(track_sid = %track.sid, kind = ?track.kind))]
    pub fn track_subscribed(&mut self, participant_sid: &str, track: &RemoteTrackInfo) {
        let Some(index) = self
            .participants
            .iter()
            .position(|p| p.sid == participant_sid)
        else {
            tracing::debug!("Ignoring track of untracked participant");
            return;
        };

        // At most one element per (participant, kind).
        for existing in self.participants[index]
            .tracks
            .values_mut()
            .filter(|t| t.kind == track.kind)
        {
            if let Some(element) = existing.element.take() {
                self.sink.detach(element);
            }
        }

        let slot = match track.kind {
            TrackKind::Video => {
                self.clear_remote_video();
                RenderSlot::RemoteVideo
            }
            TrackKind::Audio => RenderSlot::AudioSink,
        };

        let source = MediaSource {
            track_sid: track.sid.clone(),
            kind: track.kind,
        };
        let element = match self.sink.attach(slot, &source, AttachOptions::default()) {
            Ok(element) => element,
            Err(err) => {
                log_attach_failure(&err);
                return;
            }
        };

        if track.kind == TrackKind::Video {
            self.remote_video = Some((participant_sid.to_string(), track.sid.clone()));
        }
        self.participants[index].tracks.insert(
            track.sid.clone(),
            TrackRef {
                sid: track.sid.clone(),
                kind: track.kind,
                owner_participant_sid: participant_sid.to_string(),
                element: Some(element),
            },
        );
        tracing::debug!(?slot, "Track attached");
    }

    #[instrument(level = "debug", skip(self))]
    pub fn track_unsubscribed(&mut self, participant_sid: &str, track_sid: &str) {
        let Some(track) = self
            .participants
            .iter_mut()
            .find(|p| p.sid == participant_sid)
            .and_then(|p| p.tracks.remove(track_sid))
        else {
            tracing::debug!("Ignoring unknown track");
            return;
        };

        if let Some(element) = track.element {
            self.sink.detach(element);
        }
        if self
            .remote_video
            .as_ref()
            .is_some_and(|(_, sid)| sid == track_sid)
        {
            self.remote_video = None;
        }
        tracing::debug!("Track detached");
    }

    /// Renders the local video track mirrored into the local slot, replacing any previous one.
    #[instrument(level = "debug", skip_all)]
    pub fn attach_local_tracks(&mut self, tracks: &[Arc<dyn LocalTrack>]) {
        if let Some(element) = self.local_video.take() {
            self.sink.detach(element);
        }
        self.sink.clear(RenderSlot::LocalVideo);

        for track in tracks.iter().filter(|t| t.kind() == TrackKind::Video) {
            if let Some(element) = self.local_video.take() {
                self.sink.detach(element);
            }
            let source = MediaSource {
                track_sid: track.sid().to_string(),
                kind: TrackKind::Video,
            };
            match self
                .sink
                .attach(RenderSlot::LocalVideo, &source, AttachOptions::mirrored())
            {
                Ok(element) => self.local_video = Some(element),
                Err(err) => log_attach_failure(&err),
            }
        }
    }

    /// Detaches every rendered element and forgets all participants.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&mut self) {
        for participant in self.participants.drain(..) {
            for element in participant.tracks.values().filter_map(|t| t.element) {
                self.sink.detach(element);
            }
        }
        self.remote_video = None;
        if let Some(element) = self.local_video.take() {
            self.sink.detach(element);
        }
        self.sink.clear(RenderSlot::LocalVideo);
        self.sink.clear(RenderSlot::RemoteVideo);
    }

    fn clear_remote_video(&mut self) {
        if let Some((owner, track_sid)) = self.remote_video.take()
            && let Some(track) = self
                .participants
                .iter_mut()
                .find(|p| p.sid == owner)
                .and_then(|p| p.tracks.get_mut(&track_sid))
            && let Some(element) = track.element.take()
        {
            self.sink.detach(element);
        }
        self.sink.clear(RenderSlot::RemoteVideo);
    }
}

fn log_attach_failure(err: &TrackAttachmentError) {
    tracing::warn!(track_sid = %err.track_sid, reason = %err.reason, "Skipping track that could not be attached");
}
