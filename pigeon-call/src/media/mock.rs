use crate::error::TrackAttachmentError;
use crate::media::{AttachOptions, ElementHandle, MediaSink, MediaSource, RenderSlot};
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedElement {
    pub handle: ElementHandle,
    pub slot: RenderSlot,
    pub source: MediaSource,
    pub options: AttachOptions,
}

#[derive(Debug, Default)]
struct MockMediaSinkState {
    next_handle: u64,
    mounted: Vec<MountedElement>,
    failing_tracks: HashSet<String>,
    attach_calls: usize,
}

/// In-memory [`MediaSink`] recording which elements are mounted where.
#[derive(Debug, Default)]
pub struct MockMediaSink {
    state: Mutex<MockMediaSinkState>,
}

impl MockMediaSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future attach of `track_sid` fail.
    pub fn fail_track(&self, track_sid: &str) {
        self.state.lock().failing_tracks.insert(track_sid.to_string());
    }

    pub fn mounted(&self) -> Vec<MountedElement> {
        self.state.lock().mounted.clone()
    }

    pub fn mounted_in(&self, slot: RenderSlot) -> Vec<MountedElement> {
        self.state
            .lock()
            .mounted
            .iter()
            .filter(|element| element.slot == slot)
            .cloned()
            .collect()
    }

    pub fn mounted_tracks_in(&self, slot: RenderSlot) -> Vec<String> {
        self.mounted_in(slot)
            .into_iter()
            .map(|element| element.source.track_sid)
            .collect()
    }

    pub fn attach_calls(&self) -> usize {
        self.state.lock().attach_calls
    }
}

impl MediaSink for MockMediaSink {
    fn attach(
        &self,
        slot: RenderSlot,
        source: &MediaSource,
        options: AttachOptions,
    ) -> Result<ElementHandle, TrackAttachmentError> {
        let mut state = self.state.lock();
        state.attach_calls += 1;
        if state.failing_tracks.contains(&source.track_sid) {
            return Err(TrackAttachmentError::new(
                &source.track_sid,
                "element creation failed",
            ));
        }

        state.next_handle += 1;
        let handle = ElementHandle(state.next_handle);
        state.mounted.push(MountedElement {
            handle,
            slot,
            source: source.clone(),
            options,
        });
        Ok(handle)
    }

    fn detach(&self, element: ElementHandle) {
        self.state.lock().mounted.retain(|m| m.handle != element);
    }

    fn clear(&self, slot: RenderSlot) {
        self.state.lock().mounted.retain(|m| m.slot != slot);
    }
}
