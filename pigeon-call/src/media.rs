#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use crate::error::TrackAttachmentError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Place a media element can be mounted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderSlot {
    /// Self view of the local camera.
    LocalVideo,
    /// The single remote video view.
    RemoteVideo,
    /// Document-wide, invisible sink for remote audio. Holds any number of elements.
    AudioSink,
}

/// Opaque handle of a mounted media element, issued by a [`MediaSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub u64);

/// Media source to bind to a render slot, identified by its track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub track_sid: String,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachOptions {
    /// Flip the element horizontally (self-view convention).
    pub mirrored: bool,
}

impl AttachOptions {
    pub fn mirrored() -> Self {
        Self { mirrored: true }
    }
}

/// Platform media element abstraction: creates playable elements for tracks and mounts them into
/// render slots.
pub trait MediaSink: Send + Sync + 'static {
    /// Creates an element playing `source` and mounts it into `slot`.
    fn attach(
        &self,
        slot: RenderSlot,
        source: &MediaSource,
        options: AttachOptions,
    ) -> Result<ElementHandle, TrackAttachmentError>;

    /// Removes and discards a previously attached element. Unknown handles are ignored.
    fn detach(&self, element: ElementHandle);

    /// Removes every element mounted in `slot`.
    fn clear(&self, slot: RenderSlot);
}

/// Capture constraints requested for the local camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 24,
        }
    }
}
