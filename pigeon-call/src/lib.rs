pub mod error;
pub mod media;
pub mod room;
pub mod session;
pub mod token;
pub mod tracks;

pub use error::{CallError, TrackAttachmentError};
pub use media::{MediaSink, RenderSlot, TrackKind};
pub use pigeon_protocol::CallKind;
pub use room::{RoomConnection, RoomEvent, RoomProvider};
pub use session::{CallSession, CallSessionController, ConnectionState};
pub use token::{HttpTokenSource, TokenSource};
pub use tracks::{Participant, ParticipantTrackManager, TrackRef};
