mod flow;

pub use flow::{CallInviteFlow, CallRequest, INVITE_TIMEOUT, InviteState, RejectReason};

use crate::error::InviteError;
use crate::platform::{Acknowledger, Clipboard, query_param};
use pigeon_call::CallKind;
use pigeon_protocol::invite::{CALLER_PARAM, ROOM_PARAM, TYPE_PARAM};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::instrument;
use url::Url;

/// A call offered through a shareable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInvite {
    pub room_name: String,
    pub kind: CallKind,
    /// Display name of the inviting user.
    pub caller: String,
}

impl CallInvite {
    /// Reads an invite from the `room`, `type` and `caller` query parameters of `url`.
    pub fn from_url(url: &Url) -> Result<Self, InviteError> {
        let room_name =
            query_param(url, ROOM_PARAM).ok_or(InviteError::MissingParam(ROOM_PARAM))?;
        let kind = query_param(url, TYPE_PARAM).ok_or(InviteError::MissingParam(TYPE_PARAM))?;
        let caller =
            query_param(url, CALLER_PARAM).ok_or(InviteError::MissingParam(CALLER_PARAM))?;

        let kind = kind
            .parse::<CallKind>()
            .map_err(|err| InviteError::InvalidCallType(err.0))?;

        Ok(Self {
            room_name,
            kind,
            caller,
        })
    }

    /// Shareable link inviting the recipient into this call.
    pub fn to_url(&self, base_url: &Url) -> Url {
        let mut url = base_url.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair(ROOM_PARAM, &self.room_name)
            .append_pair(TYPE_PARAM, self.kind.as_str())
            .append_pair(CALLER_PARAM, &self.caller);
        url
    }
}

/// Produces room names from a strictly increasing millisecond counter, so that two rooms created
/// within the same wall-clock millisecond still differ.
pub struct RoomIdGenerator {
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
    last: AtomicU64,
}

impl Default for RoomIdGenerator {
    fn default() -> Self {
        Self::with_clock(crate::identity::unix_millis)
    }
}

impl RoomIdGenerator {
    pub fn with_clock(clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            last: AtomicU64::new(0),
        }
    }

    /// Next timestamp, never equal to or below a previously returned one.
    pub fn next_millis(&self) -> u64 {
        let now = (self.clock)();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    pub fn room_name(&self, kind: CallKind) -> String {
        let millis = self.next_millis();
        match kind {
            CallKind::Video => format!("room-{millis}"),
            CallKind::Voice => format!("voice-room-{millis}"),
        }
    }
}

/// Copies the invite link to the clipboard and tells the user. Returns whether the copy
/// succeeded; a failed copy is never fatal.
#[instrument(level = "debug", skip(clipboard, acknowledger, link), fields(link = %link))]
pub async fn share_invite(
    clipboard: &dyn Clipboard,
    acknowledger: &dyn Acknowledger,
    kind: CallKind,
    link: &Url,
) -> bool {
    match clipboard.write_text(link.as_str()).await {
        Ok(()) => {
            let label = match kind {
                CallKind::Video => "Video",
                CallKind::Voice => "Voice",
            };
            acknowledger.acknowledge(&format!(
                "{label} call link copied! Share it with the person you want to call."
            ));
            true
        }
        Err(err) => {
            tracing::warn!(?err, "Failed to copy call link to clipboard");
            acknowledger.acknowledge(&format!(
                "Could not copy the call link. Share it manually: {link}"
            ));
            false
        }
    }
}
