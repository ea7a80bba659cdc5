use crate::error::InviteError;
use crate::identity::generate_identity;
use crate::invite::CallInvite;
use crate::notify::{NotificationAction, Notifications};
use crate::platform::{Acknowledger, Navigation, without_params};
use parking_lot::Mutex;
use pigeon_call::CallKind;
use pigeon_protocol::invite::INVITE_PARAMS;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

/// Time an incoming invite stays pending before it is rejected automatically.
pub const INVITE_TIMEOUT: Duration = Duration::from_secs(30);
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
const NOTIFICATION_ACCEPTS_CAPACITY: usize = 4;

/// Everything needed to join the room of an accepted invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub room_name: String,
    pub kind: CallKind,
    /// Freshly generated identity of the accepting side.
    pub identity: String,
    pub caller: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Declined,
    Expired,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InviteState {
    #[default]
    None,
    Pending(CallInvite),
    Accepted(CallRequest),
    Rejected(RejectReason),
}

#[derive(Default)]
struct FlowState {
    invite: InviteState,
    countdown: Option<CancellationToken>,
}

struct FlowInner {
    state: Mutex<FlowState>,
    remaining_tx: watch::Sender<Option<u64>>,
    navigation: Arc<dyn Navigation>,
    acknowledger: Arc<dyn Acknowledger>,
    notifications: Arc<Notifications>,
    accepted_tx: mpsc::Sender<CallRequest>,
    accepted_rx: tokio::sync::Mutex<mpsc::Receiver<CallRequest>>,
}

impl FlowInner {
    /// Accepts the pending invite. `countdown` scopes the acceptance to the invite that started
    /// it.
    fn accept(&self, countdown: Option<&CancellationToken>) -> Result<CallRequest, InviteError> {
        let mut state = self.state.lock();
        let InviteState::Pending(invite) = &state.invite else {
            return Err(InviteError::NoPendingInvite);
        };
        if let Some(countdown) = countdown
            && countdown.is_cancelled()
        {
            return Err(InviteError::NoPendingInvite);
        }

        let request = CallRequest {
            room_name: invite.room_name.clone(),
            kind: invite.kind,
            identity: generate_identity(),
            caller: invite.caller.clone(),
        };
        if let Some(countdown) = state.countdown.take() {
            countdown.cancel();
        }
        state.invite = InviteState::Accepted(request.clone());
        self.remaining_tx.send_replace(None);
        tracing::info!(identity = %request.identity, "Invite accepted");
        Ok(request)
    }

    /// Rejects the pending invite. `countdown` scopes automatic rejection to the invite that
    /// started it.
    fn reject(
        &self,
        reason: RejectReason,
        countdown: Option<&CancellationToken>,
    ) -> Result<(), InviteError> {
        {
            let mut state = self.state.lock();
            if !matches!(state.invite, InviteState::Pending(_)) {
                return Err(InviteError::NoPendingInvite);
            }
            if let Some(countdown) = countdown
                && countdown.is_cancelled()
            {
                return Err(InviteError::NoPendingInvite);
            }

            if let Some(countdown) = state.countdown.take() {
                countdown.cancel();
            }
            state.invite = InviteState::Rejected(reason);
            self.remaining_tx.send_replace(None);
        }

        let current = self.navigation.current_url();
        self.navigation
            .replace_url(without_params(&current, &INVITE_PARAMS));
        self.acknowledger.acknowledge("Call rejected");
        tracing::info!(?reason, "Invite rejected");
        Ok(())
    }
}

/// Lifecycle of an incoming call invite: `none -> pending -> accepted | rejected`.
///
/// A pending invite is rejected automatically after [`INVITE_TIMEOUT`]. The remaining seconds are
/// published once per second.
#[derive(Clone)]
pub struct CallInviteFlow {
    inner: Arc<FlowInner>,
}

impl CallInviteFlow {
    pub fn new(
        navigation: Arc<dyn Navigation>,
        acknowledger: Arc<dyn Acknowledger>,
        notifications: Arc<Notifications>,
    ) -> Self {
        let (remaining_tx, _) = watch::channel(None);
        let (accepted_tx, accepted_rx) = mpsc::channel(NOTIFICATION_ACCEPTS_CAPACITY);
        Self {
            inner: Arc::new(FlowInner {
                state: Mutex::new(FlowState::default()),
                remaining_tx,
                navigation,
                acknowledger,
                notifications,
                accepted_tx,
                accepted_rx: tokio::sync::Mutex::new(accepted_rx),
            }),
        }
    }

    pub fn state(&self) -> InviteState {
        self.inner.state.lock().invite.clone()
    }

    /// Seconds until the pending invite is rejected, `None` without a pending invite.
    pub fn subscribe_remaining(&self) -> watch::Receiver<Option<u64>> {
        self.inner.remaining_tx.subscribe()
    }

    /// Looks for an invite in the current navigation URL.
    pub fn detect_current(&self) -> Option<CallInvite> {
        self.detect(&self.inner.navigation.current_url())
    }

    /// Enters the pending state if `url` carries a complete invite. An invite arriving while
    /// another one is pending is ignored.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub fn detect(&self, url: &Url) -> Option<CallInvite> {
        let invite = match CallInvite::from_url(url) {
            Ok(invite) => invite,
            Err(err) => {
                tracing::trace!(?err, "URL does not carry an invite");
                return None;
            }
        };

        let countdown = {
            let mut state = self.inner.state.lock();
            if matches!(state.invite, InviteState::Pending(_)) {
                tracing::debug!("Invite already pending, ignoring");
                return None;
            }

            let countdown = CancellationToken::new();
            state.countdown = Some(countdown.clone());
            state.invite = InviteState::Pending(invite.clone());
            self.inner
                .remaining_tx
                .send_replace(Some(INVITE_TIMEOUT.as_secs()));
            tokio::spawn(run_countdown(Arc::downgrade(&self.inner), countdown.clone()));
            countdown
        };

        tracing::info!(caller = %invite.caller, kind = %invite.kind, "Incoming call");
        if let Some(action) = self.inner.notifications.notify_incoming_call(&invite) {
            tokio::spawn(route_notification_action(
                Arc::downgrade(&self.inner),
                action,
                countdown,
            ));
        }
        Some(invite)
    }

    /// Accepts the pending invite and returns the request to join its room.
    #[instrument(level = "debug", skip(self), err)]
    pub fn accept(&self) -> Result<CallRequest, InviteError> {
        self.inner.accept(None)
    }

    /// Waits for the next invite accepted from its notification.
    pub async fn notification_accepted(&self) -> Option<CallRequest> {
        self.inner.accepted_rx.lock().await.recv().await
    }

    #[instrument(level = "debug", skip(self), err)]
    pub fn reject(&self) -> Result<(), InviteError> {
        self.inner.reject(RejectReason::Declined, None)
    }

    /// Forgets an accepted or rejected invite so the next link can be handled from a clean state.
    /// A pending invite is kept. Returns whether no invite is pending afterwards.
    pub fn clear_finished(&self) -> bool {
        let mut state = self.inner.state.lock();
        match state.invite {
            InviteState::Pending(_) => false,
            InviteState::None => true,
            InviteState::Accepted(_) | InviteState::Rejected(_) => {
                state.invite = InviteState::None;
                true
            }
        }
    }
}

async fn route_notification_action(
    inner: Weak<FlowInner>,
    action: oneshot::Receiver<NotificationAction>,
    countdown: CancellationToken,
) {
    let action = tokio::select! {
        biased;
        _ = countdown.cancelled() => return,
        action = action => match action {
            Ok(action) => action,
            Err(_) => {
                tracing::trace!("Call notification dismissed");
                return;
            }
        },
    };
    let Some(inner) = inner.upgrade() else {
        return;
    };

    tracing::debug!(?action, "Call notification clicked");
    match action {
        NotificationAction::Accept => match inner.accept(Some(&countdown)) {
            Ok(request) => {
                if inner.accepted_tx.send(request).await.is_err() {
                    tracing::warn!("Nobody is waiting for accepted invites");
                }
            }
            Err(err) => tracing::trace!(?err, "Invite resolved before notification click"),
        },
        NotificationAction::Reject => {
            if let Err(err) = inner.reject(RejectReason::Declined, Some(&countdown)) {
                tracing::trace!(?err, "Invite resolved before notification click");
            }
        }
    }
}

async fn run_countdown(inner: Weak<FlowInner>, countdown: CancellationToken) {
    let mut remaining = INVITE_TIMEOUT.as_secs();
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);

    loop {
        tokio::select! {
            biased;
            _ = countdown.cancelled() => return,
            _ = ticks.tick() => {}
        }
        let Some(inner) = inner.upgrade() else {
            return;
        };

        remaining = remaining.saturating_sub(COUNTDOWN_TICK.as_secs());
        if remaining == 0 {
            tracing::debug!("Invite expired");
            if let Err(err) = inner.reject(RejectReason::Expired, Some(&countdown)) {
                tracing::trace!(?err, "Invite resolved before expiry");
            }
            return;
        }
        inner.remaining_tx.send_if_modified(|current| {
            if current.is_some() {
                *current = Some(remaining);
                true
            } else {
                false
            }
        });
    }
}
