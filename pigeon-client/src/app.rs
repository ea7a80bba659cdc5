use crate::chat::ChatStore;
use crate::config::ClientConfig;
use crate::error::{ChatError, Error, InviteError};
use crate::identity::{generate_identity, host_identity, unix_millis};
use crate::invite::{CallInvite, CallInviteFlow, RoomIdGenerator, share_invite};
use crate::notify::{Notifications, Notifier};
use crate::platform::{Acknowledger, Clipboard, Navigation, query_param, without_params};
use parking_lot::{Mutex, MutexGuard};
use pigeon_call::{CallKind, CallSessionController, MediaSink, RoomProvider, TokenSource};
use pigeon_protocol::invite::{INVITE_PARAMS, USER_PARAM};
use std::sync::Arc;
use tracing::instrument;
use url::Url;

/// Host surfaces the application runs against.
#[derive(Clone)]
pub struct Platform {
    pub clipboard: Arc<dyn Clipboard>,
    pub navigation: Arc<dyn Navigation>,
    pub acknowledger: Arc<dyn Acknowledger>,
    pub notifier: Arc<dyn Notifier>,
    pub media: Arc<dyn MediaSink>,
}

/// Outbound call started by the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub invite: CallInvite,
    pub link: Url,
    /// Whether the link made it to the clipboard.
    pub copied: bool,
}

/// Application-wide state: local user, chats, incoming invites and the active call.
///
/// At most one call is active. Starting a new call, ending the call, and dropping the context all
/// release the previous call's room and capture devices first.
pub struct AppContext<RP, TS> {
    config: ClientConfig,
    user: String,
    chats: Mutex<ChatStore>,
    invites: CallInviteFlow,
    notifications: Arc<Notifications>,
    rooms: RoomIdGenerator,
    provider: Arc<RP>,
    tokens: Arc<TS>,
    platform: Platform,
    active_call: Mutex<Option<CallSessionController<RP, TS>>>,
}

impl<RP, TS> AppContext<RP, TS>
where
    RP: RoomProvider,
    TS: TokenSource,
{
    pub fn new(
        config: ClientConfig,
        platform: Platform,
        provider: Arc<RP>,
        tokens: Arc<TS>,
        chats: ChatStore,
    ) -> Self {
        let user = query_param(&platform.navigation.current_url(), USER_PARAM)
            .unwrap_or_else(|| {
                let identity = generate_identity();
                tracing::debug!(%identity, "Generated local identity");
                identity
            });

        let notifications = Arc::new(Notifications::new(platform.notifier.clone()));
        let invites = CallInviteFlow::new(
            platform.navigation.clone(),
            platform.acknowledger.clone(),
            notifications.clone(),
        );

        Self {
            config,
            user,
            chats: Mutex::new(chats),
            invites,
            notifications,
            rooms: RoomIdGenerator::default(),
            provider,
            tokens,
            platform,
            active_call: Mutex::new(None),
        }
    }

    /// Requests notification permission once, then handles an invite carried by the URL the
    /// application was opened with.
    #[instrument(level = "debug", skip(self))]
    pub async fn start(&self) -> Option<CallInvite> {
        self.notifications.request_permission().await;
        self.invites.detect_current()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn chats(&self) -> MutexGuard<'_, ChatStore> {
        self.chats.lock()
    }

    pub fn invites(&self) -> &CallInviteFlow {
        &self.invites
    }

    pub fn active_call(&self) -> Option<CallSessionController<RP, TS>> {
        self.active_call.lock().clone()
    }

    /// Starts a call from the selected chat: creates a room, shares the invite link and joins.
    #[instrument(level = "info", skip(self), err)]
    pub async fn start_call(&self, kind: CallKind) -> Result<OutboundCall, Error> {
        if self.chats.lock().selected().is_none() {
            return Err(ChatError::NoChatSelected.into());
        }

        let invite = CallInvite {
            room_name: self.rooms.room_name(kind),
            kind,
            caller: self.user.clone(),
        };
        let link = invite.to_url(&self.config.invite_base_url()?);
        tracing::info!(%link, "Share this link to invite the callee");

        let copied = share_invite(
            self.platform.clipboard.as_ref(),
            self.platform.acknowledger.as_ref(),
            kind,
            &link,
        )
        .await;

        self.join(&invite.room_name, &host_identity(unix_millis()), kind)
            .await?;
        Ok(OutboundCall {
            invite,
            link,
            copied,
        })
    }

    /// Accepts the pending invite and joins its room.
    #[instrument(level = "info", skip(self), err)]
    pub async fn accept_incoming_call(&self) -> Result<(), Error> {
        let request = self.invites.accept()?;
        self.join(&request.room_name, &request.identity, request.kind)
            .await?;
        Ok(())
    }

    pub fn reject_incoming_call(&self) -> Result<(), InviteError> {
        self.invites.reject()
    }

    /// Disconnects and drops the active call, then removes invite parameters from the URL. An
    /// incoming invite that is still pending is left to be accepted, rejected or to expire.
    #[instrument(level = "info", skip(self))]
    pub fn end_call(&self) {
        let Some(call) = self.active_call.lock().take() else {
            return;
        };
        call.disconnect();
        drop(call);

        if !self.invites.clear_finished() {
            tracing::debug!("Incoming invite still pending, keeping invite link");
            return;
        }
        let current = self.platform.navigation.current_url();
        self.platform
            .navigation
            .replace_url(without_params(&current, &INVITE_PARAMS));
    }

    /// Joins the room of the next invite accepted from its notification.
    #[instrument(level = "info", skip(self), err)]
    pub async fn join_notification_accept(&self) -> Result<(), Error> {
        let request = self
            .invites
            .notification_accepted()
            .await
            .ok_or(InviteError::NoPendingInvite)?;
        self.join(&request.room_name, &request.identity, request.kind)
            .await?;
        Ok(())
    }

    async fn join(&self, room_name: &str, identity: &str, kind: CallKind) -> Result<(), Error> {
        if let Some(previous) = self.active_call.lock().take() {
            tracing::debug!("Releasing previous call before joining");
            previous.disconnect();
        }

        let call = CallSessionController::new(
            self.provider.clone(),
            self.tokens.clone(),
            self.platform.media.clone(),
        );
        *self.active_call.lock() = Some(call.clone());

        call.connect(room_name, identity, kind).await?;
        Ok(())
    }
}

impl<RP, TS> Drop for AppContext<RP, TS> {
    fn drop(&mut self) {
        if let Some(call) = self.active_call.get_mut().take() {
            call.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Chat;
    use crate::invite::InviteState;
    use crate::notify::mock::MockNotifier;
    use crate::notify::{NotificationAction, Permission};
    use crate::platform::mock::{MockAcknowledger, MockClipboard, MockNavigation};
    use pigeon_call::media::mock::MockMediaSink;
    use pigeon_call::room::mock::MockRoomProvider;
    use pigeon_call::token::mock::MockTokenSource;
    use pigeon_call::{CallError, ConnectionState};
    use pretty_assertions::{assert_eq, assert_matches};
    use test_log::test;

    type Context = AppContext<MockRoomProvider, MockTokenSource>;

    struct Harness {
        app: Context,
        provider: Arc<MockRoomProvider>,
        tokens: Arc<MockTokenSource>,
        clipboard: Arc<MockClipboard>,
        navigation: Arc<MockNavigation>,
        acknowledger: Arc<MockAcknowledger>,
        notifier: Arc<MockNotifier>,
    }

    fn chat(id: u64, user: &str) -> Chat {
        Chat {
            id,
            user: user.to_string(),
            avatar_url: String::new(),
            last_message: String::new(),
            time: "1h".to_string(),
            unread: 0,
            online: true,
            messages: Vec::new(),
        }
    }

    fn harness_with(url: &str, tokens: MockTokenSource) -> Harness {
        let provider = Arc::new(MockRoomProvider::new("local"));
        let tokens = Arc::new(tokens);
        let clipboard = Arc::new(MockClipboard::default());
        let navigation = Arc::new(MockNavigation::new(url));
        let acknowledger = Arc::new(MockAcknowledger::default());
        let notifier = Arc::new(MockNotifier::new(Permission::Granted));
        let platform = Platform {
            clipboard: clipboard.clone(),
            navigation: navigation.clone(),
            acknowledger: acknowledger.clone(),
            notifier: notifier.clone(),
            media: Arc::new(MockMediaSink::new()),
        };
        let config = ClientConfig {
            invite_base_url: "https://chat.example.org/".to_string(),
            ..Default::default()
        };
        let app = AppContext::new(
            config,
            platform,
            provider.clone(),
            tokens.clone(),
            ChatStore::new(vec![chat(1, "Sarah Johnson")]),
        );
        Harness {
            app,
            provider,
            tokens,
            clipboard,
            navigation,
            acknowledger,
            notifier,
        }
    }

    fn harness(url: &str) -> Harness {
        harness_with(url, MockTokenSource::ok("jwt"))
    }

    #[test(tokio::test)]
    async fn user_from_url_or_generated() {
        let h = harness("https://chat.example.org/?user=alice");
        assert_eq!(h.app.user(), "alice");

        let h = harness("https://chat.example.org/");
        assert!(h.app.user().starts_with("user_"));
    }

    #[test(tokio::test)]
    async fn start_call_requires_selected_chat() {
        let h = harness("https://chat.example.org/?user=alice");

        let result = h.app.start_call(CallKind::Video).await;

        assert_matches!(result, Err(Error::Chat(ChatError::NoChatSelected)));
        assert_eq!(h.tokens.calls(), 0);
        assert!(h.app.active_call().is_none());
    }

    #[test(tokio::test)]
    async fn start_call_shares_link_and_joins() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?user=alice");
        h.app.chats().select(1)?;

        let call = h.app.start_call(CallKind::Voice).await?;

        assert!(call.invite.room_name.starts_with("voice-room-"));
        assert_eq!(call.invite.caller, "alice");
        assert!(call.copied);
        assert_eq!(h.clipboard.contents(), Some(call.link.to_string()));
        assert_eq!(
            CallInvite::from_url(&call.link).ok(),
            Some(call.invite.clone())
        );
        assert_eq!(
            h.acknowledger.messages(),
            vec!["Voice call link copied! Share it with the person you want to call."]
        );

        let request = &h.tokens.requests()[0];
        assert_eq!(request.room_name, call.invite.room_name);
        assert!(request.identity.starts_with("host_"));

        let active = h.app.active_call().expect("active call");
        assert_eq!(active.connection_state(), ConnectionState::Connected);
        Ok(())
    }

    #[test(tokio::test)]
    async fn consecutive_calls_use_distinct_rooms() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?user=alice");
        h.app.chats().select(1)?;

        let first = h.app.start_call(CallKind::Video).await?;
        let second = h.app.start_call(CallKind::Video).await?;

        assert_ne!(first.invite.room_name, second.invite.room_name);
        let rooms = h.provider.rooms();
        assert_eq!(rooms.len(), 2);
        assert!(rooms[0].is_disconnected());
        assert!(rooms[0].all_tracks_stopped());
        assert!(!rooms[1].is_disconnected());
        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn incoming_invite_accept_joins_room() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?user=alice&room=room-1&type=video&caller=bob");

        let invite = h.app.start().await.expect("invite");
        assert_eq!(invite.caller, "bob");
        assert_eq!(h.notifier.permission_requests(), 1);
        assert_eq!(h.notifier.shown().len(), 1);

        h.app.accept_incoming_call().await?;

        let request = &h.tokens.requests()[0];
        assert_eq!(request.room_name, "room-1");
        assert_eq!(request.call_type, CallKind::Video);
        assert!(request.identity.starts_with("user_"));
        assert_matches!(h.app.invites().state(), InviteState::Accepted(_));

        h.app.end_call();

        assert!(h.app.active_call().is_none());
        assert!(h.provider.last_room().is_some_and(|r| r.is_disconnected()));
        assert_eq!(
            h.navigation.current_url().as_str(),
            "https://chat.example.org/?user=alice"
        );
        assert_eq!(h.app.invites().state(), InviteState::None);
        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn ending_call_keeps_unrelated_pending_invite() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?user=alice");
        h.app.chats().select(1)?;
        h.app.start_call(CallKind::Video).await?;

        let incoming = Url::parse("https://chat.example.org/?user=alice&room=r1&type=voice&caller=bob")
            .map_err(anyhow::Error::from)?;
        h.navigation.replace_url(incoming.clone());
        let invite = h.app.invites().detect(&incoming).expect("invite");

        h.app.end_call();

        assert!(h.app.active_call().is_none());
        assert_eq!(h.app.invites().state(), InviteState::Pending(invite));
        assert_eq!(h.navigation.current_url(), incoming);
        assert_eq!(*h.app.invites().subscribe_remaining().borrow(), Some(30));

        h.app.reject_incoming_call()?;
        assert_eq!(
            h.acknowledger.messages(),
            vec![
                "Video call link copied! Share it with the person you want to call.",
                "Call rejected",
            ]
        );
        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn notification_accept_joins_room() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?user=alice&room=room-1&type=voice&caller=bob");
        h.app.start().await.expect("invite");

        assert!(h.notifier.click(NotificationAction::Accept));
        h.app.join_notification_accept().await?;

        assert_matches!(h.app.invites().state(), InviteState::Accepted(_));
        let request = &h.tokens.requests()[0];
        assert_eq!(request.room_name, "room-1");
        assert_eq!(request.call_type, CallKind::Voice);
        let active = h.app.active_call().expect("active call");
        assert_eq!(active.connection_state(), ConnectionState::Connected);
        Ok(())
    }

    #[test(tokio::test(start_paused = true))]
    async fn reject_incoming_call() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?room=room-1&type=video&caller=bob");
        h.app.start().await;

        h.app.reject_incoming_call()?;

        assert_eq!(h.acknowledger.messages(), vec!["Call rejected"]);
        assert_eq!(h.navigation.current_url().as_str(), "https://chat.example.org/");
        assert_eq!(h.tokens.calls(), 0);
        Ok(())
    }

    #[test(tokio::test)]
    async fn failed_call_stays_visible_until_ended() -> Result<(), Error> {
        let h = harness_with(
            "https://chat.example.org/?user=alice",
            MockTokenSource::failing("Missing credentials"),
        );
        h.app.chats().select(1)?;

        let result = h.app.start_call(CallKind::Video).await;

        assert_matches!(result, Err(Error::Call(CallError::TokenAcquisition(_))));
        let active = h.app.active_call().expect("failed call");
        assert_eq!(active.connection_state(), ConnectionState::Error);

        h.app.end_call();
        assert!(h.app.active_call().is_none());
        Ok(())
    }

    #[test(tokio::test)]
    async fn dropping_context_releases_call() -> Result<(), Error> {
        let h = harness("https://chat.example.org/?user=alice");
        h.app.chats().select(1)?;
        h.app.start_call(CallKind::Video).await?;
        let room = h.provider.last_room().expect("room");

        drop(h.app);

        assert!(room.is_disconnected());
        assert!(room.all_tracks_stopped());
        Ok(())
    }
}
