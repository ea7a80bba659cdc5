#[cfg(test)]
pub(crate) mod mock;

use crate::invite::CallInvite;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{OnceCell, oneshot};
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user dismissed the prompt without deciding.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNotification {
    pub title: String,
    pub body: String,
    /// Groups notifications of the same call so a repeated link replaces the previous one.
    pub tag: String,
    pub actions: Vec<NotificationAction>,
    pub require_interaction: bool,
}

impl CallNotification {
    pub fn incoming(invite: &CallInvite) -> Self {
        Self {
            title: format!("Incoming {} call", invite.kind),
            body: format!("{} is calling you...", invite.caller),
            tag: invite.room_name.clone(),
            actions: vec![NotificationAction::Accept, NotificationAction::Reject],
            require_interaction: true,
        }
    }
}

/// Local (OS/browser) notification surface.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn request_permission(&self) -> Permission;
    /// Shows `notification`. The receiver resolves with the action the user picked and is
    /// dropped if the notification is dismissed.
    fn show(
        &self,
        notification: &CallNotification,
    ) -> anyhow::Result<oneshot::Receiver<NotificationAction>>;
}

/// Best-effort call notifications. Permission is requested once and cached for the lifetime of
/// the application.
pub struct Notifications {
    notifier: Arc<dyn Notifier>,
    permission: OnceCell<Permission>,
}

impl Notifications {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            permission: OnceCell::new(),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn request_permission(&self) -> Permission {
        *self
            .permission
            .get_or_init(|| async {
                let permission = self.notifier.request_permission().await;
                tracing::debug!(?permission, "Notification permission resolved");
                permission
            })
            .await
    }

    pub fn permission(&self) -> Option<Permission> {
        self.permission.get().copied()
    }

    /// Shows a notification for `invite`. Returns the user's pick if one was shown.
    #[instrument(level = "debug", skip(self), fields(room_name = %invite.room_name))]
    pub fn notify_incoming_call(
        &self,
        invite: &CallInvite,
    ) -> Option<oneshot::Receiver<NotificationAction>> {
        if self.permission() != Some(Permission::Granted) {
            tracing::trace!("Notification permission not granted, skipping");
            return None;
        }

        match self.notifier.show(&CallNotification::incoming(invite)) {
            Ok(action) => Some(action),
            Err(err) => {
                tracing::warn!(?err, "Failed to show call notification");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::mock::MockNotifier;
    use pigeon_call::CallKind;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn invite() -> CallInvite {
        CallInvite {
            room_name: "voice-room-1".to_string(),
            kind: CallKind::Voice,
            caller: "bob".to_string(),
        }
    }

    #[test]
    fn notification_text() {
        let notification = CallNotification::incoming(&invite());
        assert_eq!(notification.title, "Incoming voice call");
        assert_eq!(notification.body, "bob is calling you...");
        assert_eq!(
            notification.actions,
            vec![NotificationAction::Accept, NotificationAction::Reject]
        );
    }

    #[test(tokio::test)]
    async fn permission_is_requested_once() {
        let notifier = Arc::new(MockNotifier::new(Permission::Granted));
        let notifications = Notifications::new(notifier.clone());

        assert_eq!(notifications.permission(), None);
        assert_eq!(notifications.request_permission().await, Permission::Granted);
        assert_eq!(notifications.request_permission().await, Permission::Granted);

        assert_eq!(notifier.permission_requests(), 1);
    }

    #[test(tokio::test)]
    async fn shown_only_when_granted() {
        let denied = Arc::new(MockNotifier::new(Permission::Denied));
        let notifications = Notifications::new(denied.clone());
        notifications.request_permission().await;
        assert!(notifications.notify_incoming_call(&invite()).is_none());
        assert!(denied.shown().is_empty());

        let granted = Arc::new(MockNotifier::new(Permission::Granted));
        let notifications = Notifications::new(granted.clone());
        assert!(notifications.notify_incoming_call(&invite()).is_none());
        notifications.request_permission().await;
        assert!(notifications.notify_incoming_call(&invite()).is_some());
        assert_eq!(granted.shown().len(), 1);
    }

    #[test(tokio::test)]
    async fn show_failure_is_not_fatal() {
        let notifier = Arc::new(MockNotifier::new(Permission::Granted).failing());
        let notifications = Notifications::new(notifier);
        notifications.request_permission().await;

        assert!(notifications.notify_incoming_call(&invite()).is_none());
    }

    #[test(tokio::test)]
    async fn click_resolves_action() -> anyhow::Result<()> {
        let notifier = Arc::new(MockNotifier::new(Permission::Granted));
        let notifications = Notifications::new(notifier.clone());
        notifications.request_permission().await;
        let action = notifications
            .notify_incoming_call(&invite())
            .expect("notification shown");

        assert!(notifier.click(NotificationAction::Reject));

        assert_eq!(action.await?, NotificationAction::Reject);
        assert!(!notifier.click(NotificationAction::Accept));
        Ok(())
    }
}
