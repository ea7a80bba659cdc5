use crate::notify::{CallNotification, NotificationAction, Notifier, Permission};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

#[derive(Debug)]
pub struct MockNotifier {
    permission: Permission,
    fail: bool,
    permission_requests: AtomicUsize,
    shown: Mutex<Vec<CallNotification>>,
    pending: Mutex<Option<oneshot::Sender<NotificationAction>>>,
}

impl MockNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            fail: false,
            permission_requests: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
            pending: Mutex::new(None),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> Vec<CallNotification> {
        self.shown.lock().clone()
    }

    /// Clicks `action` on the most recent notification. Returns whether anyone was listening.
    pub fn click(&self, action: NotificationAction) -> bool {
        self.pending
            .lock()
            .take()
            .is_some_and(|tx| tx.send(action).is_ok())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn request_permission(&self) -> Permission {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        self.permission
    }

    fn show(
        &self,
        notification: &CallNotification,
    ) -> anyhow::Result<oneshot::Receiver<NotificationAction>> {
        if self.fail {
            anyhow::bail!("Notifications unavailable");
        }
        let (tx, rx) = oneshot::channel();
        self.shown.lock().push(notification.clone());
        *self.pending.lock() = Some(tx);
        Ok(rx)
    }
}
