use async_trait::async_trait;

use crate::clipboard::ClipboardEntry;

/// The notification surface (§9). The core schedules notifications for
/// inbound entries only; it never decides presentation.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn show(&self, entry: &ClipboardEntry);
}

#[cfg(test)]
mockall::mock! {
    pub Notifier {}

    #[async_trait]
    impl NotifierPort for Notifier {
        async fn show(&self, entry: &ClipboardEntry);
    }
}
