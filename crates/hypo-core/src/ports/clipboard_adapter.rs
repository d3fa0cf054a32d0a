use async_trait::async_trait;

use crate::clipboard::ClipboardContent;
use crate::errors::StateError;

/// The platform-specific clipboard, consumed as a capability (§9): the core
/// never knows whether it's talking to macOS's pasteboard, X11 selections,
/// or a phone's `ClipboardManager`.
#[async_trait]
pub trait ClipboardAdapterPort: Send + Sync {
    /// Push a received entry onto the local OS clipboard.
    async fn set(&self, content: &ClipboardContent) -> Result<(), StateError>;

    /// The content currently on the local OS clipboard, if readable.
    async fn current(&self) -> Result<Option<ClipboardContent>, StateError>;
}

#[cfg(test)]
mockall::mock! {
    pub ClipboardAdapter {}

    #[async_trait]
    impl ClipboardAdapterPort for ClipboardAdapter {
        async fn set(&self, content: &ClipboardContent) -> Result<(), StateError>;
        async fn current(&self) -> Result<Option<ClipboardContent>, StateError>;
    }
}
