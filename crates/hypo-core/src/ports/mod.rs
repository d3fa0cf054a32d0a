//! Trait boundaries to the collaborators this crate does not implement
//! itself: the OS clipboard, the notification surface, the durable history
//! store, the secret-material store, and the wall clock. Infra/platform
//! crates provide real implementations; tests substitute the `mockall`
//! doubles declared alongside each trait.

mod clipboard_adapter;
mod clock;
mod history_store;
mod key_store;
mod notifier;
mod paired_device_repo;
mod preferences;

pub use clipboard_adapter::ClipboardAdapterPort;
pub use clock::ClockPort;
pub use history_store::HistoryStorePort;
pub use key_store::KeyStorePort;
pub use notifier::NotifierPort;
pub use paired_device_repo::PairedDeviceRepositoryPort;
pub use preferences::PreferencesPort;
