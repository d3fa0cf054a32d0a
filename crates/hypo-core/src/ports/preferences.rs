use async_trait::async_trait;

use crate::errors::StateError;
use crate::preferences::Preferences;

/// Preferences-file persistence for the user-settings namespace of §6.5
/// (namespace b, minus paired-device metadata — see
/// [`crate::ports::PairedDeviceRepositoryPort`]).
#[async_trait]
pub trait PreferencesPort: Send + Sync {
    async fn load(&self) -> Result<Preferences, StateError>;
    async fn save(&self, preferences: &Preferences) -> Result<(), StateError>;
}

#[cfg(test)]
mockall::mock! {
    pub Preferences {}

    #[async_trait]
    impl PreferencesPort for Preferences {
        async fn load(&self) -> Result<Preferences, StateError>;
        async fn save(&self, preferences: &Preferences) -> Result<(), StateError>;
    }
}
