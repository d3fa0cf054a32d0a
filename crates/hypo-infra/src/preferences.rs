use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hypo_core::errors::StateError;
use hypo_core::ports::PreferencesPort;
use hypo_core::preferences::Preferences;
use tokio::fs;

/// Atomic-write-then-rename JSON persistence for the user-settings
/// namespace of §6.5 (history size limit, auto-delete interval,
/// plaintext-debug flag).
pub struct FilePreferencesRepository {
    path: PathBuf,
}

impl FilePreferencesRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn dir(&self) -> Option<&Path> {
        self.path.parent()
    }

    async fn ensure_parent_dir(&self) -> Result<(), StateError> {
        if let Some(dir) = self.dir() {
            fs::create_dir_all(dir).await.map_err(|e| StateError::Io(format!("create preferences dir {}: {e}", dir.display())))?;
        }
        Ok(())
    }

    async fn atomic_write(&self, content: &str) -> Result<(), StateError> {
        self.ensure_parent_dir().await?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| StateError::Io(format!("write temp preferences {}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StateError::Io(format!("rename preferences {} -> {}: {e}", tmp_path.display(), self.path.display())))
    }
}

#[async_trait]
impl PreferencesPort for FilePreferencesRepository {
    async fn load(&self) -> Result<Preferences, StateError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Preferences::default()),
            Err(e) => return Err(StateError::Io(format!("read preferences {}: {e}", self.path.display()))),
        };

        serde_json::from_str(&content).map_err(|e| StateError::Io(format!("parse preferences {}: {e}", self.path.display())))
    }

    async fn save(&self, preferences: &Preferences) -> Result<(), StateError> {
        let content = serde_json::to_string_pretty(preferences)
            .map_err(|e| StateError::Io(format!("serialize preferences: {e}")))?;
        self.atomic_write(&content).await
    }
}
