use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hypo_core::ids::DeviceId;
use hypo_crypto::{IdentityKeyPair, KxKeyPair};
use serde::{Deserialize, Serialize};
use tokio::fs;

const IDENTITY_FILE: &str = "identity.json";

/// This device's stable identity: the id advertised to peers, the Ed25519
/// signing key bound into pairing (§4.7 step 1), and the X25519 key agreed
/// over during pairing. Unlike the ephemeral key pair each
/// [`hypo_pairing::InitiatorSession`] generates, this one must stay fixed
/// for the life of the install so a peer's pinned fingerprint keeps
/// matching.
pub struct LocalIdentity {
    pub device_id: DeviceId,
    pub signing: IdentityKeyPair,
    pub kx: KxKeyPair,
}

#[derive(Serialize, Deserialize)]
struct OnDisk {
    device_id: String,
    signing_secret_hex: String,
    kx_secret_hex: String,
}

impl LocalIdentity {
    /// Load the identity persisted under `dir`, generating and persisting a
    /// fresh one on first run.
    pub async fn load_or_generate(dir: &Path) -> Result<Self> {
        let path = dir.join(IDENTITY_FILE);

        match fs::read_to_string(&path).await {
            Ok(content) => {
                let on_disk: OnDisk =
                    serde_json::from_str(&content).with_context(|| format!("parse identity file: {}", path.display()))?;
                Self::from_on_disk(on_disk)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let identity = Self::generate();
                identity.persist(&path).await?;
                Ok(identity)
            }
            Err(e) => Err(e).with_context(|| format!("read identity file: {}", path.display())),
        }
    }

    fn generate() -> Self {
        Self { device_id: DeviceId::generate(), signing: IdentityKeyPair::generate(), kx: KxKeyPair::generate() }
    }

    fn from_on_disk(on_disk: OnDisk) -> Result<Self> {
        let device_id = DeviceId::parse(&on_disk.device_id).context("identity file has an invalid device id")?;

        let signing_secret: [u8; 32] =
            hex::decode(&on_disk.signing_secret_hex).context("decode signing secret")?.try_into().map_err(|_| anyhow::anyhow!("signing secret is not 32 bytes"))?;
        let kx_secret: [u8; 32] =
            hex::decode(&on_disk.kx_secret_hex).context("decode kx secret")?.try_into().map_err(|_| anyhow::anyhow!("kx secret is not 32 bytes"))?;

        Ok(Self { device_id, signing: IdentityKeyPair::from_bytes(&signing_secret), kx: KxKeyPair::from_bytes(kx_secret) })
    }

    async fn persist(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.with_context(|| format!("create identity dir: {}", dir.display()))?;
        }

        let on_disk = OnDisk {
            device_id: self.device_id.as_str().to_string(),
            signing_secret_hex: hex::encode(self.signing.to_bytes()),
            kx_secret_hex: hex::encode(self.kx.secret().to_bytes()),
        };
        let content = serde_json::to_string_pretty(&on_disk).context("serialize identity")?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await.with_context(|| format!("write temp identity {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).await.with_context(|| format!("rename identity {} -> {}", tmp_path.display(), path.display()))
    }

    pub fn fingerprint(&self) -> String {
        hypo_crypto::identity_fingerprint(&self.kx.public_bytes(), &self.signing.verifying_bytes())
    }
}

pub(crate) fn default_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(std::env::temp_dir).join("hypo")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("hypo-identity-test-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn first_run_generates_and_persists() {
        let dir = temp_dir();
        let identity = LocalIdentity::load_or_generate(&dir).await.unwrap();
        assert!(dir.join(IDENTITY_FILE).exists());
        assert!(!identity.fingerprint().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn second_load_reuses_the_same_identity() {
        let dir = temp_dir();
        let first = LocalIdentity::load_or_generate(&dir).await.unwrap();
        let second = LocalIdentity::load_or_generate(&dir).await.unwrap();

        assert_eq!(first.device_id, second.device_id);
        assert_eq!(first.fingerprint(), second.fingerprint());
        std::fs::remove_dir_all(&dir).ok();
    }
}
