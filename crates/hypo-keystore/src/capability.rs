//! Platform capability detection for secure storage.

/// Whether the current platform has a working system keyring, needs the
/// file-based fallback, or is unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureStorageCapability {
    SystemKeyring,
    FileBasedKeystore,
    Unsupported,
}

/// Detect which storage backend `PlatformKeyStore` should use.
///
/// - **macOS / Windows**: always `SystemKeyring`.
/// - **Linux**: `FileBasedKeystore` under WSL or when no desktop session
///   (`DISPLAY` + `DBUS_SESSION_BUS_ADDRESS`) is present, `SystemKeyring`
///   otherwise.
/// - Anything else: `Unsupported`.
pub fn detect_storage_capability() -> SecureStorageCapability {
    #[cfg(target_os = "macos")]
    {
        return SecureStorageCapability::SystemKeyring;
    }

    #[cfg(target_os = "windows")]
    {
        return SecureStorageCapability::SystemKeyring;
    }

    #[cfg(target_os = "linux")]
    {
        if is_wsl() {
            tracing::warn!("WSL environment detected, using file-based key storage");
            return SecureStorageCapability::FileBasedKeystore;
        }
        if has_desktop_environment() {
            return SecureStorageCapability::SystemKeyring;
        }
        tracing::warn!("no desktop session detected, using file-based key storage");
        SecureStorageCapability::FileBasedKeystore
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        SecureStorageCapability::Unsupported
    }
}

#[cfg(target_os = "linux")]
fn is_wsl() -> bool {
    if let Ok(version) = std::fs::read_to_string("/proc/version") {
        if version.contains("Microsoft") || version.contains("WSL") {
            return true;
        }
    }
    std::env::var("WSL_DISTRO_NAME").is_ok() || std::env::var("WSL_INTEROP").is_ok()
}

#[cfg(target_os = "linux")]
fn has_desktop_environment() -> bool {
    std::env::var("DISPLAY").is_ok() && std::env::var("DBUS_SESSION_BUS_ADDRESS").is_ok()
}
