//! # hypo-crypto
//!
//! X25519 key agreement, Ed25519 signing, AES-256-GCM AEAD, and HKDF-SHA-256
//! key derivation (§4.1). No I/O, no key persistence — this crate only
//! turns bytes into other bytes. `hypo-keystore` owns where keys live once
//! derived.

mod aead;
mod fingerprint;
mod identity;
mod kdf;
mod kx;

pub use aead::{decrypt, encrypt, SealedMessage, NONCE_LEN, TAG_LEN};
pub use fingerprint::identity_fingerprint;
pub use identity::{verify as verify_signature, IdentityKeyPair};
pub use kdf::derive;
pub use kx::KxKeyPair;

pub use hypo_core::errors::CryptoError;
