//! `serde_with`-style base64 (de)serialization helpers for wire types.
//!
//! The wire envelope (§6.2) carries `ciphertext`, `nonce`, and `tag` as
//! base64 strings even though in memory they are plain byte buffers; these
//! helpers keep that translation in one place instead of scattered
//! `base64::encode`/`decode` calls at each call site.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    STANDARD.encode(bytes).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
}
