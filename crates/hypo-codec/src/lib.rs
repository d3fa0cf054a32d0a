//! # hypo-codec
//!
//! Turns a [`hypo_core::clipboard::ClipboardContent`] into the wire bytes
//! described by §6.1/§6.2 and back: inner JSON → gzip → AES-GCM → envelope
//! JSON → length prefix, and the exact inverse on decode. Any malformed
//! step yields a typed [`hypo_core::errors::CodecError`] — callers drop the
//! offending frame, they never tear down the connection over it (§7).

mod frame;
mod inner;
mod pipeline;

pub use frame::{decode_frame, encode_frame, MAX_FRAME_LEN};
pub use inner::{GZIP_THRESHOLD_BYTES, MAX_RAW_ATTACHMENT_BYTES};
pub use pipeline::{decode_envelope, encode_envelope, DecodedEnvelope, PipelineError};
