use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use sha2::{Digest, Sha256};

/// Shared with the caller so a certificate mismatch can be told apart from
/// an ordinary handshake failure and surfaced as
/// [`hypo_core::errors::TransportError::PinningFailure`] (§4.6: "any
/// mismatch is a pinning failure, not a generic connection error").
#[derive(Clone, Default, Debug)]
pub struct PinningMismatch(Arc<AtomicBool>);

impl PinningMismatch {
    pub fn was_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Verifies the cloud relay's end-entity certificate by SHA-256 fingerprint
/// instead of by chain of trust (§4.6 certificate pinning). The fingerprint
/// is configured out of band (bundled with the client or fetched once over
/// a trusted channel); this verifier never consults a CA root store.
pub struct FingerprintVerifier {
    expected_sha256_hex: String,
    provider: Arc<CryptoProvider>,
    mismatch: PinningMismatch,
}

impl std::fmt::Debug for FingerprintVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintVerifier").field("expected_sha256_hex", &self.expected_sha256_hex).finish()
    }
}

impl FingerprintVerifier {
    pub fn new(expected_sha256_hex: String) -> (Arc<Self>, PinningMismatch) {
        let mismatch = PinningMismatch::default();
        let verifier = Arc::new(Self {
            expected_sha256_hex: expected_sha256_hex.to_ascii_lowercase(),
            provider: Arc::new(rustls::crypto::ring::default_provider()),
            mismatch: mismatch.clone(),
        });
        (verifier, mismatch)
    }
}

impl ServerCertVerifier for FingerprintVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let digest = hex::encode(Sha256::digest(end_entity.as_ref()));
        if digest == self.expected_sha256_hex {
            Ok(ServerCertVerified::assertion())
        } else {
            self.mismatch.trigger();
            Err(TlsError::General(format!(
                "certificate fingerprint mismatch: expected {}, got {digest}",
                self.expected_sha256_hex
            )))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_cert() -> CertificateDer<'static> {
        CertificateDer::from(vec![1, 2, 3, 4, 5, 6, 7, 8])
    }

    #[test]
    fn matching_fingerprint_is_accepted_and_does_not_trigger_mismatch() {
        let digest = hex::encode(Sha256::digest(leaf_cert().as_ref()));
        let (verifier, mismatch) = FingerprintVerifier::new(digest);
        let result = verifier.verify_server_cert(
            &leaf_cert(),
            &[],
            &ServerName::try_from("relay.hypo.example").unwrap(),
            &[],
            UnixTime::now(),
        );
        assert!(result.is_ok());
        assert!(!mismatch.was_triggered());
    }

    #[test]
    fn wrong_fingerprint_is_rejected_and_triggers_mismatch() {
        let (verifier, mismatch) = FingerprintVerifier::new("0".repeat(64));
        let result = verifier.verify_server_cert(
            &leaf_cert(),
            &[],
            &ServerName::try_from("relay.hypo.example").unwrap(),
            &[],
            UnixTime::now(),
        );
        assert!(result.is_err());
        assert!(mismatch.was_triggered());
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let digest = hex::encode(Sha256::digest(leaf_cert().as_ref())).to_ascii_uppercase();
        let (verifier, mismatch) = FingerprintVerifier::new(digest);
        let result = verifier.verify_server_cert(
            &leaf_cert(),
            &[],
            &ServerName::try_from("relay.hypo.example").unwrap(),
            &[],
            UnixTime::now(),
        );
        assert!(result.is_ok());
        assert!(!mismatch.was_triggered());
    }
}
