//! Webhook signature verification.
//!
//! The signature is a hex-encoded HMAC over the raw request body. It must be
//! computed over the bytes exactly as received; parsing and re-serializing
//! the JSON changes the digest.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha2::Sha256;

use crate::error::{AppError, Result};
use crate::models::DigestAlgorithm;

/// Verifies push-update payloads against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    algorithm: DigestAlgorithm,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>, algorithm: DigestAlgorithm) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            algorithm,
        }
    }

    /// Hex digest of `body` under the shared secret.
    pub fn sign(&self, body: &[u8]) -> String {
        match self.algorithm {
            DigestAlgorithm::Md5 => hex::encode(mac::<Hmac<Md5>>(&self.secret, body)),
            DigestAlgorithm::Sha256 => hex::encode(mac::<Hmac<Sha256>>(&self.secret, body)),
        }
    }

    /// Whether `signature` is the keyed digest of `body`.
    ///
    /// Comparison is constant-time; malformed hex never verifies.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        match self.algorithm {
            DigestAlgorithm::Md5 => verify_mac::<Hmac<Md5>>(&self.secret, body, &expected),
            DigestAlgorithm::Sha256 => verify_mac::<Hmac<Sha256>>(&self.secret, body, &expected),
        }
    }

    /// Like [`verify`](Self::verify) but fails with [`AppError::Signature`].
    pub fn check(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        match signature {
            Some(sig) if self.verify(body, sig) => Ok(()),
            _ => {
                log::warn!("Rejected webhook with invalid signature ({} bytes)", body.len());
                Err(AppError::Signature)
            }
        }
    }
}

fn mac<M: Mac + KeyInit>(secret: &[u8], body: &[u8]) -> Vec<u8> {
    let mut mac = <M as KeyInit>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

fn verify_mac<M: Mac + KeyInit>(secret: &[u8], body: &[u8], expected: &[u8]) -> bool {
    let Ok(mut mac) = <M as KeyInit>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"data": {"id": "1", "type": "pledge"}}"#;

    #[test]
    fn test_hmac_md5_known_vector() {
        // RFC 2202 test case 2
        let verifier = WebhookVerifier::new("Jefe", DigestAlgorithm::Md5);
        assert_eq!(
            verifier.sign(b"what do ya want for nothing?"),
            "750c783e6ab0b503eaa86e310a5db738"
        );
    }

    #[test]
    fn test_hmac_sha256_known_vector() {
        // RFC 4231 test case 2
        let verifier = WebhookVerifier::new("Jefe", DigestAlgorithm::Sha256);
        assert_eq!(
            verifier.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_accepts_own_signature() {
        let verifier = WebhookVerifier::new("secret", DigestAlgorithm::Md5);
        let sig = verifier.sign(BODY);
        assert!(verifier.verify(BODY, &sig));
        assert!(verifier.verify(BODY, &sig.to_uppercase()));
        assert!(verifier.check(BODY, Some(&sig)).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_signatures() {
        let verifier = WebhookVerifier::new("secret", DigestAlgorithm::Md5);
        let other = WebhookVerifier::new("other", DigestAlgorithm::Md5);

        assert!(!verifier.verify(BODY, &other.sign(BODY)));
        assert!(!verifier.verify(BODY, ""));
        assert!(!verifier.verify(BODY, "not-hex"));
        assert!(!verifier.verify(BODY, "00"));
        assert!(matches!(verifier.check(BODY, None), Err(AppError::Signature)));
    }

    #[test]
    fn test_reserialized_body_does_not_verify() {
        let verifier = WebhookVerifier::new("secret", DigestAlgorithm::Md5);
        let sig = verifier.sign(BODY);

        let value: serde_json::Value = serde_json::from_slice(BODY).unwrap();
        let reserialized = serde_json::to_vec(&value).unwrap();
        assert_ne!(reserialized, BODY);
        assert!(!verifier.verify(&reserialized, &sig));
    }
}
