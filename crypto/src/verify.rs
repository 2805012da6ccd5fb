//! ECDSA (secp256k1) verification over a caller-supplied digest.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use k256::pkcs8::DecodePublicKey;

use crate::CryptoError;

/// Digest length the curve order is compared against.
const DIGEST_LEN: usize = 32;

/// Parse a PEM-wrapped public key.
///
/// The block may hold raw SEC1 point bytes (compressed or uncompressed) or a
/// DER SubjectPublicKeyInfo structure.
pub fn parse_public_key_pem(pem_text: &str) -> Result<VerifyingKey, CryptoError> {
    let block = pem::parse(pem_text).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let contents = block.contents();

    if let Ok(key) = VerifyingKey::from_sec1_bytes(contents) {
        return Ok(key);
    }
    VerifyingKey::from_public_key_der(contents)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("{} block: {e}", block.tag())))
}

/// Verify a hex-encoded ASN.1 DER signature over `digest`.
///
/// `digest` is not hashed again. Digests shorter than 32 bytes are
/// left-padded with zeros and longer ones keep their leftmost 32 bytes, so
/// the integer compared against the curve order is the same either way.
///
/// Returns `Ok(false)` for any signature that does not verify, including
/// bytes that are not a DER signature, and an error only when
/// `signature_hex` is not hex.
pub fn verify_prehashed(
    key: &VerifyingKey,
    digest: &[u8],
    signature_hex: &str,
) -> Result<bool, CryptoError> {
    let der = hex::decode(signature_hex.trim())
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let signature = match Signature::from_der(&der) {
        Ok(signature) => signature,
        Err(e) => {
            tracing::debug!(error = %e, "signature is not valid DER");
            return Ok(false);
        }
    };
    let signature = signature.normalize_s().unwrap_or(signature);

    let mut prehash = [0u8; DIGEST_LEN];
    if digest.len() >= DIGEST_LEN {
        prehash.copy_from_slice(&digest[..DIGEST_LEN]);
    } else {
        prehash[DIGEST_LEN - digest.len()..].copy_from_slice(digest);
    }

    Ok(key.verify_prehash(&prehash, &signature).is_ok())
}
