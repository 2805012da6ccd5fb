//! Per-identity public key directory: `<root>/<identity>/pubKey.pem`.

use std::path::{Path, PathBuf};

use bridge_types::Identity;
use k256::ecdsa::VerifyingKey;

use crate::{parse_public_key_pem, CryptoError};

const PUBLIC_KEY_FILE: &str = "pubKey.pem";

#[derive(Clone, Debug)]
pub struct KeyStore {
    root: PathBuf,
}

impl KeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the PEM file for `identity`.
    pub fn key_path(&self, identity: &Identity) -> Result<PathBuf, CryptoError> {
        let raw = identity.as_str();
        if raw.is_empty() || raw.contains('/') || raw.contains('\\') || raw.contains("..") {
            return Err(CryptoError::InvalidIdentity(raw.to_string()));
        }
        Ok(self.root.join(raw).join(PUBLIC_KEY_FILE))
    }

    /// Load and parse the public key of `identity`.
    pub async fn load_public_key(&self, identity: &Identity) -> Result<VerifyingKey, CryptoError> {
        let path = self.key_path(identity)?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CryptoError::KeyNotFound {
                identity: identity.to_string(),
                reason: format!("{}: {e}", path.display()),
            })?;
        tracing::debug!(identity = %identity, path = %path.display(), "loaded public key");
        parse_public_key_pem(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::tests::{sec1_pem, signing_key};

    #[tokio::test]
    async fn loads_key_from_identity_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sk = signing_key(5);
        let did_dir = dir.path().join("did-exec");
        std::fs::create_dir_all(&did_dir).unwrap();
        std::fs::write(did_dir.join("pubKey.pem"), sec1_pem(&sk)).unwrap();

        let store = KeyStore::new(dir.path());
        let key = store.load_public_key(&Identity::new("did-exec")).await.unwrap();
        assert_eq!(&key, sk.verifying_key());
    }

    #[tokio::test]
    async fn missing_key_reports_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        match store.load_public_key(&Identity::new("did-ghost")).await {
            Err(CryptoError::KeyNotFound { identity, .. }) => assert_eq!(identity, "did-ghost"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn traversal_identity_rejected() {
        let store = KeyStore::new("/keys");
        assert!(matches!(
            store.key_path(&Identity::new("../root")),
            Err(CryptoError::InvalidIdentity(_))
        ));
    }
}
