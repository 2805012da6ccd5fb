//! Onboarding verification against keys on disk and a scripted node.

use std::path::Path;
use std::sync::Arc;

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};

use bridge_chain::{ChainError, ContractState};
use bridge_crypto::KeyStore;
use bridge_host::{HostError, HostFunction, VerifyOnboardingAction, VERIFY_FAIL, VERIFY_SUCCESS};
use bridge_nullables::{NullChain, NullProviderStore};
use bridge_store::ProviderStore;

const CONTRACT: &str = "onboard-contract";
const EXECUTOR: &str = "bafybmi-executor";
const SIGN_DATA: &str = "3f1c0e8a9b7d6c5e4f3a2b1c0d9e8f7a6b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e";

fn signing_key() -> SigningKey {
    SigningKey::from_slice(&[21u8; 32]).unwrap()
}

fn write_key(root: &Path, did: &str, key: &SigningKey) {
    let dir = root.join(did);
    std::fs::create_dir_all(&dir).unwrap();
    let point = key.verifying_key().to_encoded_point(false);
    let text = pem::encode(&pem::Pem::new("PUBLIC KEY", point.as_bytes().to_vec()));
    std::fs::write(dir.join("pubKey.pem"), text).unwrap();
}

fn sign(key: &SigningKey, data: &str) -> String {
    let mut prehash = [0u8; 32];
    prehash.copy_from_slice(&data.as_bytes()[..32]);
    let sig: Signature = key.sign_prehash(&prehash).unwrap();
    hex::encode(sig.to_der().as_bytes())
}

fn submission(provider_did: &str, signature: String) -> ContractState {
    let data = serde_json::json!({
        "onboard_provider": {
            "provider_info": {
                "providerDid": provider_did,
                "providerName": "edge-one",
                "region": "eu-west",
                "hostingCost": 4,
                "endpoints": {"upload": "http://edge/u", "inference": "http://edge/i"}
            }
        }
    });
    ContractState {
        block_no: 3,
        smart_contract_data: data.to_string(),
        epoch: 1_700_000_000,
        initiator_signature: signature,
        executor_did: EXECUTOR.into(),
        initiator_sign_data: SIGN_DATA.into(),
        ..ContractState::default()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    chain: Arc<NullChain>,
    providers: Arc<NullProviderStore>,
    action: VerifyOnboardingAction,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_key(dir.path(), EXECUTOR, &signing_key());
    let chain = Arc::new(NullChain::new());
    let providers = Arc::new(NullProviderStore::new());
    let action = VerifyOnboardingAction::new(
        chain.clone(),
        KeyStore::new(dir.path()),
        providers.clone(),
        CONTRACT,
    );
    Fixture {
        _dir: dir,
        chain,
        providers,
        action,
    }
}

#[tokio::test]
async fn valid_submission_records_provider() {
    let f = fixture();
    f.chain
        .push_state(CONTRACT, submission("did-provider", sign(&signing_key(), SIGN_DATA)));

    assert_eq!(f.action.call(&[]).await.unwrap(), VERIFY_SUCCESS);
    let stored = f.providers.get_provider("did-provider").unwrap().unwrap();
    assert_eq!(stored.provider_name, "edge-one");
    assert_eq!(stored.hosting_cost, 4);
    assert_eq!(stored.endpoints.inference, "http://edge/i");
}

#[tokio::test]
async fn only_latest_submission_is_checked() {
    let f = fixture();
    let other = SigningKey::from_slice(&[22u8; 32]).unwrap();
    f.chain
        .push_state(CONTRACT, submission("did-old", sign(&signing_key(), SIGN_DATA)));
    f.chain
        .push_state(CONTRACT, submission("did-new", sign(&other, SIGN_DATA)));

    assert_eq!(f.action.call(&[]).await.unwrap(), VERIFY_FAIL);
    assert!(f.providers.iter_providers().unwrap().is_empty());
}

#[tokio::test]
async fn bad_signature_fails_without_storing() {
    let f = fixture();
    let mut state = submission("did-provider", sign(&signing_key(), SIGN_DATA));
    state.initiator_sign_data = "ffffffffffffffffffffffffffffffffffffffffffffffff".into();
    f.chain.push_state(CONTRACT, state);

    assert_eq!(f.action.call(&[]).await.unwrap(), VERIFY_FAIL);
    assert!(f.providers.get_provider("did-provider").unwrap().is_none());
}

#[tokio::test]
async fn undecodable_signature_bytes_fail_verification() {
    let f = fixture();
    f.chain
        .push_state(CONTRACT, submission("did-provider", "30440220deadbeef".into()));

    assert_eq!(f.action.call(&[]).await.unwrap(), VERIFY_FAIL);
    assert!(f.providers.get_provider("did-provider").unwrap().is_none());
}

#[tokio::test]
async fn executor_cannot_onboard_itself() {
    let f = fixture();
    f.chain
        .push_state(CONTRACT, submission(EXECUTOR, sign(&signing_key(), SIGN_DATA)));

    let err = f.action.call(&[]).await.unwrap_err();
    assert!(matches!(err, HostError::Verification(_)));
    assert!(f.providers.iter_providers().unwrap().is_empty());
}

#[tokio::test]
async fn missing_contract_data_is_reported() {
    let f = fixture();
    let err = f.action.call(&[]).await.unwrap_err();
    assert!(matches!(err, HostError::Chain(ChainError::NoContractData(_))));
    assert!(!err.is_infrastructure());
}

#[tokio::test]
async fn missing_executor_key_is_an_error() {
    let f = fixture();
    let mut state = submission("did-provider", sign(&signing_key(), SIGN_DATA));
    state.executor_did = "did-without-key".into();
    f.chain.push_state(CONTRACT, state);

    let err = f.action.call(&[]).await.unwrap_err();
    assert!(matches!(err, HostError::Crypto(_)));
}
