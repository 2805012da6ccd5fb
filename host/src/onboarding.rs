//! `do_verify_action`: checks the latest onboarding submission's signature
//! and records the provider it describes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use bridge_chain::{ChainApi, ChainError};
use bridge_crypto::{verify_prehashed, KeyStore};
use bridge_store::{ProviderInfo, ProviderStore};
use bridge_types::Identity;

use crate::{HostError, HostFunction, HostFunctionDescriptor};

pub const VERIFY_SUCCESS: &str = "Success";
pub const VERIFY_FAIL: &str = "Fail";

#[derive(Deserialize)]
struct OnboardingPayload {
    onboard_provider: OnboardProvider,
}

#[derive(Deserialize)]
struct OnboardProvider {
    provider_info: ProviderInfo,
}

pub struct VerifyOnboardingAction {
    chain: Arc<dyn ChainApi>,
    keys: KeyStore,
    providers: Arc<dyn ProviderStore>,
    contract: String,
}

impl VerifyOnboardingAction {
    pub const NAME: &'static str = "do_verify_action";

    pub fn new(
        chain: Arc<dyn ChainApi>,
        keys: KeyStore,
        providers: Arc<dyn ProviderStore>,
        contract: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            keys,
            providers,
            contract: contract.into(),
        }
    }
}

#[async_trait]
impl HostFunction for VerifyOnboardingAction {
    fn descriptor(&self) -> HostFunctionDescriptor {
        HostFunctionDescriptor::output_only(Self::NAME)
    }

    async fn call(&self, _input: &[u8]) -> Result<String, HostError> {
        let states = self.chain.contract_states(&self.contract, true).await?;
        let latest = states
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::NoContractData(self.contract.clone()))?;

        let executor = Identity::parse(&latest.executor_did)
            .map_err(|e| HostError::decode(Self::NAME, format!("executor DID: {e}")))?;
        let key = self.keys.load_public_key(&executor).await?;

        let payload: OnboardingPayload = serde_json::from_str(&latest.smart_contract_data)
            .map_err(|e| HostError::decode(Self::NAME, format!("provider info: {e}")))?;
        let provider = payload.onboard_provider.provider_info;
        if provider.provider_did.is_empty() {
            return Err(HostError::decode(Self::NAME, "provider info has no providerDid"));
        }

        if provider.provider_did == executor.as_str() {
            return Err(HostError::Verification(format!(
                "executor {executor} cannot onboard itself"
            )));
        }

        let valid = verify_prehashed(
            &key,
            latest.initiator_sign_data.as_bytes(),
            &latest.initiator_signature,
        )?;
        if !valid {
            tracing::warn!(
                executor = %executor,
                provider = %provider.provider_did,
                block = latest.block_no,
                "onboarding signature did not verify"
            );
            return Ok(VERIFY_FAIL.to_string());
        }

        let replaced = self.providers.put_provider(&provider)?;
        tracing::info!(
            executor = %executor,
            provider = %provider.provider_did,
            replaced,
            "provider onboarded"
        );
        Ok(VERIFY_SUCCESS.to_string())
    }
}
