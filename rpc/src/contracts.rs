//! Contract-execution routes and the host functions each one exposes.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info};

use bridge_host::{
    AddCreditAction, CreateFtAction, ExecuteNftAction, ExecutionContext, HostFunctionSet,
    MintNftAction, TransferFtAction, VerifyOnboardingAction,
};
use bridge_types::Identity;

use crate::{ApiError, AppState};

/// Body of every contract-execution request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContractRequest {
    pub port: String,
    pub smart_contract_hash: String,
    pub smart_contract_data: String,
    pub initiator_did: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractRoute {
    CreateToken,
    UploadAsset,
    UseAsset,
    PayForInference,
    AddCredits,
    Onboard,
}

impl ContractRoute {
    pub const ALL: [ContractRoute; 6] = [
        ContractRoute::CreateToken,
        ContractRoute::UploadAsset,
        ContractRoute::UseAsset,
        ContractRoute::PayForInference,
        ContractRoute::AddCredits,
        ContractRoute::Onboard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContractRoute::CreateToken => "create_token",
            ContractRoute::UploadAsset => "upload_asset",
            ContractRoute::UseAsset => "use_asset",
            ContractRoute::PayForInference => "pay_for_inference",
            ContractRoute::AddCredits => "add_credits",
            ContractRoute::Onboard => "onboard_infra_provider",
        }
    }

    /// Contract file executed for this route, relative to the artifacts
    /// directory.
    pub fn artifact(self) -> &'static str {
        match self {
            ContractRoute::CreateToken => "asset_create_ft.wasm",
            ContractRoute::UploadAsset => "asset_publish_contract.wasm",
            ContractRoute::UseAsset => "asset_usage_contract.wasm",
            ContractRoute::PayForInference => "inference_contract.wasm",
            ContractRoute::AddCredits => "inference_credit_purchase_contract.wasm",
            ContractRoute::Onboard => "onboarding_contract.wasm",
        }
    }

    /// Whether the caller must have a registered participant channel.
    pub fn needs_channel(self) -> bool {
        !matches!(self, ContractRoute::Onboard)
    }

    /// Host functions registered in the sandbox for this route.
    pub fn host_functions(self, state: &AppState, ctx: Arc<ExecutionContext>) -> HostFunctionSet {
        let transfer = || Arc::new(TransferFtAction::new(Arc::clone(&ctx)));
        let create = || Arc::new(CreateFtAction::new(Arc::clone(&ctx)));

        match self {
            ContractRoute::CreateToken => HostFunctionSet::new().with(create()),
            ContractRoute::UploadAsset => {
                let mut mint = MintNftAction::new(Arc::clone(&ctx), Arc::clone(&state.chain));
                if let Some(dir) = &state.settings.asset_dir {
                    mint = mint.with_asset_dir(dir.clone());
                }
                HostFunctionSet::new()
                    .with(transfer())
                    .with(Arc::new(mint))
                    .with(create())
            }
            ContractRoute::UseAsset => HostFunctionSet::new()
                .with(transfer())
                .with(Arc::new(ExecuteNftAction::new(Arc::clone(&ctx))))
                .with(create()),
            ContractRoute::PayForInference => HostFunctionSet::new().with(transfer()),
            ContractRoute::AddCredits => HostFunctionSet::new()
                .with(transfer())
                .with(Arc::new(AddCreditAction::new(state.ledger.clone()))),
            ContractRoute::Onboard => {
                HostFunctionSet::new().with(Arc::new(VerifyOnboardingAction::new(
                    Arc::clone(&state.chain),
                    state.keys.clone(),
                    Arc::clone(&state.providers),
                    state.settings.onboarding_contract.clone(),
                )))
            }
        }
    }
}

impl fmt::Display for ContractRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

async fn bind_context(
    state: &AppState,
    route: ContractRoute,
    request: &ContractRequest,
) -> Result<ExecutionContext, ApiError> {
    let quorum_type = state.settings.quorum_type;
    if !route.needs_channel() {
        return Ok(ExecutionContext::detached(
            Identity::parse(&request.initiator_did).ok(),
            quorum_type,
        ));
    }

    let identity = Identity::parse(&request.initiator_did)
        .map_err(|e| ApiError::BadRequest(format!("initiator_did: {e}")))?;
    let channel = state.registry.read().await.lookup(&identity)?;
    Ok(ExecutionContext::new(channel, quorum_type))
}

async fn run(
    state: &AppState,
    route: ContractRoute,
    request: &ContractRequest,
) -> Result<String, ApiError> {
    if request.smart_contract_data.is_empty() {
        return Err(ApiError::BadRequest("smart_contract_data is required".into()));
    }

    let ctx = Arc::new(bind_context(state, route, request).await?);
    let contract = state.settings.artifacts_dir.join(route.artifact());
    let mut sandbox = state.sandboxes.instantiate(&contract)?;
    let functions = route.host_functions(state, ctx);
    functions.install(sandbox.as_mut())?;

    debug!(
        route = %route,
        initiator = %request.initiator_did,
        functions = ?functions.names(),
        "executing contract"
    );
    Ok(sandbox.invoke(&request.smart_contract_data).await?)
}

/// Execute `route`'s contract for `request` and record the outcome.
pub async fn execute(
    state: &AppState,
    route: ContractRoute,
    request: &ContractRequest,
) -> Result<String, ApiError> {
    let started = Instant::now();
    let result = run(state, route, request).await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    state
        .metrics
        .observe_execution(route.as_str(), outcome, started.elapsed());

    if result.is_ok() {
        info!(
            route = %route,
            initiator = %request.initiator_did,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "contract executed"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_onboarding_runs_without_a_channel() {
        let detached: Vec<_> = ContractRoute::ALL
            .into_iter()
            .filter(|r| !r.needs_channel())
            .collect();
        assert_eq!(detached, vec![ContractRoute::Onboard]);
    }

    #[test]
    fn request_fields_default_when_absent() {
        let req: ContractRequest =
            serde_json::from_str(r#"{"smart_contract_data":"{}","initiator_did":"did-a"}"#)
                .unwrap();
        assert!(req.port.is_empty());
        assert_eq!(req.initiator_did, "did-a");
    }
}
