//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use bridge_chain::NftSummary;
use bridge_host::{VERIFY_FAIL, VERIFY_SUCCESS};
use bridge_ledger::RatingSummary;
use bridge_types::{Identity, Timestamp};

use crate::contracts::{self, ContractRequest, ContractRoute};
use crate::{ApiError, AppState};

type Shared = State<Arc<AppState>>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e.body_text())))
}

fn identity(raw: &str, field: &str) -> Result<Identity, ApiError> {
    Identity::parse(raw).map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))
}

// ── Contract execution ───────────────────────────────────────────────────

async fn execute(
    state: &AppState,
    route: ContractRoute,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let output = contracts::execute(state, route, &request).await?;
    Ok(Json(json!({ "status": true, "message": output })))
}

pub async fn create_token(
    State(state): Shared,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    execute(&state, ContractRoute::CreateToken, payload).await
}

pub async fn upload_asset(
    State(state): Shared,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    execute(&state, ContractRoute::UploadAsset, payload).await
}

pub async fn use_asset(
    State(state): Shared,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    execute(&state, ContractRoute::UseAsset, payload).await
}

pub async fn pay_for_inference(
    State(state): Shared,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    execute(&state, ContractRoute::PayForInference, payload).await
}

#[derive(Deserialize)]
struct CreditOutput {
    user_did: String,
    credit: u64,
}

pub async fn add_credits(
    State(state): Shared,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let output = contracts::execute(&state, ContractRoute::AddCredits, &request).await?;
    // The credit host function reports the balance after the top-up.
    match serde_json::from_str::<CreditOutput>(&output) {
        Ok(credit) => Ok(Json(json!({
            "status": true,
            "message": format!("credit balance of {} is now {}", credit.user_did, credit.credit),
            "user_did": credit.user_did,
            "credit": credit.credit,
        }))),
        Err(_) => Ok(Json(json!({ "status": true, "message": output }))),
    }
}

pub async fn onboard_infra_provider(
    State(state): Shared,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let output = contracts::execute(&state, ContractRoute::Onboard, &request).await?;
    let (verified, message) = match output.trim() {
        VERIFY_SUCCESS => (true, "signature is valid"),
        VERIFY_FAIL => (false, "signature is invalid"),
        other => {
            return Err(ApiError::Internal(format!(
                "unexpected verification result {other:?}"
            )))
        }
    };
    Ok(Json(json!({ "status": true, "verified": verified, "message": message })))
}

// ── Participants ─────────────────────────────────────────────────────────

pub async fn connected_clients(State(state): Shared) -> Json<Value> {
    let clients = state.registry.read().await.list();
    Json(json!({ "status": true, "clients": clients }))
}

#[derive(Deserialize)]
pub struct PingParams {
    #[serde(rename = "clientID")]
    client_id: Option<String>,
}

pub async fn ping_client(
    State(state): Shared,
    Query(params): Query<PingParams>,
) -> Result<Json<Value>, ApiError> {
    let raw = params
        .client_id
        .ok_or_else(|| ApiError::BadRequest("clientID is required".into()))?;
    let identity = identity(&raw, "clientID")?;
    let channel = state
        .registry
        .read()
        .await
        .lookup(&identity)
        .map_err(|_| ApiError::NotFound(format!("client {identity} not found")))?;
    channel.ping(b"ping".to_vec()).await?;
    Ok(Json(json!({ "status": true, "message": "ping sent" })))
}

// ── Credits ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CreditView<'a> {
    status: bool,
    did: &'a str,
    credit: u64,
    #[serde(with = "bridge_types::time::decimal_secs")]
    timestamp: Option<Timestamp>,
}

pub async fn credit_balance(
    State(state): Shared,
    Path(did): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let identity = identity(&did, "did")?;
    let balance = state.ledger.get_balance(&identity)?;
    let view = CreditView {
        status: true,
        did: identity.as_str(),
        credit: balance.balance,
        timestamp: balance.last_updated,
    };
    serde_json::to_value(view)
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[derive(Deserialize)]
pub struct DeductRequest {
    did: String,
}

pub async fn deduct_credits(
    State(state): Shared,
    payload: Result<Json<DeductRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let identity = identity(&request.did, "did")?;
    let balance = state.ledger.deduct(&identity, Timestamp::now())?;
    Ok(Json(json!({
        "status": true,
        "message": "credit deducted",
        "did": identity,
        "credit": balance.balance,
    })))
}

// ── Ratings and providers ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RatingParams {
    asset_id: Option<String>,
}

pub async fn rating_by_asset(
    State(state): Shared,
    Query(params): Query<RatingParams>,
) -> Result<Json<Value>, ApiError> {
    let asset_id = params
        .asset_id
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::BadRequest("asset_id is required".into()))?;
    let body = match state.ratings.rating_for(&asset_id).await? {
        RatingSummary::Rated {
            average,
            user_count,
        } => json!({
            "status": true,
            "average_rating": average,
            "user_count": user_count,
        }),
        RatingSummary::NoData => json!({
            "status": true,
            "average_rating": null,
            "user_count": 0,
            "message": "no rating data",
        }),
    };
    Ok(Json(body))
}

pub async fn onboarded_providers(State(state): Shared) -> Result<Json<Value>, ApiError> {
    let providers = state.providers.iter_providers()?;
    Ok(Json(json!({ "status": true, "providers": providers })))
}

// ── Metrics ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AssetMetadata {
    #[serde(rename = "type", default)]
    kind: String,
}

/// Asset type from inline metadata, or from `<nft_dir>/<nft>/metadata.json`.
async fn asset_kind(state: &AppState, nft: &NftSummary) -> Option<String> {
    let raw = if !nft.nft_metadata.is_empty() {
        nft.nft_metadata.clone()
    } else {
        let dir = state.settings.nft_dir.as_ref()?;
        let path = dir.join(&nft.nft).join("metadata.json");
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                debug!(nft = %nft.nft, path = %path.display(), error = %e, "no metadata file");
                return None;
            }
        }
    };
    match serde_json::from_str::<AssetMetadata>(&raw) {
        Ok(meta) => Some(meta.kind),
        Err(e) => {
            debug!(nft = %nft.nft, error = %e, "unreadable NFT metadata");
            None
        }
    }
}

pub async fn asset_count(State(state): Shared) -> Result<Json<Value>, ApiError> {
    let nfts = state.chain.list_nfts().await?;
    let mut models = 0u64;
    let mut datasets = 0u64;
    for nft in &nfts {
        match asset_kind(&state, nft).await.as_deref() {
            Some("model") => models += 1,
            Some("dataset") => datasets += 1,
            Some(other) => debug!(nft = %nft.nft, kind = other, "unknown asset type"),
            None => {}
        }
    }
    Ok(Json(json!({
        "status": true,
        "asset_count": models + datasets,
        "ai_model_count": models,
        "dataset_count": datasets,
    })))
}

pub async fn transaction_count(State(state): Shared) -> Result<Json<Value>, ApiError> {
    let mut total = 0usize;
    for nft in state.chain.list_nfts().await? {
        total += state.chain.nft_chain_length(&nft.nft).await?;
    }
    for contract in &state.settings.tracked_contracts {
        match state.chain.contract_states(contract, false).await {
            Ok(states) => total += states.len(),
            Err(e) => warn!(contract = %contract, error = %e, "skipping contract in transaction count"),
        }
    }
    Ok(Json(json!({ "status": true, "transaction_count": total })))
}

pub async fn prometheus_metrics(State(state): Shared) -> Response {
    let clients = state.registry.read().await.len();
    state.metrics.connected_clients.set(clients as i64);
    match state.metrics.encode() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
