//! HTTP implementation of [`ChainApi`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

use crate::{
    ChainApi, ChainError, ContractState, ContractStateRequest, ContractStateResponse,
    CreateNftRequest, ListNftsResponse, NftChainResponse, NftSummary, NodeResponse,
};

/// Default timeout for node requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a blockchain node's REST API.
#[derive(Clone)]
pub struct NodeClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl NodeClient {
    /// Create a client with default timeout settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ChainError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ChainError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

async fn file_part(path: &Path) -> Result<Part, ChainError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ChainError::Io(format!("{}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

#[async_trait]
impl ChainApi for NodeClient {
    async fn contract_states(
        &self,
        token: &str,
        latest: bool,
    ) -> Result<Vec<ContractState>, ChainError> {
        let body = ContractStateRequest {
            token: token.to_string(),
            latest,
        };
        let response = self
            .send(
                self.http_client
                    .post(self.url("get-smart-contract-token-chain-data"))
                    .json(&body),
            )
            .await?;
        let parsed: ContractStateResponse = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("failed to parse contract state response: {e}"))
        })?;
        let states = parsed.states.unwrap_or_default();
        tracing::debug!(
            token,
            latest,
            status = parsed.status,
            count = states.len(),
            "fetched contract states"
        );
        Ok(states)
    }

    async fn list_nfts(&self) -> Result<Vec<NftSummary>, ChainError> {
        let response = self
            .send(self.http_client.get(self.url("list-nfts")))
            .await?;
        let parsed: ListNftsResponse = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("failed to parse list-nfts response: {e}"))
        })?;
        Ok(parsed.nfts.unwrap_or_default())
    }

    async fn create_nft(&self, request: &CreateNftRequest) -> Result<String, ChainError> {
        let form = Form::new()
            .text("did", request.did.clone())
            .part("artifact", file_part(&request.artifact).await?)
            .part("metadata", file_part(&request.metadata).await?);

        let response = self
            .send(self.http_client.post(self.url("create-nft")).multipart(form))
            .await?;
        let parsed: NodeResponse = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("failed to parse create-nft response: {e}"))
        })?;

        let nft_id = match parsed.result {
            Some(serde_json::Value::String(id)) if !id.is_empty() => id,
            _ if !parsed.status => return Err(ChainError::Rejected(parsed.message)),
            _ => {
                return Err(ChainError::InvalidResponse(
                    "create-nft response carries no NFT id".into(),
                ))
            }
        };
        tracing::info!(did = %request.did, nft = %nft_id, "created NFT");
        Ok(nft_id)
    }

    async fn nft_chain_length(&self, nft: &str) -> Result<usize, ChainError> {
        let response = self
            .send(
                self.http_client
                    .get(self.url("get-nft-token-chain-data"))
                    .query(&[("nft", nft)]),
            )
            .await?;
        let parsed: NftChainResponse = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("failed to parse NFT chain response: {e}"))
        })?;
        Ok(parsed.blocks.map(|b| b.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = NodeClient::new("http://localhost:20007/");
        assert_eq!(
            client.url("list-nfts"),
            "http://localhost:20007/api/list-nfts"
        );
    }

    #[tokio::test]
    async fn unreachable_node_is_infrastructure_error() {
        let client = NodeClient::with_timeout("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client.list_nfts().await.unwrap_err();
        assert!(err.is_infrastructure());
        assert!(matches!(err, ChainError::Unreachable(_) | ChainError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn missing_artifact_is_io_error() {
        let client = NodeClient::new("http://127.0.0.1:1");
        let err = client
            .create_nft(&CreateNftRequest {
                did: "did-a".into(),
                artifact: "/definitely/not/here.bin".into(),
                metadata: "/definitely/not/here.json".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Io(_)));
    }
}
