//! Nullable blockchain node: scripted responses, recorded requests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use bridge_chain::{ChainApi, ChainError, ContractState, CreateNftRequest, NftSummary};

/// A scripted [`ChainApi`].
///
/// Contract states are kept in append order; a `latest` query returns only
/// the last one appended.
pub struct NullChain {
    states: Mutex<HashMap<String, Vec<ContractState>>>,
    nfts: Mutex<Vec<NftSummary>>,
    chain_lengths: Mutex<HashMap<String, usize>>,
    create_result: Mutex<Result<String, String>>,
    create_requests: Mutex<Vec<CreateNftRequest>>,
    unreachable: Mutex<bool>,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            nfts: Mutex::new(Vec::new()),
            chain_lengths: Mutex::new(HashMap::new()),
            create_result: Mutex::new(Err("create-nft not scripted".into())),
            create_requests: Mutex::new(Vec::new()),
            unreachable: Mutex::new(false),
        }
    }

    /// Append a snapshot to a contract's state log.
    pub fn push_state(&self, token: &str, state: ContractState) {
        self.states
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .push(state);
    }

    pub fn add_nft(&self, nft: NftSummary, chain_length: usize) {
        self.chain_lengths
            .lock()
            .unwrap()
            .insert(nft.nft.clone(), chain_length);
        self.nfts.lock().unwrap().push(nft);
    }

    /// Next create-nft calls succeed with this id.
    pub fn set_create_result(&self, nft_id: &str) {
        *self.create_result.lock().unwrap() = Ok(nft_id.to_string());
    }

    /// Next create-nft calls are rejected with this message.
    pub fn set_create_rejection(&self, message: &str) {
        *self.create_result.lock().unwrap() = Err(message.to_string());
    }

    /// Make every call fail as if the node were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    /// Create-nft requests received so far.
    pub fn create_requests(&self) -> Vec<CreateNftRequest> {
        self.create_requests.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ChainError> {
        if *self.unreachable.lock().unwrap() {
            return Err(ChainError::Unreachable("null chain set unreachable".into()));
        }
        Ok(())
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainApi for NullChain {
    async fn contract_states(
        &self,
        token: &str,
        latest: bool,
    ) -> Result<Vec<ContractState>, ChainError> {
        self.check()?;
        let states = self.states.lock().unwrap();
        let log = states.get(token).cloned().unwrap_or_default();
        if latest {
            Ok(log.last().cloned().into_iter().collect())
        } else {
            Ok(log)
        }
    }

    async fn list_nfts(&self) -> Result<Vec<NftSummary>, ChainError> {
        self.check()?;
        Ok(self.nfts.lock().unwrap().clone())
    }

    async fn create_nft(&self, request: &CreateNftRequest) -> Result<String, ChainError> {
        self.check()?;
        self.create_requests.lock().unwrap().push(request.clone());
        self.create_result
            .lock()
            .unwrap()
            .clone()
            .map_err(ChainError::Rejected)
    }

    async fn nft_chain_length(&self, nft: &str) -> Result<usize, ChainError> {
        self.check()?;
        Ok(self
            .chain_lengths
            .lock()
            .unwrap()
            .get(nft)
            .copied()
            .unwrap_or(0))
    }
}
