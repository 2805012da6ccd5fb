//! Fungible token actions: `do_create_ft` and `do_transfer_ft_trie`.

use std::sync::Arc;

use async_trait::async_trait;

use bridge_protocol::{CreateFtPayload, ExtensionCommand, TransferFtPayload};

use crate::{ExecutionContext, HostError, HostFunction, HostFunctionDescriptor};

/// Output copied back to the contract when a token action succeeds.
pub const FT_SUCCESS: &str = "success";

pub struct CreateFtAction {
    ctx: Arc<ExecutionContext>,
}

impl CreateFtAction {
    pub const NAME: &'static str = "do_create_ft";

    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl HostFunction for CreateFtAction {
    fn descriptor(&self) -> HostFunctionDescriptor {
        HostFunctionDescriptor::input_output(Self::NAME)
    }

    async fn call(&self, input: &[u8]) -> Result<String, HostError> {
        let payload: CreateFtPayload =
            serde_json::from_slice(input).map_err(|e| HostError::decode(Self::NAME, e))?;
        tracing::info!(
            did = %payload.did,
            ft_name = %payload.ft_name,
            ft_count = payload.ft_count,
            "creating fungible token"
        );
        self.ctx.call(ExtensionCommand::CreateFt(payload)).await?;
        Ok(FT_SUCCESS.to_string())
    }
}

pub struct TransferFtAction {
    ctx: Arc<ExecutionContext>,
}

impl TransferFtAction {
    pub const NAME: &'static str = "do_transfer_ft_trie";

    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl HostFunction for TransferFtAction {
    fn descriptor(&self) -> HostFunctionDescriptor {
        HostFunctionDescriptor::input_output(Self::NAME)
    }

    async fn call(&self, input: &[u8]) -> Result<String, HostError> {
        let payload: TransferFtPayload =
            serde_json::from_slice(input).map_err(|e| HostError::decode(Self::NAME, e))?;
        tracing::info!(
            sender = %payload.sender,
            receiver = %payload.receiver,
            ft_name = %payload.ft_name,
            ft_count = payload.ft_count,
            "transferring fungible token"
        );
        self.ctx.call(ExtensionCommand::TransferFt(payload)).await?;
        Ok(FT_SUCCESS.to_string())
    }
}
