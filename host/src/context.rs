//! Per-execution context shared by the host functions of one contract run.

use std::sync::Arc;

use bridge_network::RpcChannel;
use bridge_protocol::{ExtensionCommand, RpcResponse};
use bridge_types::Identity;

use crate::HostError;

/// Binds an execution to the caller's channel.
///
/// The channel is resolved once, before the contract starts; host functions
/// never consult the registry themselves.
pub struct ExecutionContext {
    identity: Option<Identity>,
    channel: Option<Arc<RpcChannel>>,
    quorum_type: i32,
}

impl ExecutionContext {
    pub fn new(channel: Arc<RpcChannel>, quorum_type: i32) -> Self {
        Self {
            identity: Some(channel.identity().clone()),
            channel: Some(channel),
            quorum_type,
        }
    }

    /// A context for executions that never talk to a quorum.
    pub fn detached(identity: Option<Identity>, quorum_type: i32) -> Self {
        Self {
            identity,
            channel: None,
            quorum_type,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn quorum_type(&self) -> i32 {
        self.quorum_type
    }

    /// Send `command` on the bound channel with the configured quorum type.
    pub async fn call(&self, mut command: ExtensionCommand) -> Result<RpcResponse, HostError> {
        let channel = self.channel.as_ref().ok_or(HostError::NoChannel)?;
        command.set_quorum_type(self.quorum_type);
        let action = command.action();
        channel
            .call(&command)
            .await
            .map_err(|e| HostError::from_channel(action.as_str(), e))
    }
}
