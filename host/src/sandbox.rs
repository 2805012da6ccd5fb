//! Contract execution engine seam.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{HostError, HostFunction};

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("host function {0} registered twice")]
    DuplicateFunction(String),

    #[error("contract called unknown host function {0}")]
    UnknownFunction(String),

    #[error("invalid entry payload: {0}")]
    InvalidEntry(String),

    #[error("failed to load contract {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("host function {function} failed: {source}")]
    Host {
        function: String,
        #[source]
        source: HostError,
    },

    #[error("contract trapped: {0}")]
    Trap(String),
}

impl SandboxError {
    /// The host error behind a failed host call, if that is what stopped the run.
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            SandboxError::Host { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One loaded contract instance.
#[async_trait]
pub trait Sandbox: Send {
    fn register_host_function(&mut self, function: Arc<dyn HostFunction>) -> Result<(), SandboxError>;

    /// Run the contract's entry point with `entry_payload` and return its result.
    async fn invoke(&mut self, entry_payload: &str) -> Result<String, SandboxError>;
}

/// Loads contracts into fresh sandboxes.
pub trait SandboxFactory: Send + Sync {
    fn instantiate(&self, contract: &Path) -> Result<Box<dyn Sandbox>, SandboxError>;
}
