//! Host function contract: a descriptor for registration and an async
//! callback fed the raw argument bytes copied out of the sandbox.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{HostError, Sandbox, SandboxError};

/// Value types of a host function signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValType {
    I32,
    I64,
}

/// Name and arity under which a host function is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostFunctionDescriptor {
    pub name: &'static str,
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
    /// Whether the first two parameters point at input bytes.
    pub accepts_input: bool,
}

impl HostFunctionDescriptor {
    /// `(input_ptr, input_len, resp_ptr_ptr, resp_len_ptr) -> status`
    pub fn input_output(name: &'static str) -> Self {
        Self {
            name,
            params: vec![ValType::I32; 4],
            results: vec![ValType::I32],
            accepts_input: true,
        }
    }

    /// `(resp_ptr_ptr, resp_len_ptr) -> status`
    pub fn output_only(name: &'static str) -> Self {
        Self {
            name,
            params: vec![ValType::I32; 2],
            results: vec![ValType::I32],
            accepts_input: false,
        }
    }

    /// `(input_ptr, input_len) -> status`
    pub fn input_only(name: &'static str) -> Self {
        Self {
            name,
            params: vec![ValType::I32; 2],
            results: vec![ValType::I32],
            accepts_input: true,
        }
    }
}

#[async_trait]
pub trait HostFunction: Send + Sync {
    fn descriptor(&self) -> HostFunctionDescriptor;

    /// Handle one call. `input` holds the argument bytes the contract passed
    /// (empty for output-only functions); the returned string is copied back
    /// into the sandbox.
    async fn call(&self, input: &[u8]) -> Result<String, HostError>;
}

/// The host functions one execution is allowed to use.
#[derive(Clone, Default)]
pub struct HostFunctionSet {
    functions: Vec<Arc<dyn HostFunction>>,
}

impl HostFunctionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, function: Arc<dyn HostFunction>) -> Self {
        self.functions.push(function);
        self
    }

    pub fn push(&mut self, function: Arc<dyn HostFunction>) {
        self.functions.push(function);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.functions.iter().map(|f| f.descriptor().name).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Register every function with the sandbox.
    pub fn install(&self, sandbox: &mut dyn Sandbox) -> Result<(), SandboxError> {
        for function in &self.functions {
            sandbox.register_host_function(Arc::clone(function))?;
        }
        Ok(())
    }
}
