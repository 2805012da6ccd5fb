//! Host-call script runner standing in for a contract engine.
//!
//! The entry payload is a list of host calls executed in order,
//!
//! ```json
//! {"calls": [{"function": "do_create_ft", "input": {"did": "..", "ft_name": ".."}}]}
//! ```
//!
//! String inputs are passed through as raw bytes, any other JSON value is
//! serialized. Execution stops at the first failing call; otherwise the
//! output of the last call is the result. The payload alone decides which
//! host functions run, so this never backs a live bridge.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use bridge_host::{HostFunction, Sandbox, SandboxError, SandboxFactory};

#[derive(Deserialize)]
struct Script {
    calls: Vec<ScriptCall>,
}

#[derive(Deserialize)]
struct ScriptCall {
    function: String,
    #[serde(default)]
    input: Option<Value>,
}

pub struct ScriptSandbox {
    contract: PathBuf,
    functions: HashMap<&'static str, Arc<dyn HostFunction>>,
}

impl ScriptSandbox {
    pub fn new(contract: impl Into<PathBuf>) -> Self {
        Self {
            contract: contract.into(),
            functions: HashMap::new(),
        }
    }

    pub fn contract(&self) -> &Path {
        &self.contract
    }
}

fn input_bytes(input: Option<Value>) -> Result<Vec<u8>, SandboxError> {
    match input {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.into_bytes()),
        Some(other) => {
            serde_json::to_vec(&other).map_err(|e| SandboxError::InvalidEntry(e.to_string()))
        }
    }
}

#[async_trait]
impl Sandbox for ScriptSandbox {
    fn register_host_function(
        &mut self,
        function: Arc<dyn HostFunction>,
    ) -> Result<(), SandboxError> {
        let name = function.descriptor().name;
        if self.functions.contains_key(name) {
            return Err(SandboxError::DuplicateFunction(name.to_string()));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    async fn invoke(&mut self, entry_payload: &str) -> Result<String, SandboxError> {
        let script: Script = serde_json::from_str(entry_payload)
            .map_err(|e| SandboxError::InvalidEntry(e.to_string()))?;
        if script.calls.is_empty() {
            return Err(SandboxError::InvalidEntry("no host calls".into()));
        }

        let mut output = String::new();
        for call in script.calls {
            let function = self
                .functions
                .get(call.function.as_str())
                .cloned()
                .ok_or_else(|| SandboxError::UnknownFunction(call.function.clone()))?;
            let descriptor = function.descriptor();
            let input = input_bytes(call.input)?;

            if !descriptor.accepts_input && !input.is_empty() {
                return Err(SandboxError::Trap(format!(
                    "{} takes no input",
                    descriptor.name
                )));
            }

            tracing::debug!(
                contract = %self.contract.display(),
                function = descriptor.name,
                input_len = input.len(),
                "host call"
            );
            output = function
                .call(&input)
                .await
                .map_err(|source| SandboxError::Host {
                    function: descriptor.name.to_string(),
                    source,
                })?;
        }
        Ok(output)
    }
}

/// Creates a [`ScriptSandbox`] per contract file; the file only has to exist.
#[derive(Clone, Debug, Default)]
pub struct ScriptSandboxFactory;

impl SandboxFactory for ScriptSandboxFactory {
    fn instantiate(&self, contract: &Path) -> Result<Box<dyn Sandbox>, SandboxError> {
        if !contract.is_file() {
            return Err(SandboxError::Load {
                path: contract.display().to_string(),
                reason: "contract file not found".into(),
            });
        }
        Ok(Box::new(ScriptSandbox::new(contract)))
    }
}
