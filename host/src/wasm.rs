//! WebAssembly contract engine backed by `wasmi`.
//!
//! A contract module exports `memory`, an allocator `alloc(len) -> ptr` and
//! one or more entry points with the host-call shape
//! `(input_ptr, input_len, resp_ptr_ptr, resp_len_ptr) -> status`.
//! The entry payload names the entry point and its argument:
//!
//! ```json
//! {"create_ft": {"did": "..", "ft_name": "..", "ft_count": 10}}
//! ```
//!
//! Host functions are imported from the `env` module under their registered
//! names and use the same pointer conventions. A status of 0 means success;
//! a failing host function writes its error message as the response and
//! returns 1. The first host failure also fails the whole run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::runtime::Handle;
use wasmi::core::Trap;
use wasmi::{Caller, Engine, ExternType, Linker, Memory, Module, Store};

use crate::{HostError, HostFunction, Sandbox, SandboxError, SandboxFactory};

const HOST_MODULE: &str = "env";
const STATUS_OK: i32 = 0;
const STATUS_FAILED: i32 = 1;

struct RunState {
    handle: Handle,
    failure: Option<(&'static str, HostError)>,
}

pub struct WasmSandbox {
    contract: PathBuf,
    engine: Engine,
    module: Arc<Module>,
    functions: Vec<Arc<dyn HostFunction>>,
}

impl WasmSandbox {
    pub fn new(contract: impl Into<PathBuf>, engine: Engine, module: Module) -> Self {
        Self {
            contract: contract.into(),
            engine,
            module: Arc::new(module),
            functions: Vec::new(),
        }
    }

    pub fn contract(&self) -> &Path {
        &self.contract
    }
}

/// Split `{"entry": argument}` into the export name and its input bytes.
fn parse_entry(entry_payload: &str) -> Result<(String, Vec<u8>), SandboxError> {
    let payload: Value = serde_json::from_str(entry_payload)
        .map_err(|e| SandboxError::InvalidEntry(e.to_string()))?;
    let Value::Object(map) = payload else {
        return Err(SandboxError::InvalidEntry("expected a JSON object".into()));
    };
    if map.len() != 1 {
        return Err(SandboxError::InvalidEntry(format!(
            "expected exactly one entry point, got {}",
            map.len()
        )));
    }
    let Some((entry, argument)) = map.into_iter().next() else {
        return Err(SandboxError::InvalidEntry("no entry point".into()));
    };
    let input = match argument {
        Value::String(s) => s.into_bytes(),
        other => {
            serde_json::to_vec(&other).map_err(|e| SandboxError::InvalidEntry(e.to_string()))?
        }
    };
    Ok((entry, input))
}

#[async_trait]
impl Sandbox for WasmSandbox {
    fn register_host_function(
        &mut self,
        function: Arc<dyn HostFunction>,
    ) -> Result<(), SandboxError> {
        let name = function.descriptor().name;
        if self.functions.iter().any(|f| f.descriptor().name == name) {
            return Err(SandboxError::DuplicateFunction(name.to_string()));
        }
        self.functions.push(function);
        Ok(())
    }

    async fn invoke(&mut self, entry_payload: &str) -> Result<String, SandboxError> {
        let (entry, input) = parse_entry(entry_payload)?;
        tracing::debug!(
            contract = %self.contract.display(),
            entry = %entry,
            input_len = input.len(),
            "invoking contract"
        );

        let engine = self.engine.clone();
        let module = self.module.clone();
        let functions = self.functions.clone();
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || {
            run(&engine, &module, &functions, handle, &entry, &input)
        })
        .await
        .map_err(|e| SandboxError::Trap(format!("contract run aborted: {e}")))?
    }
}

fn run(
    engine: &Engine,
    module: &Module,
    functions: &[Arc<dyn HostFunction>],
    handle: Handle,
    entry: &str,
    input: &[u8],
) -> Result<String, SandboxError> {
    let registered: HashSet<&str> = functions.iter().map(|f| f.descriptor().name).collect();
    for import in module.imports() {
        if matches!(import.ty(), ExternType::Func(_))
            && (import.module() != HOST_MODULE || !registered.contains(import.name()))
        {
            return Err(SandboxError::UnknownFunction(format!(
                "{}::{}",
                import.module(),
                import.name()
            )));
        }
    }

    let mut store = Store::new(
        engine,
        RunState {
            handle,
            failure: None,
        },
    );
    let mut linker = Linker::<RunState>::new(engine);
    for function in functions {
        link(&mut linker, Arc::clone(function))?;
    }

    let instance = linker
        .instantiate(&mut store, module)
        .map_err(|e| SandboxError::Trap(format!("instantiation failed: {e}")))?
        .start(&mut store)
        .map_err(|e| SandboxError::Trap(format!("start function failed: {e}")))?;
    let memory = instance
        .get_memory(&store, "memory")
        .ok_or_else(|| SandboxError::Trap("contract exports no memory".into()))?;
    let alloc = instance
        .get_typed_func::<i32, i32>(&store, "alloc")
        .map_err(|e| SandboxError::Trap(format!("contract exports no usable alloc: {e}")))?;
    let call = instance
        .get_typed_func::<(i32, i32, i32, i32), i32>(&store, entry)
        .map_err(|_| SandboxError::InvalidEntry(format!("contract exports no entry point {entry}")))?;

    let input_len = len_i32(input.len())?;
    let input_ptr = alloc
        .call(&mut store, input_len)
        .map_err(|e| SandboxError::Trap(e.to_string()))?;
    memory
        .write(&mut store, to_offset(input_ptr)?, input)
        .map_err(|e| SandboxError::Trap(e.to_string()))?;
    let slots = alloc
        .call(&mut store, 8)
        .map_err(|e| SandboxError::Trap(e.to_string()))?;
    memory
        .write(&mut store, to_offset(slots)?, &[0u8; 8])
        .map_err(|e| SandboxError::Trap(e.to_string()))?;

    let outcome = call.call(&mut store, (input_ptr, input_len, slots, slots + 4));
    if let Some((function, source)) = store.data_mut().failure.take() {
        return Err(SandboxError::Host {
            function: function.to_string(),
            source,
        });
    }
    let status = outcome.map_err(|e| SandboxError::Trap(e.to_string()))?;

    let response = read_response(&store, &memory, slots)?;
    if status != STATUS_OK {
        return Err(SandboxError::Trap(format!(
            "{entry} returned status {status}: {response}"
        )));
    }
    Ok(response)
}

fn len_i32(len: usize) -> Result<i32, SandboxError> {
    i32::try_from(len).map_err(|_| SandboxError::InvalidEntry(format!("input of {len} bytes")))
}

fn to_offset(ptr: i32) -> Result<usize, SandboxError> {
    usize::try_from(ptr).map_err(|_| SandboxError::Trap(format!("negative pointer {ptr}")))
}

fn read_u32(store: &Store<RunState>, memory: &Memory, at: i32) -> Result<u32, SandboxError> {
    let mut buf = [0u8; 4];
    memory
        .read(store, to_offset(at)?, &mut buf)
        .map_err(|e| SandboxError::Trap(e.to_string()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_response(
    store: &Store<RunState>,
    memory: &Memory,
    slots: i32,
) -> Result<String, SandboxError> {
    let ptr = read_u32(store, memory, slots)? as usize;
    let len = read_u32(store, memory, slots + 4)? as usize;
    let mut buf = vec![0u8; len];
    memory
        .read(store, ptr, &mut buf)
        .map_err(|e| SandboxError::Trap(format!("response out of bounds: {e}")))?;
    String::from_utf8(buf).map_err(|e| SandboxError::Trap(format!("response is not UTF-8: {e}")))
}

fn link(
    linker: &mut Linker<RunState>,
    function: Arc<dyn HostFunction>,
) -> Result<(), SandboxError> {
    let descriptor = function.descriptor();
    let name = descriptor.name;
    let linked = match (descriptor.accepts_input, descriptor.params.len()) {
        (true, 4) => linker.func_wrap(
            HOST_MODULE,
            name,
            move |mut caller: Caller<'_, RunState>,
                  input_ptr: i32,
                  input_len: i32,
                  resp_ptr_ptr: i32,
                  resp_len_ptr: i32|
                  -> Result<i32, Trap> {
                let input = read_memory(&caller, input_ptr, input_len)?;
                let (status, message) = dispatch(&mut caller, &function, &input);
                write_response(&mut caller, resp_ptr_ptr, resp_len_ptr, message.as_bytes())?;
                Ok(status)
            },
        ),
        (true, _) => linker.func_wrap(
            HOST_MODULE,
            name,
            move |mut caller: Caller<'_, RunState>,
                  input_ptr: i32,
                  input_len: i32|
                  -> Result<i32, Trap> {
                let input = read_memory(&caller, input_ptr, input_len)?;
                Ok(dispatch(&mut caller, &function, &input).0)
            },
        ),
        (false, _) => linker.func_wrap(
            HOST_MODULE,
            name,
            move |mut caller: Caller<'_, RunState>,
                  resp_ptr_ptr: i32,
                  resp_len_ptr: i32|
                  -> Result<i32, Trap> {
                let (status, message) = dispatch(&mut caller, &function, &[]);
                write_response(&mut caller, resp_ptr_ptr, resp_len_ptr, message.as_bytes())?;
                Ok(status)
            },
        ),
    };
    linked.map_err(|e| SandboxError::Load {
        path: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Run one host call to completion on the runtime that started the contract.
fn dispatch(
    caller: &mut Caller<'_, RunState>,
    function: &Arc<dyn HostFunction>,
    input: &[u8],
) -> (i32, String) {
    let name = function.descriptor().name;
    let handle = caller.data().handle.clone();
    tracing::debug!(function = name, input_len = input.len(), "host call");
    match handle.block_on(function.call(input)) {
        Ok(output) => (STATUS_OK, output),
        Err(err) => {
            let message = err.to_string();
            let state = caller.data_mut();
            if state.failure.is_none() {
                state.failure = Some((name, err));
            }
            (STATUS_FAILED, message)
        }
    }
}

fn memory_of(caller: &Caller<'_, RunState>) -> Result<Memory, Trap> {
    caller
        .get_export("memory")
        .and_then(|export| export.into_memory())
        .ok_or_else(|| Trap::new("contract exports no memory"))
}

fn read_memory(caller: &Caller<'_, RunState>, ptr: i32, len: i32) -> Result<Vec<u8>, Trap> {
    let memory = memory_of(caller)?;
    let (ptr, len) = match (usize::try_from(ptr), usize::try_from(len)) {
        (Ok(ptr), Ok(len)) => (ptr, len),
        _ => return Err(Trap::new(format!("bad input range {ptr}+{len}"))),
    };
    let mut buffer = vec![0u8; len];
    memory
        .read(caller, ptr, &mut buffer)
        .map_err(|e| Trap::new(format!("memory read error: {e}")))?;
    Ok(buffer)
}

/// Copy `data` into a fresh contract allocation and store its pointer and
/// length at `resp_ptr_ptr` and `resp_len_ptr`.
fn write_response(
    caller: &mut Caller<'_, RunState>,
    resp_ptr_ptr: i32,
    resp_len_ptr: i32,
    data: &[u8],
) -> Result<(), Trap> {
    let memory = memory_of(caller)?;
    let alloc = caller
        .get_export("alloc")
        .and_then(|export| export.into_func())
        .ok_or_else(|| Trap::new("contract exports no alloc"))?
        .typed::<i32, i32>(&*caller)
        .map_err(|e| Trap::new(e.to_string()))?;
    let len = i32::try_from(data.len()).map_err(|_| Trap::new("response too large"))?;
    let ptr = alloc
        .call(&mut *caller, len)
        .map_err(|e| Trap::new(e.to_string()))?;

    let offset = |at: i32| usize::try_from(at).map_err(|_| Trap::new(format!("negative pointer {at}")));
    memory
        .write(&mut *caller, offset(ptr)?, data)
        .map_err(|e| Trap::new(format!("memory write error: {e}")))?;
    memory
        .write(&mut *caller, offset(resp_ptr_ptr)?, &ptr.to_le_bytes())
        .map_err(|e| Trap::new(format!("memory write error: {e}")))?;
    memory
        .write(&mut *caller, offset(resp_len_ptr)?, &len.to_le_bytes())
        .map_err(|e| Trap::new(format!("memory write error: {e}")))?;
    Ok(())
}

/// Compiles contract files into [`WasmSandbox`]es.
#[derive(Clone, Default)]
pub struct WasmSandboxFactory {
    engine: Engine,
}

impl WasmSandboxFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SandboxFactory for WasmSandboxFactory {
    fn instantiate(&self, contract: &Path) -> Result<Box<dyn Sandbox>, SandboxError> {
        let load_error = |reason: String| SandboxError::Load {
            path: contract.display().to_string(),
            reason,
        };
        let code = std::fs::read(contract).map_err(|e| load_error(e.to_string()))?;
        let module = Module::new(&self.engine, &code[..]).map_err(|e| load_error(e.to_string()))?;
        Ok(Box::new(WasmSandbox::new(contract, self.engine.clone(), module)))
    }
}
