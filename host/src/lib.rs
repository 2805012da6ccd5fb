//! Host actions exposed to sandboxed contracts.
//!
//! A contract can only affect the outside world through the host functions
//! registered in its sandbox. Most of them forward one command over the
//! calling participant's [`bridge_network::RpcChannel`]; minting chains a node
//! call with a deploy command; onboarding verification and credit top-ups
//! stay local.
//!
//! The sandbox engine itself is a collaborator behind [`Sandbox`] and
//! [`SandboxFactory`]. [`WasmSandboxFactory`] runs WebAssembly contracts on
//! `wasmi`.

pub mod context;
pub mod credits;
pub mod error;
pub mod ft;
pub mod function;
pub mod nft;
pub mod onboarding;
pub mod sandbox;
pub mod wasm;

pub use context::ExecutionContext;
pub use credits::AddCreditAction;
pub use error::HostError;
pub use ft::{CreateFtAction, TransferFtAction};
pub use function::{HostFunction, HostFunctionDescriptor, HostFunctionSet, ValType};
pub use nft::{extract_transaction_id, ExecuteNftAction, MintNftAction, MintNftInput, MintOutcome};
pub use onboarding::{VerifyOnboardingAction, VERIFY_FAIL, VERIFY_SUCCESS};
pub use sandbox::{Sandbox, SandboxError, SandboxFactory};
pub use wasm::{WasmSandbox, WasmSandboxFactory};
