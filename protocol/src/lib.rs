//! Wire protocol between the bridge and quorum participants.
//!
//! Every request is an `OPEN_EXTENSION` envelope carrying one
//! [`ExtensionCommand`]; every reply is an [`RpcResponse`]. The protocol has no
//! request ids, so a channel pairs responses with requests purely by order.

pub mod codec;
pub mod command;
pub mod error;
pub mod response;

pub use codec::{decode_request, decode_response, encode_request, encode_response};
pub use command::{
    Action, CreateFtPayload, DeployNftPayload, Envelope, ExecuteNftPayload, ExtensionCommand,
    TransferFtPayload,
};
pub use error::ProtocolError;
pub use response::RpcResponse;
