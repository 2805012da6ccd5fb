//! Text-frame codec for requests and responses.

use crate::{Envelope, ExtensionCommand, ProtocolError, RpcResponse};

/// Maximum accepted frame size in bytes.
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024; // 4 MiB

fn check_size(frame: &str) -> Result<(), ProtocolError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(())
}

/// Wrap a command in an `OPEN_EXTENSION` envelope and serialize it.
pub fn encode_request(command: &ExtensionCommand) -> Result<String, ProtocolError> {
    let envelope = Envelope::OpenExtension(command.clone());
    serde_json::to_string(&envelope).map_err(|e| ProtocolError::Encode(e.to_string()))
}

pub fn decode_request(frame: &str) -> Result<ExtensionCommand, ProtocolError> {
    check_size(frame)?;
    let envelope: Envelope =
        serde_json::from_str(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    Ok(envelope.into_command())
}

pub fn encode_response(response: &RpcResponse) -> Result<String, ProtocolError> {
    serde_json::to_string(response).map_err(|e| ProtocolError::Encode(e.to_string()))
}

pub fn decode_response(frame: &str) -> Result<RpcResponse, ProtocolError> {
    check_size(frame)?;
    serde_json::from_str(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
