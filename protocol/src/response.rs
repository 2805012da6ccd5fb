//! Reply sent by a quorum participant for each command.

use serde::{Deserialize, Serialize};

/// `{"status": bool, "message": string, "result": string|null}`.
///
/// `status == false` is a domain rejection, not a transport failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Option<String>,
}

impl RpcResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            result: None,
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            result: None,
        }
    }
}
