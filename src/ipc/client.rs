//! RPC client used to call tool adapter processes.
//!
//! Dials a fresh connection per call. A tool that was demoted to
//! NOT_SERVING therefore recovers on a later health tick without any
//! re-discovery: the next call simply dials again.

use crate::registry::{HealthStatus, ToolDescriptor};
use crate::types::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::ipc::codec::{read_frame, write_frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE};

/// Service name every tool adapter serves.
pub const TOOL_SERVICE: &str = "tool";

/// Payload cap for frames read back from tools.
const MAX_REPLY_BYTES: u32 = 5 * 1024 * 1024;

/// Reply shape of a tool's Run method. A non-empty `error` signals an
/// application-level failure in an otherwise successful transport exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct RunReply {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: String,
}

/// One-call-per-connection RPC client for a single tool address.
#[derive(Debug, Clone)]
pub struct IpcClient {
    addr: SocketAddr,
}

impl IpcClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Issue one request and wait for the single reply frame.
    pub async fn call(&self, service: &str, method: &str, body: Value) -> Result<Value> {
        let mut stream = TcpStream::connect(self.addr).await?;

        let request = serde_json::json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "service": service,
            "method": method,
            "body": body,
        });
        let payload = rmp_serde::to_vec_named(&request)?;
        write_frame(&mut stream, MSG_REQUEST, &payload).await?;

        let (msg_type, reply_bytes) = read_frame(&mut stream, MAX_REPLY_BYTES)
            .await?
            .ok_or_else(|| Error::internal(format!("{}: connection closed mid-call", self.addr)))?;
        let reply: Value = rmp_serde::from_slice(&reply_bytes)?;

        match msg_type {
            MSG_RESPONSE => Ok(reply.get("body").cloned().unwrap_or(Value::Null)),
            MSG_ERROR => {
                let code = reply
                    .pointer("/error/code")
                    .and_then(|v| v.as_str())
                    .unwrap_or("INTERNAL")
                    .to_string();
                let message = reply
                    .pointer("/error/message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown remote error")
                    .to_string();
                Err(Error::Remote { code, message })
            }
            other => Err(Error::internal(format!(
                "{}: unexpected reply frame type 0x{:02X}",
                self.addr, other
            ))),
        }
    }

    /// Fetch the tool's self-description, bounded by `deadline`.
    pub async fn describe(&self, deadline: Duration) -> Result<ToolDescriptor> {
        let body = tokio::time::timeout(
            deadline,
            self.call(TOOL_SERVICE, "Describe", Value::Object(Default::default())),
        )
        .await
        .map_err(|_| Error::timeout(format!("{}: describe deadline exceeded", self.addr)))??;

        Ok(serde_json::from_value(body)?)
    }

    /// Forward a Run call. No deadline is imposed here: the caller's own
    /// cancellation context governs the call.
    pub async fn run(&self, arguments: Value) -> Result<RunReply> {
        let body = self
            .call(
                TOOL_SERVICE,
                "Run",
                serde_json::json!({ "arguments": arguments }),
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Query the tool's health, bounded by `deadline`.
    pub async fn health_check(&self, deadline: Duration) -> Result<HealthStatus> {
        let body = tokio::time::timeout(
            deadline,
            self.call(
                TOOL_SERVICE,
                "HealthCheck",
                serde_json::json!({ "service": TOOL_SERVICE }),
            ),
        )
        .await
        .map_err(|_| Error::timeout(format!("{}: health deadline exceeded", self.addr)))??;

        let status = match body.get("status").and_then(|v| v.as_str()) {
            Some("SERVING") => HealthStatus::Serving,
            Some("NOT_SERVING") => HealthStatus::NotServing,
            _ => HealthStatus::Unknown,
        };
        Ok(status)
    }
}
