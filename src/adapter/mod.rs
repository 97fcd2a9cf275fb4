//! Tool adapter runtime — the contract every tool process serves.
//!
//! A tool exposes three operations over the framed transport: `Describe`
//! (self-description, idempotent), `Run` (execute with a structured
//! argument map), and `HealthCheck`. Application failures travel in-band as
//! a non-empty error string inside a successful transport response, so
//! callers can tell "tool logic failed" from "tool unreachable".

pub mod human_input;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ipc::client::TOOL_SERVICE;
use crate::ipc::{Dispatch, IpcServer};
use crate::registry::ToolDescriptor;
use crate::types::{Error, IpcConfig, Result};

/// Outcome of one tool run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(Value),
    /// Application-level failure, reported in-band.
    Failure(String),
}

/// A tool implementation hosted by [`ToolService`].
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Self-description; the `name` in it is the authoritative registration
    /// name.
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute with tool-defined arguments.
    async fn run(&self, arguments: Map<String, Value>) -> RunOutcome;
}

/// Shared health bit a tool flips to advertise SERVING / NOT_SERVING. A
/// live but overloaded tool may legitimately self-report NOT_SERVING.
#[derive(Debug, Clone, Default)]
pub struct ServingFlag(Arc<AtomicBool>);

impl ServingFlag {
    /// Starts out NOT_SERVING; a tool declares readiness explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving() -> Self {
        let flag = Self::new();
        flag.set_serving(true);
        flag
    }

    pub fn set_serving(&self, serving: bool) {
        self.0.store(serving, Ordering::Relaxed);
    }

    pub fn is_serving(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Serves one [`Tool`] over the framed transport.
#[derive(Debug)]
pub struct ToolService<T> {
    tool: Arc<T>,
    serving: ServingFlag,
}

impl<T: Tool> ToolService<T> {
    pub fn new(tool: Arc<T>, serving: ServingFlag) -> Self {
        Self { tool, serving }
    }

    /// Convenience server constructor for tool binaries and tests.
    pub fn into_server(self, addr: SocketAddr, ipc_config: IpcConfig) -> IpcServer<Self> {
        IpcServer::new(Arc::new(self), addr, ipc_config)
    }
}

#[async_trait]
impl<T: Tool> Dispatch for ToolService<T> {
    async fn dispatch(&self, service: &str, method: &str, body: Value) -> Result<Value> {
        if service != TOOL_SERVICE {
            return Err(Error::not_found(format!("Unknown service: {}", service)));
        }

        match method {
            "Describe" => Ok(serde_json::to_value(self.tool.descriptor())?),

            "Run" => {
                let arguments = body
                    .get("arguments")
                    .and_then(|v| v.as_object())
                    .cloned()
                    .unwrap_or_default();

                let reply = match self.tool.run(arguments).await {
                    RunOutcome::Success(result) => serde_json::json!({
                        "result": result,
                        "error": "",
                    }),
                    RunOutcome::Failure(error) => serde_json::json!({
                        "result": Value::Null,
                        "error": error,
                    }),
                };
                Ok(reply)
            }

            "HealthCheck" => {
                // An explicitly named foreign service is unknown here.
                if let Some(requested) = body.get("service").and_then(|v| v.as_str()) {
                    if requested != TOOL_SERVICE {
                        return Err(Error::not_found(format!(
                            "Unknown health service: {}",
                            requested
                        )));
                    }
                }
                let status = if self.serving.is_serving() {
                    "SERVING"
                } else {
                    "NOT_SERVING"
                };
                Ok(serde_json::json!({ "status": status }))
            }

            _ => Err(Error::not_found(format!("Unknown tool method: {}", method))),
        }
    }
}
