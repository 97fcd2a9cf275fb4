//! TCP+msgpack RPC transport.
//!
//! Length-prefixed msgpack frames carry `{id, service, method, body}`
//! requests and `{id, ok, body|error}` responses. The same transport fronts
//! both the orchestrator's public surface and every tool adapter process.

pub mod client;
pub mod codec;
pub mod dispatch;
pub mod server;

pub use client::IpcClient;
pub use dispatch::Dispatch;
pub use server::IpcServer;
