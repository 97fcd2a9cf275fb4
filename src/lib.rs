//! # Switchboard - Tool Orchestration Layer
//!
//! A uniform remote-call surface over a dynamically discovered set of
//! independently running worker processes ("tools"), plus an asynchronous
//! human-input path for tools that cannot complete without an out-of-band
//! operator decision.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► RPC / HTTP surface ──► ToolRouter ──► ToolRegistry
//!                                        │               ▲
//!                                        │               │ health ticks
//!                                        ▼               │
//!                                  tool adapters ◄── Supervisor (spawn,
//!                                  (Describe/Run/        dial w/ retry)
//!                                   HealthCheck)
//!
//!   human_input tool ──► Broadcast Hub ──► connected operator clients
//!   operator ──► ProvideHumanInput ──► TaskStore ◄── GetHumanInput (poll)
//! ```
//!
//! The registry, the task store, and the hub connection set are each guarded
//! by their own lock; no operation ever holds two of them at once.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod broker;
pub mod gateway;
pub mod hub;
pub mod ipc;
pub mod registry;
pub mod router;
pub mod supervisor;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
