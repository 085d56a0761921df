//! Simbase API integration module
//!
//! - `client`: REST API client (bearer token, 10s timeout, error mapping)
//! - `coordinator`: periodically refreshed snapshots (fleet, balance)
//! - `context`: per-account setup/teardown and the operations built on it
//! - `webhook`: inbound SMS push handling

pub mod client;
pub mod context;
pub mod coordinator;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{SimbaseApi, SimbaseClient};
pub use context::SimbaseContext;
