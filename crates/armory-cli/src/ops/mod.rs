//! Shared state for network-backed commands.

pub mod context;

pub use context::Context;
