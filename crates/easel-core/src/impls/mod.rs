//! Impls - in-process implementations of the ports.
//!
//! # Included
//! - **InMemoryTaskStore**: task records kept as JSON snapshots
//! - **TimeoutDispatcher**: bounds every remote call of an inner dispatcher
//!
//! Backend clients (HTTP, websocket gateway) live outside the core crate.

pub mod memory_store;
pub mod timeout;

pub use self::memory_store::InMemoryTaskStore;
pub use self::timeout::TimeoutDispatcher;
