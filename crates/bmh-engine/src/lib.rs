//! The running BookMyHelper engine.
//!
//! [`Engine`] owns the ledger behind a single async mutex so that manual
//! transitions, dispatch passes and bulk clears never interleave. Every
//! mutation hands a snapshot to a background writer; [`dispatcher`] drives
//! periodic auto-assignment.

pub mod dispatcher;
pub mod engine;
mod persist;

pub use dispatcher::{DEFAULT_PERIOD, DispatchHandle};
pub use engine::Engine;
