//! Core types and the booking state machine for BookMyHelper.
//!
//! This crate is deliberately free of I/O, async runtimes and logging. The
//! engine, storage and HTTP crates all build on it.

pub mod audit;
pub mod booking;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod provider;
pub mod snapshot;
pub mod specialty;
pub mod store;

pub use error::{Error, Result};
