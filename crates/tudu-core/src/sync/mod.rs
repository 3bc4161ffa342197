//! Reconciliation of the local store with the server.
//!
//! The server is reached through the [`Remote`] trait; [`memory`] provides an
//! in-process implementation for tests and benchmarks.

pub mod memory;
pub mod reconcile;
pub mod remap;
pub mod remote;
pub mod seed;

pub use reconcile::{
    FailedEntity, Operation, ReconcileOptions, ReconcileReport, Reconciler, RemoteErrorView,
};
pub use remap::RemapTable;
pub use remote::{Remote, RemoteError};
pub use seed::{Origin, load_or_seed, seed};
