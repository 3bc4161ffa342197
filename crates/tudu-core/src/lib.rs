//! tudu-core: local-first lists and todos.
//!
//! The [`store::LocalStore`] holds the working copy of every list and item
//! together with its sync state. [`sync::Reconciler`] drains pending changes
//! against any [`sync::Remote`] in one explicit pass: lists first, then items,
//! with placeholder ids remapped in between.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums carrying an [`error::ErrorCode`];
//!   `anyhow::Result` only at the config layer.
//! - **Logging**: `tracing` macros (`debug!` per dispatch, `info!` per
//!   confirmed mutation, `warn!` per failure).

pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod store;
pub mod sync;
