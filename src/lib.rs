//! SyncView - incremental, tree-aware index of out-of-sync resources.
//!
//! This crate provides the engine behind the `syncview` CLI.
//!
//! # Architecture
//!
//! - [`model`] - Resource paths, sync kinds, sync infos, model elements
//! - [`syncset`] - The `SyncSet` index with ancestor rollup and batched change events
//! - [`filter`] - Predicates over sync infos and their serializable description
//! - [`source`] - Sync sources (directory comparison, in-memory) and change deltas
//! - [`input`] - Stages that keep a `SyncSet` current: subscriber, working set, derived
//! - [`view`] - The workspace, working-set and display-filter composite
//! - [`views`] - One view per registered source, with one active
//! - [`jobs`] - Cancellation, worker pool and the change-processing thread
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod input;
pub mod jobs;
pub mod model;
pub mod source;
pub mod syncset;
pub mod validate;
pub mod view;
pub mod views;

pub use error::{Error, Result};
