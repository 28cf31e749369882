//! Data models for SyncView.
//!
//! - `ResourcePath` / `ResourceType`: normalized tree addressing
//! - `SyncKind`: direction and change-type bitmask
//! - `SyncInfo`: immutable sync state of one resource
//! - `ModelElement`: what consumers render

pub mod element;
pub mod info;
pub mod kind;
pub mod path;

pub use element::ModelElement;
pub use info::SyncInfo;
pub use kind::SyncKind;
pub use path::{ResourcePath, ResourceType};
