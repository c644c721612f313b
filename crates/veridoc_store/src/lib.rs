//! # VeriDoc Store
//!
//! Live, mutable, versioned item store for VeriDoc.
//!
//! This crate provides:
//! - [`ItemStore`]: a named store of tree-structured, multilingual,
//!   multi-versioned items
//! - [`TemplateEngine`]: the store-owned template service with an
//!   invalidatable cache
//! - [`ItemEdit`]: scoped edit transactions that commit exactly once on
//!   every exit path
//! - [`ItemCaches`]: item/data caches with explicit post-commit
//!   invalidation
//! - [`EventPipeline`]: change notifications with scoped suppression and
//!   a remote delivery queue
//! - [`TrailStore`]: analytics-trail tables with batched truncation
//! - [`StoreRegistry`]: name-based store resolution

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod events;
mod field;
mod item;
mod registry;
mod stats;
mod store;
mod template;
mod trail;

pub use cache::{ItemCaches, ItemInfo};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use events::{EventPipeline, EventScope, ItemEvent, ItemEventKind};
pub use field::{FieldKind, FieldValue};
pub use item::{new_revision, ItemVersion, LiveItem, VersionKey};
pub use registry::StoreRegistry;
pub use stats::StoreStats;
pub use store::{ItemEdit, ItemStore};
pub use template::{Template, TemplateEngine, TemplateField};
pub use trail::{truncate_trails, TrailRow, TrailStore};
