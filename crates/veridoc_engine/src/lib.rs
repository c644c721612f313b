//! # VeriDoc Engine
//!
//! Synchronization engine and load orchestrator for VeriDoc.
//!
//! This crate provides:
//! - [`paste_sync_item`] / [`build_sync_item`]: reconciliation of a
//!   serialized item against a live store — creation, moves, template
//!   changes, field updates and stale-version pruning, with idempotent,
//!   partial-failure-tolerant semantics
//! - [`load_item`]: the file-driven entry point with event suppression,
//!   failure classification and the post-load completion notification
//! - [`read_item`] / [`write_item`]: text-format glue around the engine
//! - [`JobStatus`] / [`JobScope`]: background-job message routing for the
//!   orchestrator's log output
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use veridoc_engine::{load_item, LoadOptions};
//! use veridoc_store::{ItemStore, StoreRegistry};
//!
//! # fn main() -> Result<(), veridoc_engine::EngineError> {
//! let registry = StoreRegistry::new();
//! registry.register(Arc::new(ItemStore::new("master")));
//!
//! let options = LoadOptions::new().with_disable_events(true);
//! let loaded = load_item(&registry, Path::new("master/content/home.item"), &options)?;
//! # let _ = loaded;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod job;
mod load;
mod options;
mod sync;

pub use error::{EngineError, EngineResult};
pub use job::{current_job, log_error, log_info, JobScope, JobStatus};
pub use load::{item_handler_disabled, load_item};
pub use options::LoadOptions;
pub use sync::{build_sync_item, paste_sync_item, read_item, write_item};
