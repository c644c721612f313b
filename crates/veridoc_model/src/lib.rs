//! # VeriDoc Model
//!
//! Serialized document model and text codec for VeriDoc.
//!
//! This crate provides:
//! - [`SerializedItem`], [`SyncVersion`] and [`SyncField`]: the in-memory
//!   representation of one content item with all its language/version
//!   field sets, independent of any live store
//! - [`encode`] / [`decode`]: the line-oriented, block-structured text
//!   format the items travel in
//! - [`encode_blob`] / [`decode_blob`]: Base64 transport for binary field
//!   values
//!
//! ## Usage
//!
//! ```
//! use veridoc_model::{decode, encode, ItemId, SerializedItem};
//!
//! let mut item = SerializedItem::new(
//!     ItemId::new(),
//!     ItemId::new(),
//!     "master",
//!     "Home",
//!     ItemId::new(),
//! );
//! item.add_shared_field(ItemId::new(), "Title", "title", "Home");
//!
//! let text = encode(&item);
//! let decoded = decode(&text).unwrap();
//! assert_eq!(decoded, item);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod id;
mod item;
pub mod well_known;

pub use codec::{decode, decode_blob, encode, encode_blob};
pub use error::{CodecError, CodecResult};
pub use id::ItemId;
pub use item::{InvalidItem, SerializedItem, SyncField, SyncVersion};
