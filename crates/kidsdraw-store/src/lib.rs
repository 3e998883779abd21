//! kidsdraw-store: persistence and sharing for kidsdraw artwork.
//!
//! - [`ImageStore`] keeps originals, converted sketches, and scratch
//!   files as JPEGs under one root directory, plus a JSON record per
//!   saved artwork.
//! - [`codec`] encodes bitmaps as JPEG or PNG.
//! - [`share`] lays out an original and its sketch on one share card.

pub mod codec;
mod error;
pub mod share;
mod store;

pub use error::StoreError;
pub use share::{ShareLayout, compose_share_image};
pub use store::{ArtworkRecord, ArtworkSettings, ImageDirectory, ImageStore, StoreConfig};
