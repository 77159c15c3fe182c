//! Document storage for Palette Forge
//!
//! This crate provides the byte-level storage collaborator used to read
//! configuration documents and to load and save preset files.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod persistence;

pub use persistence::{
    DocumentStore, FileStore, FileStoreConfig, MemoryStore, Result, StorageError,
};
