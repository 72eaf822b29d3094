//! Storage abstraction and implementations for shipments.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! backend for real use and an in-memory backend for tests and scratch runs.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{Storage, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
