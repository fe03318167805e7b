#![forbid(unsafe_code)]

pub mod catalog_file;
pub mod remote;
pub mod repository;
pub mod sqlite;

pub use repository::{KeyValueStore, Storage, StorageError};
