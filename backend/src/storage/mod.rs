//! Durable key-value storage for the server

pub mod file_store;

pub use file_store::FileStore;
