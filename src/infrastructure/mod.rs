//! Adapters implementing the domain ports.

pub mod account_number;
pub mod in_memory;
pub mod publisher;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
