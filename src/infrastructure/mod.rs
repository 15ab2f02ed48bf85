//! Adapters behind the domain ports: stores and payment providers.

pub mod in_memory;
pub mod payment;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
