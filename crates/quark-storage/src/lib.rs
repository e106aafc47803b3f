//! Quark Storage - Key-value backends and copy-on-write overlays.
//!
//! The persistent store belongs to the host. The VM only needs ordered point
//! reads, bounded scans and atomic batch writes, captured by the traits in
//! [`db`].

pub mod db;
pub mod error;
pub mod memory;
pub mod file_db;
pub mod overlay;

pub use db::{Database, KeyValueRead, KeyValueWrite, WriteBatch};
pub use error::StorageError;
pub use memory::MemoryDatabase;
pub use file_db::FileDatabase;
pub use overlay::Overlay;
