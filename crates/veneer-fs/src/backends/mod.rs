//! File source backends.
//!
//! Backends implement [`FileSource`](crate::FileSource) for different storage types.

mod disk;
mod memory;

pub use disk::DiskSource;
pub use memory::MemorySource;
