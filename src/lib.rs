//! pagesim - a demand-paged virtual memory simulator
//!
//! Virtual addresses are translated through a single page table into a
//! small, fixed-size physical memory. Pages that are not resident are
//! faulted in on first touch: a free frame is taken from the frame
//! allocator and filled from the page's backing store, which creates an
//! all-zero page the first time a page is referenced.
//!
//! The core (`types`, `error`, `vm`) only needs `alloc`. Snapshot files,
//! the directory-backed pager, configuration and logging need the `std`
//! feature, which is on by default.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

// Core types
pub mod error;
pub mod types;

// Address translation and fault handling
pub mod vm;

// Host-side components
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod file_io;
#[cfg(feature = "std")]
pub mod logging;
#[cfg(feature = "std")]
pub mod snapshot;

pub use error::{Result, VmError};
pub use types::{FrameNumber, PhysicalAddress, VirtualAddress, VirtualPage};
pub use vm::{Access, AnonymousPager, FrameAllocator, MemoryObject, PageTable, PageTableEntry};
pub use vm::{PhysicalMemory, VmStatus, VmSystem};

#[cfg(feature = "std")]
pub use vm::DirectoryPager;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Program name
pub const NAME: &str = "pagesim";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(NAME, "pagesim");
        assert!(!VERSION.is_empty());
    }
}
