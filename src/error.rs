//! Error types for pagesim using thiserror

use alloc::string::String;
use thiserror::Error;

use crate::types::{FrameNumber, VirtualAddress, VirtualPage};

/// Result type for memory-system operations
pub type Result<T> = core::result::Result<T, VmError>;

/// Errors reported by translation, fault handling and persistence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Virtual address maps to a page beyond the page table
    #[error("virtual address {address} is out of range ({page})")]
    AddressOutOfRange {
        address: VirtualAddress,
        page: VirtualPage,
    },

    /// Page number beyond the page table
    #[error("{0} is out of range")]
    PageOutOfRange(VirtualPage),

    /// A fault found no free frame
    #[error("physical memory is full, cannot fault in {page}")]
    PhysicalMemoryFull { page: VirtualPage },

    /// The frame allocator has no frames left
    #[error("out of physical frames")]
    OutOfMemory,

    /// A frame handed back that was not allocated
    #[error("{0} cannot be released: it is not allocated")]
    BadRelease(FrameNumber),

    /// Computed physical address outside physical memory
    #[error("physical address {address} is out of range")]
    PhysicalAddressOutOfRange { address: usize },

    /// Backing-store or snapshot medium unavailable
    #[error("I/O error: {0}")]
    Io(String),

    /// Snapshot blob that cannot be loaded
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Backing page whose stored size is not one page
    #[error("corrupt backing page for {page}: {len} bytes")]
    CorruptBackingPage { page: VirtualPage, len: usize },
}

#[cfg(feature = "std")]
impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Io(err.to_string())
    }
}

/// Configuration errors
#[cfg(feature = "std")]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid log level: {0}")]
    LogLevel(String),
}
