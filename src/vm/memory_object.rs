//! Memory Objects - Backing Store for Virtual Pages
//!
//! A memory object holds the canonical contents of every virtual page that
//! has ever been touched. The fault handler only talks to the
//! [`MemoryObject`] trait, so the medium can be swapped freely:
//!
//! - [`AnonymousPager`]: pages kept in memory (tests, `no_std` builds)
//! - [`DirectoryPager`]: one file per page in a directory (`std` only)
//!
//! Every implementation creates an all-zero page the first time a page is
//! read, then serves that page from then on.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use crate::error::Result;
use crate::types::VirtualPage;
use crate::vm::vm_param::PAGE_SIZE;

/// Contents of one page
pub type PageData = Box<[u8; PAGE_SIZE]>;

/// Allocate a zero-filled page buffer
pub fn zeroed_page() -> PageData {
    Box::new([0u8; PAGE_SIZE])
}

/// Per-page durable storage
pub trait MemoryObject {
    /// Read a full page, creating it as all zeros if it does not exist
    fn read_page(&mut self, page: VirtualPage) -> Result<PageData>;

    /// Overwrite a full page
    fn write_page(&mut self, page: VirtualPage, data: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Does a backing page exist for `page`?
    fn contains(&self, page: VirtualPage) -> bool;
}

// ============================================================================
// Anonymous Pager
// ============================================================================

/// In-memory backing store
#[derive(Debug, Clone, Default)]
pub struct AnonymousPager {
    pages: BTreeMap<VirtualPage, PageData>,
}

impl AnonymousPager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of backing pages created so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Stored contents of a page, without creating it
    pub fn peek(&self, page: VirtualPage) -> Option<&[u8; PAGE_SIZE]> {
        self.pages.get(&page).map(|data| &**data)
    }
}

impl MemoryObject for AnonymousPager {
    fn read_page(&mut self, page: VirtualPage) -> Result<PageData> {
        Ok(self.pages.entry(page).or_insert_with(zeroed_page).clone())
    }

    fn write_page(&mut self, page: VirtualPage, data: &[u8; PAGE_SIZE]) -> Result<()> {
        self.pages.insert(page, Box::new(*data));
        Ok(())
    }

    fn contains(&self, page: VirtualPage) -> bool {
        self.pages.contains_key(&page)
    }
}

// ============================================================================
// Directory Pager
// ============================================================================

#[cfg(feature = "std")]
pub use self::directory::DirectoryPager;

#[cfg(feature = "std")]
mod directory {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use log::debug;

    use super::{zeroed_page, MemoryObject, PageData};
    use crate::error::{Result, VmError};
    use crate::file_io::write_atomic;
    use crate::types::VirtualPage;
    use crate::vm::vm_param::PAGE_SIZE;

    /// Backing store with one `page_<n>.bin` file per virtual page
    #[derive(Debug, Clone)]
    pub struct DirectoryPager {
        root: PathBuf,
    }

    impl DirectoryPager {
        /// Open (and create if needed) a backing directory
        pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
            let root = root.into();
            fs::create_dir_all(&root)?;
            Ok(Self { root })
        }

        /// Backing directory
        pub fn root(&self) -> &Path {
            &self.root
        }

        /// File holding a page
        pub fn page_path(&self, page: VirtualPage) -> PathBuf {
            self.root.join(format!("page_{}.bin", page.0))
        }

        /// Number of backing page files in the directory
        pub fn page_count(&self) -> Result<usize> {
            let mut count = 0;
            for entry in fs::read_dir(&self.root)? {
                let name = entry?.file_name();
                let name = name.to_string_lossy();
                if name.starts_with("page_") && name.ends_with(".bin") {
                    count += 1;
                }
            }
            Ok(count)
        }
    }

    impl MemoryObject for DirectoryPager {
        fn read_page(&mut self, page: VirtualPage) -> Result<PageData> {
            let path = self.page_path(page);
            match fs::read(&path) {
                Ok(bytes) => {
                    let len = bytes.len();
                    bytes
                        .into_boxed_slice()
                        .try_into()
                        .map_err(|_| VmError::CorruptBackingPage { page, len })
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    let data = zeroed_page();
                    write_atomic(&path, &data[..])?;
                    debug!("created backing page {}", path.display());
                    Ok(data)
                }
                Err(e) => Err(e.into()),
            }
        }

        fn write_page(&mut self, page: VirtualPage, data: &[u8; PAGE_SIZE]) -> Result<()> {
            write_atomic(&self.page_path(page), &data[..])
        }

        fn contains(&self, page: VirtualPage) -> bool {
            self.page_path(page).is_file()
        }
    }
}
