//! Memory geometry
//!
//! Page size and the sizes of the physical and virtual address spaces.
//! Everything else (frame count, page-table length) is derived from them.

/// Page size (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page shift (log2 of PAGE_SIZE)
pub const PAGE_SHIFT: u32 = 12;

/// Size of physical memory (256KB)
pub const PHYSICAL_SIZE: usize = 256 * 1024;

/// Number of physical frames
pub const FRAME_COUNT: usize = PHYSICAL_SIZE / PAGE_SIZE;

/// Size of the virtual address space (1MB)
pub const VIRTUAL_SIZE: usize = 1024 * 1024;

/// Number of virtual pages (page-table length)
pub const VIRTUAL_PAGES: usize = VIRTUAL_SIZE / PAGE_SIZE;

/// Frame number stored for absent entries in snapshot images
pub const NO_FRAME: i32 = -1;

const _: () = assert!(1 << PAGE_SHIFT == PAGE_SIZE);
const _: () = assert!(PHYSICAL_SIZE % PAGE_SIZE == 0);
const _: () = assert!(VIRTUAL_SIZE % PAGE_SIZE == 0);
