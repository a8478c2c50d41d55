//! Virtual Memory Subsystem
//!
//! Provides demand-paged translation over a fixed physical memory:
//! - vm_param: geometry constants
//! - vm_page: physical memory and the free frame allocator
//! - pmap: the page table
//! - memory_object: backing store for virtual pages
//! - vm_fault: page fault handling
//! - vm_map: virtual to physical address translation
//! - vm_pageout: explicit write-back of resident frames
//!
//! [`VmSystem`] owns one instance of each piece. There is a single
//! address space and frames are never reclaimed once handed out.

pub mod memory_object;
pub mod pmap;
pub mod vm_fault;
pub mod vm_map;
pub mod vm_page;
pub mod vm_pageout;
pub mod vm_param;

pub use memory_object::{zeroed_page, AnonymousPager, MemoryObject, PageData};
pub use pmap::{PageTable, PageTableEntry};
pub use vm_fault::FaultStats;
pub use vm_map::Access;
pub use vm_page::{FrameAllocator, PhysicalMemory};

#[cfg(feature = "std")]
pub use memory_object::DirectoryPager;

use vm_param::FRAME_COUNT;

/// Point-in-time summary of a [`VmSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmStatus {
    /// Pages with a frame
    pub resident_pages: usize,
    /// Frames still available for faults
    pub free_frames: usize,
    /// Frames under management
    pub total_frames: usize,
    /// Fault counters since construction
    pub faults: FaultStats,
}

/// A single address space with its physical memory and backing store
#[derive(Debug)]
pub struct VmSystem<M: MemoryObject> {
    memory: PhysicalMemory,
    page_table: PageTable,
    frames: FrameAllocator,
    pager: M,
    stats: FaultStats,
}

impl<M: MemoryObject> VmSystem<M> {
    /// Fresh system: empty page table, zeroed memory, every frame free
    pub fn new(pager: M) -> Self {
        Self {
            memory: PhysicalMemory::new(),
            page_table: PageTable::new(),
            frames: FrameAllocator::new(),
            pager,
            stats: FaultStats::new(),
        }
    }

    /// Rebuild a system from a saved page table and memory image
    ///
    /// Frames referenced by the page table are taken out of the free set.
    pub fn from_parts(page_table: PageTable, memory: PhysicalMemory, pager: M) -> Self {
        let mut frames = FrameAllocator::new();
        frames.initialize(FRAME_COUNT, &page_table.present_frames());

        Self {
            memory,
            page_table,
            frames,
            pager,
            stats: FaultStats::new(),
        }
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn physical_memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn frames(&self) -> &FrameAllocator {
        &self.frames
    }

    pub fn pager(&self) -> &M {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut M {
        &mut self.pager
    }

    pub fn stats(&self) -> &FaultStats {
        &self.stats
    }

    /// Take the system apart, e.g. to persist it
    pub fn into_parts(self) -> (PageTable, PhysicalMemory, M) {
        (self.page_table, self.memory, self.pager)
    }

    pub fn status(&self) -> VmStatus {
        VmStatus {
            resident_pages: self.page_table.resident_count(),
            free_frames: self.frames.free_count(),
            total_frames: self.frames.total_frames(),
            faults: self.stats,
        }
    }
}

impl Default for VmSystem<AnonymousPager> {
    fn default() -> Self {
        Self::new(AnonymousPager::new())
    }
}
