//! VM Fault - Page Fault Handling
//!
//! A fault brings a non-resident virtual page into physical memory:
//!
//! 1. take a free frame from the frame allocator
//! 2. read the page from the memory object (zero-filled on first touch)
//! 3. copy the page into the frame
//! 4. mark the page-table entry present
//!
//! The page table is only updated once the frame holds the page, and a
//! fault that fails leaves physical memory, the page table and the free
//! frame set as they were. Nothing is retried.

use log::{debug, warn};

use crate::error::{Result, VmError};
use crate::types::{FrameNumber, VirtualPage};
use crate::vm::memory_object::MemoryObject;
use crate::vm::vm_param::PAGE_SIZE;
use crate::vm::VmSystem;

// ============================================================================
// Fault Statistics
// ============================================================================

/// Fault statistics counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Faults taken
    pub total: u64,
    /// Faults that installed a page
    pub serviced: u64,
    /// Serviced faults that created the backing page
    pub zero_fill: u64,
    /// Faults that failed
    pub failures: u64,
}

impl FaultStats {
    pub const fn new() -> Self {
        Self {
            total: 0,
            serviced: 0,
            zero_fill: 0,
            failures: 0,
        }
    }

    fn incr_total(&mut self) {
        self.total += 1;
    }

    fn incr_serviced(&mut self, zero_fill: bool) {
        self.serviced += 1;
        if zero_fill {
            self.zero_fill += 1;
        }
    }

    fn incr_failures(&mut self) {
        self.failures += 1;
    }
}

// ============================================================================
// Page Fault Handling
// ============================================================================

impl<M: MemoryObject> VmSystem<M> {
    /// Bring `page` into physical memory and return its frame
    ///
    /// A page that is already resident is returned as is, without taking a
    /// frame.
    pub fn handle_fault(&mut self, page: VirtualPage) -> Result<FrameNumber> {
        if let Some(frame) = self.page_table.lookup(page)?.frame() {
            return Ok(frame);
        }

        self.stats.incr_total();

        let frame = match self.frames.allocate() {
            Ok(frame) => frame,
            Err(_) => {
                self.stats.incr_failures();
                warn!("page fault on {}: no free frames", page);
                return Err(VmError::PhysicalMemoryFull { page });
            }
        };

        let zero_fill = !self.pager.contains(page);
        match self.install_page(page, frame) {
            Ok(()) => {
                self.stats.incr_serviced(zero_fill);
                debug!(
                    "page fault on {}: loaded into {}{}",
                    page,
                    frame,
                    if zero_fill { " (zero-filled)" } else { "" }
                );
                Ok(frame)
            }
            Err(e) => {
                if let Err(release) = self.frames.release(frame) {
                    warn!("page fault on {}: {}", page, release);
                }
                self.stats.incr_failures();
                warn!("page fault on {}: {}", page, e);
                Err(e)
            }
        }
    }

    /// Fill `frame` from the memory object, then map `page` to it
    fn install_page(&mut self, page: VirtualPage, frame: FrameNumber) -> Result<()> {
        let data = self.pager.read_page(page)?;

        let slot = self
            .memory
            .frame_mut(frame)
            .ok_or(VmError::PhysicalAddressOutOfRange {
                address: frame.index().saturating_mul(PAGE_SIZE),
            })?;
        slot.copy_from_slice(&data[..]);

        self.page_table.mark_present(page, frame)
    }
}
