//! VM Page Management - Physical Memory and Free Frames
//!
//! Physical memory is one contiguous byte array of `FRAME_COUNT` frames.
//! The frame allocator owns the free frame set; it knows nothing about
//! virtual pages, only frame indices.
//!
//! ## Allocation order
//!
//! Free frames are kept on a fixed-capacity stack seeded in descending
//! order, so `allocate` always hands out the lowest free frame. A freshly
//! initialized allocator therefore returns frame 0, then 1, then 2, ...

use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;
use heapless::Vec as FrameStack;
use log::trace;

use crate::error::{Result, VmError};
use crate::types::{FrameNumber, PhysicalAddress};
use crate::vm::vm_param::{FRAME_COUNT, PAGE_SIZE, PHYSICAL_SIZE};

// ============================================================================
// Physical Memory
// ============================================================================

/// The physical memory array
#[derive(Clone, PartialEq, Eq)]
pub struct PhysicalMemory {
    bytes: Vec<u8>,
}

impl PhysicalMemory {
    /// Create zero-filled physical memory
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; PHYSICAL_SIZE],
        }
    }

    /// Adopt a full memory image
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != PHYSICAL_SIZE {
            return Err(VmError::CorruptSnapshot(alloc::format!(
                "physical memory image is {} bytes, expected {}",
                bytes.len(),
                PHYSICAL_SIZE
            )));
        }
        Ok(Self { bytes })
    }

    /// Whole memory image
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Contents of one frame
    pub fn frame(&self, frame: FrameNumber) -> Option<&[u8; PAGE_SIZE]> {
        let start = frame.base()?.as_usize();
        self.bytes
            .get(start..start.checked_add(PAGE_SIZE)?)?
            .try_into()
            .ok()
    }

    pub(crate) fn frame_mut(&mut self, frame: FrameNumber) -> Option<&mut [u8; PAGE_SIZE]> {
        let start = frame.base()?.as_usize();
        self.bytes
            .get_mut(start..start.checked_add(PAGE_SIZE)?)?
            .try_into()
            .ok()
    }

    /// Byte at a physical address
    pub fn get(&self, addr: PhysicalAddress) -> Option<&u8> {
        self.bytes.get(addr.as_usize())
    }

    pub(crate) fn get_mut(&mut self, addr: PhysicalAddress) -> Option<&mut u8> {
        self.bytes.get_mut(addr.as_usize())
    }
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PhysicalMemory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let nonzero = self.bytes.iter().filter(|&&b| b != 0).count();
        f.debug_struct("PhysicalMemory")
            .field("size", &self.bytes.len())
            .field("nonzero_bytes", &nonzero)
            .finish()
    }
}

// ============================================================================
// Frame Allocator
// ============================================================================

/// Free frame set
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    /// Free frames, lowest on top
    free: FrameStack<FrameNumber, FRAME_COUNT>,
    /// Frames under management
    total: usize,
}

impl FrameAllocator {
    /// Create an allocator with every frame free
    pub fn new() -> Self {
        let mut allocator = Self {
            free: FrameStack::new(),
            total: 0,
        };
        allocator.initialize(FRAME_COUNT, &BTreeSet::new());
        allocator
    }

    /// Seed the free set with `total_frames` minus `already_used`
    ///
    /// Used at startup to reconcile with a loaded page table. A
    /// `total_frames` above `FRAME_COUNT` is clamped.
    pub fn initialize(&mut self, total_frames: usize, already_used: &BTreeSet<FrameNumber>) {
        self.total = total_frames.min(FRAME_COUNT);
        self.free.clear();

        for n in (0..self.total as u32).rev() {
            let frame = FrameNumber(n);
            if !already_used.contains(&frame) {
                // Capacity is FRAME_COUNT and total never exceeds it
                let _ = self.free.push(frame);
            }
        }
    }

    /// Take the lowest free frame
    pub fn allocate(&mut self) -> Result<FrameNumber> {
        let frame = self.free.pop().ok_or(VmError::OutOfMemory)?;
        trace!("allocated {}, {} free", frame, self.free.len());
        Ok(frame)
    }

    /// Return a frame taken by the last `allocate`
    ///
    /// Only used to roll back a fault that could not be completed, so the
    /// frame goes back on top of the stack where it came from. A frame
    /// outside the managed range or already free is refused.
    pub(crate) fn release(&mut self, frame: FrameNumber) -> Result<()> {
        if frame.index() >= self.total || self.is_free(frame) {
            return Err(VmError::BadRelease(frame));
        }
        self.free.push(frame).map_err(VmError::BadRelease)
    }

    /// Number of free frames
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of frames under management
    pub fn total_frames(&self) -> usize {
        self.total
    }

    /// Number of frames handed out
    pub fn used_count(&self) -> usize {
        self.total - self.free.len()
    }

    /// Check if a frame is free
    pub fn is_free(&self, frame: FrameNumber) -> bool {
        self.free.contains(&frame)
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}
