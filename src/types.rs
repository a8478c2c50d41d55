//! Common types used across pagesim
//!
//! Addresses and page/frame numbers are kept as distinct newtypes so a
//! frame number can never be passed where a virtual page is expected.

use core::fmt;

use crate::vm::vm_param::{PAGE_SHIFT, PAGE_SIZE};

/// Address in the simulated process's logical address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualAddress(pub u32);

impl VirtualAddress {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Virtual page containing this address
    pub const fn page(self) -> VirtualPage {
        VirtualPage(self.0 >> PAGE_SHIFT)
    }

    /// Byte offset within the containing page
    pub const fn offset(self) -> usize {
        (self.0 as usize) & (PAGE_SIZE - 1)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual page number (index into the page table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualPage(pub u32);

impl VirtualPage {
    pub const fn new(page: u32) -> Self {
        Self(page)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// First virtual address of this page
    ///
    /// `None` if the page lies beyond the 32-bit address space.
    pub const fn base(self) -> Option<VirtualAddress> {
        match self.0.checked_mul(PAGE_SIZE as u32) {
            Some(addr) => Some(VirtualAddress(addr)),
            None => None,
        }
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// Physical frame number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameNumber(pub u32);

impl FrameNumber {
    pub const fn new(frame: u32) -> Self {
        Self(frame)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// First physical address of this frame
    ///
    /// `None` if the frame lies beyond the 32-bit address space.
    pub const fn base(self) -> Option<PhysicalAddress> {
        match self.0.checked_mul(PAGE_SIZE as u32) {
            Some(addr) => Some(PhysicalAddress(addr)),
            None => None,
        }
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

/// Address inside the physical memory array
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysicalAddress(pub u32);

impl PhysicalAddress {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Frame containing this address
    pub const fn frame(self) -> FrameNumber {
        FrameNumber(self.0 >> PAGE_SHIFT)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
