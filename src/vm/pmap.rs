//! Physical Map (pmap) - The Page Table
//!
//! One entry per virtual page, indexed by virtual page number. An entry is
//! either absent or resident in exactly one frame; the frame number only
//! exists for resident entries, so an absent entry can never be
//! dereferenced by mistake.
//!
//! Entries are installed by the fault handler and never removed: this
//! system has no eviction.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Result, VmError};
use crate::types::{FrameNumber, VirtualPage};
use crate::vm::vm_param::{FRAME_COUNT, NO_FRAME, VIRTUAL_PAGES};

// ============================================================================
// Page Table Entry
// ============================================================================

/// Page table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageTableEntry {
    frame: Option<FrameNumber>,
}

impl PageTableEntry {
    /// Entry with no frame
    pub const ABSENT: Self = Self { frame: None };

    /// Entry resident in `frame`
    pub const fn resident(frame: FrameNumber) -> Self {
        Self { frame: Some(frame) }
    }

    /// Is the page resident?
    pub const fn present(&self) -> bool {
        self.frame.is_some()
    }

    /// Frame holding the page, if resident
    pub const fn frame(&self) -> Option<FrameNumber> {
        self.frame
    }

    /// Raw `(present, frame_number)` pair as stored in snapshot images
    pub fn to_raw(&self) -> (i32, i32) {
        match self.frame {
            Some(frame) => (1, frame.0 as i32),
            None => (0, NO_FRAME),
        }
    }

    /// Decode a raw `(present, frame_number)` pair
    ///
    /// `present` must be 0 or 1. An absent entry's frame field is ignored;
    /// a present entry must name a frame in `[0, FRAME_COUNT)`.
    pub fn from_raw(present: i32, frame: i32) -> Result<Self> {
        match present {
            0 => return Ok(Self::ABSENT),
            1 => {}
            other => {
                return Err(VmError::CorruptSnapshot(format!(
                    "present flag is {}, expected 0 or 1",
                    other
                )))
            }
        }
        if frame < 0 || frame as usize >= FRAME_COUNT {
            return Err(VmError::CorruptSnapshot(format!(
                "present entry names frame {}",
                frame
            )));
        }
        Ok(Self::resident(FrameNumber(frame as u32)))
    }
}

// ============================================================================
// Page Table
// ============================================================================

/// The page table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    entries: Box<[PageTableEntry]>,
}

impl PageTable {
    /// Create a page table with every entry absent
    pub fn new() -> Self {
        Self {
            entries: vec![PageTableEntry::ABSENT; VIRTUAL_PAGES].into_boxed_slice(),
        }
    }

    /// Build a page table from a full entry sequence
    ///
    /// Rejects a sequence of the wrong length or one in which two present
    /// entries share a frame.
    pub fn from_entries(entries: Vec<PageTableEntry>) -> Result<Self> {
        if entries.len() != VIRTUAL_PAGES {
            return Err(VmError::CorruptSnapshot(format!(
                "page table has {} entries, expected {}",
                entries.len(),
                VIRTUAL_PAGES
            )));
        }

        let mut seen = BTreeSet::new();
        for (index, entry) in entries.iter().enumerate() {
            if let Some(frame) = entry.frame() {
                if frame.index() >= FRAME_COUNT {
                    return Err(VmError::CorruptSnapshot(format!(
                        "page {} maps {} beyond physical memory",
                        index, frame
                    )));
                }
                if !seen.insert(frame) {
                    return Err(VmError::CorruptSnapshot(format!(
                        "{} is mapped by more than one page (again by page {})",
                        frame, index
                    )));
                }
            }
        }

        Ok(Self {
            entries: entries.into_boxed_slice(),
        })
    }

    /// Look up the entry for a virtual page
    pub fn lookup(&self, page: VirtualPage) -> Result<PageTableEntry> {
        self.entries
            .get(page.index())
            .copied()
            .ok_or(VmError::PageOutOfRange(page))
    }

    /// Record that `page` is resident in `frame`
    ///
    /// The caller must have just taken `frame` from the frame allocator.
    pub(crate) fn mark_present(&mut self, page: VirtualPage, frame: FrameNumber) -> Result<()> {
        let entry = self
            .entries
            .get_mut(page.index())
            .ok_or(VmError::PageOutOfRange(page))?;
        debug_assert!(!entry.present(), "{} is already resident", page);
        *entry = PageTableEntry::resident(frame);
        Ok(())
    }

    /// All entries in page order
    pub fn entries(&self) -> impl Iterator<Item = (VirtualPage, PageTableEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (VirtualPage(index as u32), *entry))
    }

    /// Resident pages and their frames, in page order
    pub fn resident(&self) -> impl Iterator<Item = (VirtualPage, FrameNumber)> + '_ {
        self.entries()
            .filter_map(|(page, entry)| entry.frame().map(|frame| (page, frame)))
    }

    /// Frames referenced by present entries
    pub fn present_frames(&self) -> BTreeSet<FrameNumber> {
        self.resident().map(|(_, frame)| frame).collect()
    }

    /// Number of present entries
    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.present()).count()
    }

    /// Number of entries (always `VIRTUAL_PAGES`)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; the table has a fixed, non-zero length
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}
