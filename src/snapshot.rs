//! Snapshot I/O
//!
//! The page table and physical memory are persisted between runs as two
//! flat blobs:
//!
//! - page table: `VIRTUAL_PAGES` entries of 8 bytes, a little-endian `i32`
//!   present flag (0 or 1) followed by a little-endian `i32` frame number
//!   (-1 when absent)
//! - physical memory: the raw `PHYSICAL_SIZE` bytes
//!
//! A missing blob loads as the empty default. Saves go through a temporary
//! sibling file that is renamed over the target.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Result, VmError};
use crate::file_io::{read_optional, write_atomic};
use crate::vm::vm_param::VIRTUAL_PAGES;
use crate::vm::{MemoryObject, PageTable, PageTableEntry, PhysicalMemory, VmSystem};

/// Encoded size of one page-table entry
pub const ENTRY_SIZE: usize = 8;

/// Encoded size of the whole page table
pub const PAGE_TABLE_BLOB_SIZE: usize = VIRTUAL_PAGES * ENTRY_SIZE;

/// Locations of the two snapshot blobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFiles {
    pub page_table: PathBuf,
    pub physical_memory: PathBuf,
}

impl SnapshotFiles {
    pub fn new(page_table: impl Into<PathBuf>, physical_memory: impl Into<PathBuf>) -> Self {
        Self {
            page_table: page_table.into(),
            physical_memory: physical_memory.into(),
        }
    }

    /// Default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join("page_table.dat"),
            dir.join("physical_memory.dat"),
        )
    }

    /// Rebuild a system from the snapshots, backed by `pager`
    pub fn load<M: MemoryObject>(&self, pager: M) -> Result<VmSystem<M>> {
        let page_table = load_page_table(&self.page_table)?;
        let memory = load_physical_memory(&self.physical_memory)?;
        info!(
            "loaded snapshot: {} resident pages",
            page_table.resident_count()
        );
        Ok(VmSystem::from_parts(page_table, memory, pager))
    }

    /// Persist the page table and physical memory of `vm`
    ///
    /// Memory is written first, so whichever write fails, the page table on
    /// disk only maps frames whose contents are on disk too.
    pub fn save<M: MemoryObject>(&self, vm: &VmSystem<M>) -> Result<()> {
        save_physical_memory(&self.physical_memory, vm.physical_memory())?;
        save_page_table(&self.page_table, vm.page_table())?;
        info!(
            "saved snapshot: {} resident pages",
            vm.page_table().resident_count()
        );
        Ok(())
    }

    /// Do both blobs exist?
    pub fn exists(&self) -> bool {
        self.page_table.is_file() && self.physical_memory.is_file()
    }
}

// ============================================================================
// Page table blob
// ============================================================================

pub fn encode_page_table(table: &PageTable) -> Vec<u8> {
    let mut blob = Vec::with_capacity(PAGE_TABLE_BLOB_SIZE);
    for (_, entry) in table.entries() {
        let (present, frame) = entry.to_raw();
        blob.extend_from_slice(&present.to_le_bytes());
        blob.extend_from_slice(&frame.to_le_bytes());
    }
    blob
}

pub fn decode_page_table(blob: &[u8]) -> Result<PageTable> {
    if blob.len() != PAGE_TABLE_BLOB_SIZE {
        return Err(VmError::CorruptSnapshot(format!(
            "page table is {} bytes, expected {}",
            blob.len(),
            PAGE_TABLE_BLOB_SIZE
        )));
    }

    let entries = blob
        .chunks_exact(ENTRY_SIZE)
        .map(|raw| {
            let present = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let frame = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
            PageTableEntry::from_raw(present, frame)
        })
        .collect::<Result<Vec<_>>>()?;

    PageTable::from_entries(entries)
}

pub fn load_page_table(path: &Path) -> Result<PageTable> {
    match read_optional(path)? {
        Some(blob) => decode_page_table(&blob),
        None => Ok(PageTable::new()),
    }
}

pub fn save_page_table(path: &Path, table: &PageTable) -> Result<()> {
    write_atomic(path, &encode_page_table(table))
}

// ============================================================================
// Physical memory blob
// ============================================================================

pub fn load_physical_memory(path: &Path) -> Result<PhysicalMemory> {
    match read_optional(path)? {
        Some(blob) => PhysicalMemory::from_bytes(blob),
        None => Ok(PhysicalMemory::new()),
    }
}

pub fn save_physical_memory(path: &Path, memory: &PhysicalMemory) -> Result<()> {
    write_atomic(path, memory.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::types::{FrameNumber, VirtualAddress, VirtualPage};
    use crate::vm::vm_param::PHYSICAL_SIZE;
    use crate::vm::AnonymousPager;

    #[test]
    fn test_encode_layout() {
        let mut entries = vec![PageTableEntry::ABSENT; VIRTUAL_PAGES];
        entries[1] = PageTableEntry::resident(FrameNumber(5));
        let blob = encode_page_table(&PageTable::from_entries(entries).unwrap());

        assert_eq!(blob.len(), PAGE_TABLE_BLOB_SIZE);
        assert_eq!(&blob[0..8], &[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&blob[8..16], &[1, 0, 0, 0, 5, 0, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(matches!(
            decode_page_table(&[0u8; 12]),
            Err(VmError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_decode_rejects_shared_frame() {
        let mut blob = encode_page_table(&PageTable::new());
        for page in [3usize, 9] {
            let at = page * ENTRY_SIZE;
            blob[at..at + 4].copy_from_slice(&1i32.to_le_bytes());
            blob[at + 4..at + 8].copy_from_slice(&2i32.to_le_bytes());
        }
        assert!(matches!(
            decode_page_table(&blob),
            Err(VmError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_missing_files_load_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let files = SnapshotFiles::in_dir(dir.path());
        assert!(!files.exists());

        let vm = files.load(AnonymousPager::new()).unwrap();
        assert_eq!(vm.page_table().resident_count(), 0);
        assert_eq!(vm.physical_memory().as_bytes().len(), PHYSICAL_SIZE);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let files = SnapshotFiles::in_dir(&dir.path().join("state"));

        let mut vm = VmSystem::new(AnonymousPager::new());
        vm.write_byte(VirtualAddress(3 * 4096 + 7), 0x42).unwrap();
        files.save(&vm).unwrap();
        assert!(files.exists());
        assert!(!dir.path().join("state/page_table.dat.tmp").exists());

        let mut restored = files.load(AnonymousPager::new()).unwrap();
        assert_eq!(restored.page_table(), vm.page_table());
        assert_eq!(
            restored.probe(VirtualAddress(3 * 4096 + 7)),
            Ok(Some(crate::types::PhysicalAddress(7)))
        );
        assert_eq!(restored.read_byte(VirtualAddress(3 * 4096 + 7)), Ok(0x42));
        assert_eq!(restored.stats().total, 0);

        // Frame 0 is held by page 3, so the next fault takes frame 1
        assert_eq!(restored.handle_fault(VirtualPage(0)), Ok(FrameNumber(1)));
    }

    #[test]
    fn test_truncated_memory_image() {
        let dir = tempfile::tempdir().unwrap();
        let files = SnapshotFiles::in_dir(dir.path());
        fs::write(&files.physical_memory, [0u8; 10]).unwrap();

        assert!(matches!(
            files.load(AnonymousPager::new()),
            Err(VmError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_failed_memory_write_keeps_old_table() {
        let dir = tempfile::tempdir().unwrap();
        let files = SnapshotFiles::in_dir(dir.path());
        files.save(&VmSystem::new(AnonymousPager::new())).unwrap();

        let mut backing = AnonymousPager::new();
        let mut page = crate::vm::memory_object::zeroed_page();
        page[0] = b'X';
        backing.write_page(VirtualPage(5), &page).unwrap();

        let mut vm = files.load(backing).unwrap();
        assert_eq!(vm.read_byte(VirtualAddress(5 * 4096)), Ok(b'X'));

        fs::create_dir(dir.path().join("physical_memory.dat.tmp")).unwrap();
        assert!(matches!(files.save(&vm), Err(VmError::Io(_))));

        // Neither blob moved, so page 5 is faulted in again from backing
        let (_, _, backing) = vm.into_parts();
        let mut restored = files.load(backing).unwrap();
        assert_eq!(restored.probe(VirtualAddress(5 * 4096)), Ok(None));
        assert_eq!(restored.read_byte(VirtualAddress(5 * 4096)), Ok(b'X'));
    }
}
