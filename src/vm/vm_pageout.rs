//! Write-back of resident frames
//!
//! Frames are never reclaimed, so there is no pageout daemon. Instead the
//! owner can copy a resident frame back to its memory object on request;
//! the frame stays resident afterwards.

use log::debug;

use crate::error::{Result, VmError};
use crate::types::VirtualPage;
use crate::vm::memory_object::MemoryObject;
use crate::vm::vm_param::PAGE_SIZE;
use crate::vm::VmSystem;

impl<M: MemoryObject> VmSystem<M> {
    /// Write one resident page back to its memory object
    ///
    /// Returns `false` if the page is not resident.
    pub fn sync_page(&mut self, page: VirtualPage) -> Result<bool> {
        let Some(frame) = self.page_table.lookup(page)?.frame() else {
            return Ok(false);
        };

        let data = self
            .memory
            .frame(frame)
            .ok_or(VmError::PhysicalAddressOutOfRange {
                address: frame.index().saturating_mul(PAGE_SIZE),
            })?;
        self.pager.write_page(page, data)?;
        debug!("synced {} from {}", page, frame);
        Ok(true)
    }

    /// Write every resident page back; returns the number written
    pub fn sync_all(&mut self) -> Result<usize> {
        let mut written = 0;
        for (page, frame) in self.page_table.resident() {
            let data = self
                .memory
                .frame(frame)
                .ok_or(VmError::PhysicalAddressOutOfRange {
                    address: frame.index().saturating_mul(PAGE_SIZE),
                })?;
            self.pager.write_page(page, data)?;
            written += 1;
        }
        debug!("synced {} resident pages", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VirtualAddress;
    use crate::vm::memory_object::{AnonymousPager, PageData};

    /// Pager that serves reads but whose medium rejects writes
    #[derive(Default)]
    struct ReadOnlyPager {
        pages: AnonymousPager,
    }

    impl MemoryObject for ReadOnlyPager {
        fn read_page(&mut self, page: VirtualPage) -> Result<PageData> {
            self.pages.read_page(page)
        }

        fn write_page(&mut self, _page: VirtualPage, _data: &[u8; PAGE_SIZE]) -> Result<()> {
            Err(VmError::Io("medium is read-only".into()))
        }

        fn contains(&self, page: VirtualPage) -> bool {
            self.pages.contains(page)
        }
    }

    #[test]
    fn test_sync_page_writes_frame_contents() {
        let mut vm = VmSystem::new(AnonymousPager::new());
        vm.write_byte(VirtualAddress(4096 + 10), 0x5A).unwrap();

        // Not visible in the backing page until synced
        assert_eq!(vm.pager().peek(VirtualPage(1)).map(|d| d[10]), Some(0));

        assert_eq!(vm.sync_page(VirtualPage(1)), Ok(true));
        assert_eq!(vm.pager().peek(VirtualPage(1)).map(|d| d[10]), Some(0x5A));
    }

    #[test]
    fn test_sync_page_not_resident() {
        let mut vm = VmSystem::new(AnonymousPager::new());
        assert_eq!(vm.sync_page(VirtualPage(4)), Ok(false));
        assert!(!vm.pager().contains(VirtualPage(4)));
    }

    #[test]
    fn test_sync_all() {
        let mut vm = VmSystem::new(AnonymousPager::new());
        vm.write_byte(VirtualAddress(0), b'A').unwrap();
        vm.write_byte(VirtualAddress(4096), b'B').unwrap();
        vm.write_byte(VirtualAddress(30 * 4096), b'C').unwrap();

        assert_eq!(vm.sync_all(), Ok(3));
        assert_eq!(vm.pager().peek(VirtualPage(30)).map(|d| d[0]), Some(b'C'));
    }

    #[test]
    fn test_sync_page_write_failure() {
        let mut vm = VmSystem::new(ReadOnlyPager::default());
        vm.write_byte(VirtualAddress(2 * 4096 + 1), 0x77).unwrap();
        let table = vm.page_table().clone();
        let memory = vm.physical_memory().clone();

        assert!(matches!(vm.sync_page(VirtualPage(2)), Err(VmError::Io(_))));
        assert_eq!(vm.page_table(), &table);
        assert_eq!(vm.physical_memory(), &memory);
        assert_eq!(vm.read_byte(VirtualAddress(2 * 4096 + 1)), Ok(0x77));
        assert_eq!(vm.pager().pages.peek(VirtualPage(2)).map(|d| d[1]), Some(0));
    }

    #[test]
    fn test_sync_all_write_failure() {
        let mut vm = VmSystem::new(ReadOnlyPager::default());
        vm.write_byte(VirtualAddress(0), b'A').unwrap();
        vm.write_byte(VirtualAddress(4096), b'B').unwrap();
        let table = vm.page_table().clone();
        let memory = vm.physical_memory().clone();
        let free = vm.frames().free_count();

        assert!(matches!(vm.sync_all(), Err(VmError::Io(_))));
        assert_eq!(vm.page_table(), &table);
        assert_eq!(vm.physical_memory(), &memory);
        assert_eq!(vm.frames().free_count(), free);
    }
}
