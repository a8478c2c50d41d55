//! Address translation
//!
//! A virtual address is split into a virtual page number and an offset.
//! The page number selects a page-table entry; if the page is not
//! resident it is faulted in first. The physical address is then
//! `frame * PAGE_SIZE + offset`.
//!
//! Read and write accesses translate the same way. The access mode only
//! decides whether the caller gets a shared or a mutable view of the byte.

use alloc::vec::Vec;
use log::trace;

use crate::error::{Result, VmError};
use crate::types::{PhysicalAddress, VirtualAddress};
use crate::vm::memory_object::MemoryObject;
use crate::vm::vm_param::{PAGE_SIZE, PHYSICAL_SIZE, VIRTUAL_PAGES};
use crate::vm::VmSystem;

/// Access mode of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl<M: MemoryObject> VmSystem<M> {
    /// Translate a virtual address, faulting its page in if needed
    pub fn translate(&mut self, addr: VirtualAddress, access: Access) -> Result<PhysicalAddress> {
        let page = addr.page();
        if page.index() >= VIRTUAL_PAGES {
            return Err(VmError::AddressOutOfRange {
                address: addr,
                page,
            });
        }

        let frame = match self.page_table.lookup(page)?.frame() {
            Some(frame) => frame,
            None => self.handle_fault(page)?,
        };

        let physical = frame.index() * PAGE_SIZE + addr.offset();
        if physical >= PHYSICAL_SIZE {
            return Err(VmError::PhysicalAddressOutOfRange { address: physical });
        }

        trace!("{:?} {} -> {}", access, addr, physical);
        Ok(PhysicalAddress(physical as u32))
    }

    /// Translate without faulting
    ///
    /// Returns `None` when the page is not resident.
    pub fn probe(&self, addr: VirtualAddress) -> Result<Option<PhysicalAddress>> {
        let page = addr.page();
        let entry = self
            .page_table
            .lookup(page)
            .map_err(|_| VmError::AddressOutOfRange {
                address: addr,
                page,
            })?;
        Ok(entry
            .frame()
            .and_then(|frame| frame.base())
            .map(|base| PhysicalAddress(base.0 + addr.offset() as u32)))
    }

    /// Translate a batch of addresses in order
    pub fn translate_batch(
        &mut self,
        addrs: &[VirtualAddress],
        access: Access,
    ) -> Vec<Result<PhysicalAddress>> {
        addrs
            .iter()
            .map(|&addr| self.translate(addr, access))
            .collect()
    }

    /// Shared view of the byte at a virtual address
    pub fn byte(&mut self, addr: VirtualAddress) -> Result<&u8> {
        let physical = self.translate(addr, Access::Read)?;
        self.memory
            .get(physical)
            .ok_or(VmError::PhysicalAddressOutOfRange {
                address: physical.as_usize(),
            })
    }

    /// Mutable view of the byte at a virtual address
    pub fn byte_mut(&mut self, addr: VirtualAddress) -> Result<&mut u8> {
        let physical = self.translate(addr, Access::Write)?;
        self.memory
            .get_mut(physical)
            .ok_or(VmError::PhysicalAddressOutOfRange {
                address: physical.as_usize(),
            })
    }

    /// Read the byte at a virtual address
    pub fn read_byte(&mut self, addr: VirtualAddress) -> Result<u8> {
        self.byte(addr).copied()
    }

    /// Store a byte at a virtual address
    pub fn write_byte(&mut self, addr: VirtualAddress, value: u8) -> Result<()> {
        *self.byte_mut(addr)? = value;
        Ok(())
    }
}
