//! Property-based tests for address translation
//!
//! Random address sequences are pushed through a fresh `VmSystem` and the
//! page table, frame allocator and physical memory are checked against
//! each other afterwards.


use std::collections::{BTreeSet, HashMap};

use pagesim::vm::vm_param::{FRAME_COUNT, PAGE_SIZE};
use pagesim::{Access, AnonymousPager, VirtualAddress, VirtualPage, VmError, VmSystem};
use proptest::prelude::*;
use proptest_strategies::*;

fn fresh() -> VmSystem<AnonymousPager> {
    VmSystem::new(AnonymousPager::new())
}

// ════════════════════════════════════════════════════════════
// Translation Properties
// ════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Translating the same address twice gives the same physical address
    #[test]
    fn translation_is_stable(addr in in_range_address(), first in access(), second in access()) {
        let mut vm = fresh();
        let a = vm.translate(addr, first).unwrap();
        let faults = vm.stats().total;
        let b = vm.translate(addr, second).unwrap();

        prop_assert_eq!(a, b);
        prop_assert_eq!(vm.stats().total, faults);
    }

    /// The page offset survives translation
    #[test]
    fn offset_is_preserved(addr in in_range_address()) {
        let mut vm = fresh();
        let pa = vm.translate(addr, Access::Read).unwrap();
        prop_assert_eq!(pa.as_usize() % PAGE_SIZE, addr.offset());
    }

    /// A page reads as zeros on first touch
    #[test]
    fn first_touch_is_zero(addr in in_range_address()) {
        let mut vm = fresh();
        prop_assert_eq!(vm.read_byte(addr), Ok(0));
        prop_assert_eq!(vm.stats().zero_fill, 1);
    }

    /// Out-of-range addresses fail without touching any state
    #[test]
    fn out_of_range_touches_nothing(addr in out_of_range_address(), mode in access()) {
        let mut vm = fresh();
        let result = vm.translate(addr, mode);

        prop_assert!(
            matches!(result, Err(VmError::AddressOutOfRange { .. })),
            "expected AddressOutOfRange, got {:?}",
            result
        );
        prop_assert_eq!(vm.stats().total, 0);
        prop_assert_eq!(vm.frames().free_count(), FRAME_COUNT);
        prop_assert_eq!(vm.page_table().resident_count(), 0);
        prop_assert!(vm.physical_memory().as_bytes().iter().all(|&b| b == 0));
    }
}

// ════════════════════════════════════════════════════════════
// Page Table / Allocator Consistency
// ════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Every resident page holds its own frame and no frame is both
    /// mapped and free
    #[test]
    fn frames_are_unique(addrs in addresses_within_pages(FRAME_COUNT, 200)) {
        let mut vm = fresh();
        for &addr in &addrs {
            vm.translate(addr, Access::Read).unwrap();
        }

        let mut frames = BTreeSet::new();
        for (_, frame) in vm.page_table().resident() {
            prop_assert!(frame.index() < FRAME_COUNT);
            prop_assert!(frames.insert(frame), "{} mapped twice", frame);
            prop_assert!(!vm.frames().is_free(frame));
        }

        let pages: BTreeSet<_> = addrs.iter().map(|a| a.page()).collect();
        prop_assert_eq!(frames.len(), pages.len());
        prop_assert_eq!(vm.frames().free_count() + frames.len(), FRAME_COUNT);
        prop_assert_eq!(vm.stats().serviced as usize, pages.len());
    }

    /// The last byte written to an address is the one read back
    #[test]
    fn last_write_wins(ops in writes(32)) {
        let mut vm = fresh();
        let mut expected = HashMap::new();
        for &(addr, value) in &ops {
            vm.write_byte(addr, value).unwrap();
            expected.insert(addr, value);
        }

        for (&addr, &value) in &expected {
            prop_assert_eq!(vm.read_byte(addr), Ok(value));
        }
    }

    /// Once memory is full, further faults change nothing
    #[test]
    fn full_memory_is_stable(extra in FRAME_COUNT as u32..256u32, offset in page_offset()) {
        let mut vm = fresh();
        for page in 0..FRAME_COUNT as u32 {
            vm.handle_fault(VirtualPage(page)).unwrap();
        }
        let table = vm.page_table().clone();

        let addr = VirtualAddress(extra * PAGE_SIZE as u32 + offset);
        prop_assert_eq!(
            vm.translate(addr, Access::Write),
            Err(VmError::PhysicalMemoryFull { page: VirtualPage(extra) })
        );
        prop_assert_eq!(vm.page_table(), &table);
        prop_assert_eq!(vm.frames().free_count(), 0);
    }
}
