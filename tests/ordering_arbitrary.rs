#![cfg(feature = "proptest")]

use core::sync::atomic::Ordering;

use halo_atomics::{AtomicU32, CasKind, LoadOrder, MemoryOrder, StoreOrder};
use proptest::prelude::*;

proptest! {
    #[test]
    fn load_part_of_any_order_is_a_valid_load(order in any::<MemoryOrder>()) {
        let load: Ordering = order.load_part().into();
        prop_assert!(!matches!(load, Ordering::Release | Ordering::AcqRel));
    }

    #[test]
    fn any_order_combination_updates_cells(
        load in any::<LoadOrder>(),
        store in any::<StoreOrder>(),
        rmw in any::<MemoryOrder>(),
        kind in any::<CasKind>(),
        start in any::<u32>(),
        next in any::<u32>(),
    ) {
        let cell = AtomicU32::new(0);
        cell.store(start, store);
        prop_assert_eq!(cell.load(load), start);
        let mut current = start;
        while !cell.load_compare_and_swap(&mut current, next, kind, rmw, load) {
            prop_assert_eq!(current, start);
        }
        prop_assert_eq!(cell.swap(start, rmw), next);
    }
}
