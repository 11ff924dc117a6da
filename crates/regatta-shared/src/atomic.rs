//! Relaxed-ordering atomic helpers.
//!
//! These wrap `std::sync::atomic` with the two idioms the harness
//! leans on: compare-and-swap that returns the previous value (so a
//! retry loop can observe what beat it), and masked bit updates that
//! leave the other bits of the word alone. Workers using these make
//! progress without blocking; ordering between workers is intentionally
//! unconstrained.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

macro_rules! relaxed_helpers {
    ($atomic:ty, $value:ty, $load:ident, $store:ident, $cas:ident, $set_bits:ident) => {
        pub fn $load(cell: &$atomic) -> $value {
            cell.load(Ordering::Relaxed)
        }

        pub fn $store(cell: &$atomic, value: $value) {
            cell.store(value, Ordering::Relaxed);
        }

        /// Attempts to replace `current` with `new`; returns the value
        /// observed before the operation, which equals `current` iff
        /// the swap happened.
        pub fn $cas(cell: &$atomic, current: $value, new: $value) -> $value {
            match cell.compare_exchange(current, new, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(prev) => prev,
                Err(prev) => prev,
            }
        }

        /// Sets the masked bits of the word to `bits & mask`, retrying
        /// until the update lands; unmasked bits are preserved even
        /// under concurrent writers to other mask regions.
        pub fn $set_bits(cell: &$atomic, bits: $value, mask: $value) {
            debug_assert_eq!(bits & !mask, 0);
            let mut old = $load(cell);
            loop {
                let new = (old & !mask) | bits;
                let prev = $cas(cell, old, new);
                if prev == old {
                    return;
                }
                old = prev;
            }
        }
    };
}

relaxed_helpers!(
    AtomicU8,
    u8,
    relaxed_load_u8,
    relaxed_store_u8,
    compare_and_swap_u8,
    set_bits_u8
);
relaxed_helpers!(
    AtomicU32,
    u32,
    relaxed_load_u32,
    relaxed_store_u32,
    compare_and_swap_u32,
    set_bits_u32
);
