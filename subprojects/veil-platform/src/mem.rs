//! Heap accounting
//!
//! The bindings own no allocator; this module only tracks the boundary of
//! the region that will become the guest's heap. Between memory init and
//! the heap lock, boot-time collaborators may carve whole pages off the
//! top of the region. The lock then freezes the boundary: the remaining
//! region is recorded in the start information and belongs to the guest,
//! and any later carve attempt is a fatal contract violation.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::boot_info;

/// Page size (4 KiB).
pub const PAGE_SIZE: usize = 0x1000;

/// Page mask for alignment operations.
const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Rounds up to the next page boundary; page-aligned values are returned
/// unchanged.
#[inline]
pub const fn round_up_to_page(size: usize) -> usize {
    (size + PAGE_MASK) & !PAGE_MASK
}

/// Rounds down to the previous page boundary; page-aligned values are
/// returned unchanged.
#[inline]
pub const fn round_down_to_page(size: usize) -> usize {
    size & !PAGE_MASK
}

// Boot is single-threaded, so all accesses use relaxed ordering; the
// atomics only exist to make the statics writable without a lock.
static HEAP_START: AtomicUsize = AtomicUsize::new(0);
static HEAP_END: AtomicUsize = AtomicUsize::new(0);
static LOCKED: AtomicBool = AtomicBool::new(false);

/// Initializes heap accounting from the captured boot record.
///
/// The heap spans from the first page boundary past the loaded image to
/// the last whole page below the memory ceiling. An image that leaves no
/// room for a heap is fatal.
pub fn init() {
    let info = boot_info::get();
    let start = round_up_to_page(info.kernel_end as usize);
    let end = round_down_to_page(info.mem_size as usize);
    if start >= end {
        crate::abort(format_args!(
            "mem: no heap between image end {:#x} and memory ceiling {:#x}",
            start, end
        ));
    }
    HEAP_START.store(start, Ordering::Relaxed);
    HEAP_END.store(end, Ordering::Relaxed);
    log::info!("mem: heap {:#x}..{:#x}", start, end);
}

/// Carves `count` pages off the top of the heap region and returns their
/// base address.
///
/// Only legal between [`init`] and [`lock_heap`]; afterwards the boundary
/// is frozen and a carve attempt aborts. Exhausting the region aborts
/// too: boot-time allocations are sized at build time, so either is a
/// bug, not a runtime condition to recover from.
pub fn alloc_pages(count: usize) -> usize {
    if LOCKED.load(Ordering::Relaxed) {
        crate::abort(format_args!("mem: page allocation after heap lock"));
    }
    let bytes = match count.checked_mul(PAGE_SIZE) {
        Some(bytes) => bytes,
        None => crate::abort(format_args!("mem: page count overflow")),
    };
    let end = HEAP_END.load(Ordering::Relaxed);
    let start = HEAP_START.load(Ordering::Relaxed);
    let new_end = match end.checked_sub(bytes) {
        Some(new_end) if new_end > start => new_end,
        _ => crate::abort(format_args!("mem: heap exhausted carving {} pages", count)),
    };
    HEAP_END.store(new_end, Ordering::Relaxed);
    new_end
}

/// Freezes the heap boundary and returns `(heap_start, heap_size)`.
///
/// Called exactly once, after every subsystem has taken what it needs;
/// the returned region is recorded in the start information and owned by
/// the guest from then on.
pub fn lock_heap() -> (usize, usize) {
    if LOCKED.swap(true, Ordering::Relaxed) {
        crate::abort(format_args!("mem: heap locked twice"));
    }
    let start = HEAP_START.load(Ordering::Relaxed);
    let end = HEAP_END.load(Ordering::Relaxed);
    (start, end - start)
}
