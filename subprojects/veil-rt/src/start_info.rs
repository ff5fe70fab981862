//! Start information
//!
//! The record handed to the guest entry point. It is assembled on the
//! boot stack once every subsystem is up, and ownership transfers to the
//! guest for the remainder of execution; the bindings never touch it
//! again.

use core::ffi::c_char;

use static_assertions::const_assert_eq;

/// What the guest receives: its command line and its heap.
///
/// `#[repr(C)]` because the guest side may be foreign code built against
/// the same ABI; the field order is part of the boot contract.
#[derive(Debug)]
#[repr(C)]
pub struct StartInfo {
    /// Parsed command line, NUL-terminated. Never null; an absent command
    /// line is an empty string.
    pub cmdline: *const c_char,
    /// First byte of the heap region owned by the guest.
    pub heap_start: usize,
    /// Size of the heap region in bytes.
    pub heap_size: usize,
}

const_assert_eq!(size_of::<StartInfo>(), 3 * size_of::<usize>());

#[cfg(test)]
mod tests {
    use core::mem::offset_of;

    use super::StartInfo;

    #[test]
    fn field_order_is_part_of_the_abi() {
        assert_eq!(offset_of!(StartInfo, cmdline), 0);
        assert_eq!(offset_of!(StartInfo, heap_start), size_of::<usize>());
        assert_eq!(offset_of!(StartInfo, heap_size), 2 * size_of::<usize>());
    }
}
