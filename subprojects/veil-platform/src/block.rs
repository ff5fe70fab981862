//! Block storage presence
//!
//! The shared-memory target attaches at most one block device channel,
//! announced by a flag in the boot record. The channel protocol itself is
//! not part of the boot layer; what matters here is recording presence so
//! guest-facing accessors can answer without re-decoding the record.

use core::{
    ffi::c_void,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::boot_info::{self, BootFlags};

static PRESENT: AtomicBool = AtomicBool::new(false);

/// Initializes the block subsystem from the boot argument.
///
/// # Safety
///
/// `arg` must be the pointer the loader passed to the entry point.
pub unsafe fn init(arg: *const c_void) {
    // SAFETY: forwarded caller contract.
    let info = match unsafe { boot_info::from_arg(arg) } {
        Ok(info) => info,
        Err(err) => crate::abort(format_args!("block: {}", err)),
    };

    let present = BootFlags::from_bits_truncate(info.flags).contains(BootFlags::BLOCK);
    PRESENT.store(present, Ordering::Relaxed);
    if present {
        log::info!("block: device channel attached");
    } else {
        log::info!("block: no device");
    }
}

/// Whether a block device channel was attached at boot.
pub fn present() -> bool {
    PRESENT.load(Ordering::Relaxed)
}
