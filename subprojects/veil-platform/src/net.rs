//! Network presence
//!
//! Mirrors [`crate::block`]: the boot record announces whether a network
//! device channel is attached, and this module records the answer for
//! guest-facing accessors.

use core::{
    ffi::c_void,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::boot_info::{self, BootFlags};

static PRESENT: AtomicBool = AtomicBool::new(false);

/// Initializes the network subsystem from the boot argument.
///
/// # Safety
///
/// `arg` must be the pointer the loader passed to the entry point.
pub unsafe fn init(arg: *const c_void) {
    // SAFETY: forwarded caller contract.
    let info = match unsafe { boot_info::from_arg(arg) } {
        Ok(info) => info,
        Err(err) => crate::abort(format_args!("net: {}", err)),
    };

    let present = BootFlags::from_bits_truncate(info.flags).contains(BootFlags::NET);
    PRESENT.store(present, Ordering::Relaxed);
    if present {
        log::info!("net: device channel attached");
    } else {
        log::info!("net: no device");
    }
}

/// Whether a network device channel was attached at boot.
pub fn present() -> bool {
    PRESENT.load(Ordering::Relaxed)
}
