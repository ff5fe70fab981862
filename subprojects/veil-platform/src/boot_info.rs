//! Platform boot record
//!
//! The loader enters the image with a single opaque pointer. On the
//! shared-memory target that pointer addresses a [`BootInfo`] record the
//! tender wrote into guest memory before transferring control: the memory
//! ceiling, where the loaded image ends, the cycle counter frequency, the
//! device presence flags and the raw command line.
//!
//! The record is decoded and validated exactly once, during platform
//! init, and is immutable afterwards.

use core::ffi::{CStr, c_char, c_void};

use spin::Once;
use static_assertions::const_assert_eq;

/// Identifies a tender-written [`BootInfo`] record ("VEILBOOT").
pub const BOOT_MAGIC: u64 = u64::from_le_bytes(*b"VEILBOOT");

bitflags::bitflags! {
    /// Device presence bits in [`BootInfo::flags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BootFlags: u64 {
        /// A block device channel is attached.
        const BLOCK = 1 << 0;
        /// A network device channel is attached.
        const NET = 1 << 1;
    }
}

/// The record the tender hands to the image entry point.
#[derive(Debug)]
#[repr(C)]
pub struct BootInfo {
    /// Must equal [`BOOT_MAGIC`].
    pub magic: u64,
    /// Total guest memory in bytes.
    pub mem_size: u64,
    /// First byte past the loaded image; the heap begins at the next page
    /// boundary.
    pub kernel_end: u64,
    /// Cycle counter frequency in Hz, or 0 where the architecture reports
    /// it itself.
    pub cpu_freq_hz: u64,
    /// Device presence bits, interpreted via [`BootFlags`].
    pub flags: u64,
    /// NUL-terminated raw command line, or null for none.
    pub cmdline: *const c_char,
}

const_assert_eq!(size_of::<BootInfo>(), 48);

// SAFETY: written once by the tender before entry, read-only afterwards.
unsafe impl Sync for BootInfo {}

/// Why a boot argument failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BootInfoError {
    /// The boot argument is null.
    #[error("boot argument is null")]
    NullArgument,
    /// The record does not carry [`BOOT_MAGIC`].
    #[error("boot record magic mismatch")]
    BadMagic,
}

/// The decoded record, captured by [`init`].
static BOOT_INFO: Once<&'static BootInfo> = Once::new();

/// Decodes the opaque boot argument into a [`BootInfo`] reference.
///
/// # Safety
///
/// `arg` must be the pointer the loader passed to the entry point, or a
/// copy of it; anything else may address arbitrary memory.
pub unsafe fn from_arg(arg: *const c_void) -> Result<&'static BootInfo, BootInfoError> {
    if arg.is_null() {
        return Err(BootInfoError::NullArgument);
    }
    // SAFETY: non-null loader argument; the tender guarantees it addresses
    // a BootInfo that outlives the process.
    let info = unsafe { &*arg.cast::<BootInfo>() };
    if info.magic != BOOT_MAGIC {
        return Err(BootInfoError::BadMagic);
    }
    Ok(info)
}

/// Validates and captures the boot record.
///
/// Called exactly once by the boot sequencer, before any subsystem that
/// needs the record. A malformed argument is fatal.
///
/// # Safety
///
/// `arg` must be the pointer the loader passed to the entry point.
pub unsafe fn init(arg: *const c_void) {
    // SAFETY: forwarded caller contract.
    let info = match unsafe { from_arg(arg) } {
        Ok(info) => info,
        Err(err) => crate::abort(format_args!("platform: {}", err)),
    };
    BOOT_INFO.call_once(|| info);
    log::info!(
        "platform: {} MiB memory, image ends at {:#x}",
        info.mem_size >> 20,
        info.kernel_end
    );
}

/// Returns the captured boot record.
///
/// Aborts if platform init has not run. Every caller is sequenced after
/// it by construction, so this firing means the boot order was broken.
pub fn get() -> &'static BootInfo {
    match BOOT_INFO.get() {
        Some(info) => info,
        None => crate::abort(format_args!("platform: boot record read before init")),
    }
}

/// Returns the raw command line, or `""` when the tender supplied none.
pub fn cmdline() -> &'static CStr {
    let info = get();
    if info.cmdline.is_null() {
        return c"";
    }
    // SAFETY: a non-null cmdline pointer is guaranteed NUL-terminated by
    // the tender and lives as long as the process.
    unsafe { CStr::from_ptr(info.cmdline) }
}

/// Returns the decoded device presence flags.
pub fn flags() -> BootFlags {
    BootFlags::from_bits_truncate(get().flags)
}
