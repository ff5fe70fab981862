//! Monotonic time
//!
//! Scales the CPU cycle counter into nanoseconds. The counter frequency
//! comes from the boot record on x86_64 (the TSC rate is the tender's to
//! know) and from `cntfrq_el0` on aarch64 when the record leaves it zero.

use core::{
    ffi::c_void,
    sync::atomic::{AtomicU64, Ordering},
};

use veil_cpu::counter;

use crate::boot_info;

static FREQ_HZ: AtomicU64 = AtomicU64::new(0);
static EPOCH: AtomicU64 = AtomicU64::new(0);

/// Initializes the time subsystem from the boot argument.
///
/// Captures the counter frequency and the boot-time counter value; all
/// later readings are deltas against that epoch. A missing frequency is
/// fatal on targets that cannot report their own.
///
/// # Safety
///
/// `arg` must be the pointer the loader passed to the entry point.
pub unsafe fn init(arg: *const c_void) {
    // SAFETY: forwarded caller contract.
    let info = match unsafe { boot_info::from_arg(arg) } {
        Ok(info) => info,
        Err(err) => crate::abort(format_args!("time: {}", err)),
    };

    let freq = resolve_frequency(info.cpu_freq_hz);
    FREQ_HZ.store(freq, Ordering::Relaxed);
    EPOCH.store(counter::read(), Ordering::Relaxed);
    log::info!("time: counter at {} Hz", freq);
}

#[cfg(target_arch = "x86_64")]
fn resolve_frequency(from_boot: u64) -> u64 {
    if from_boot == 0 {
        crate::abort(format_args!("time: boot record reports no counter frequency"));
    }
    from_boot
}

#[cfg(target_arch = "aarch64")]
fn resolve_frequency(from_boot: u64) -> u64 {
    if from_boot != 0 {
        return from_boot;
    }
    counter::frequency()
}

/// Nanoseconds of monotonic time since the time subsystem initialized.
///
/// Aborts when read before init; callers are sequenced after it by
/// construction.
pub fn monotonic_ns() -> u64 {
    let freq = FREQ_HZ.load(Ordering::Relaxed);
    if freq == 0 {
        crate::abort(format_args!("time: clock read before init"));
    }
    let delta = counter::read().wrapping_sub(EPOCH.load(Ordering::Relaxed));
    (delta as u128 * 1_000_000_000 / freq as u128) as u64
}
