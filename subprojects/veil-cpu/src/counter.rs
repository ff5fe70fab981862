//! Counter-timer access
//!
//! This module provides functions for reading the CPU cycle counter, which
//! the time subsystem scales into wall-clock durations using the frequency
//! reported by the platform.

use core::arch::asm;

/// Gets the current cycle count.
///
/// Reads the time-stamp counter. The TSC on the targets Veil runs on is
/// invariant: it ticks at a constant rate independent of power states, so
/// it is usable as a monotonic time source once its frequency is known.
///
/// # References
///
/// - [Intel SDM Vol. 3B: Invariant TSC](https://www.intel.com/content/www/us/en/developer/articles/technical/intel-sdm.html)
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read() -> u64 {
    let (lo, hi): (u32, u32);
    // SAFETY: `rdtsc` reads the time-stamp counter into `edx:eax` and has
    // no other effects.
    unsafe {
        asm!(
            "rdtsc",                 // Time-stamp counter into edx:eax
            out("eax") lo,
            out("edx") hi,
            options(nostack, nomem),
        );
    }
    (hi as u64) << 32 | lo as u64
}

/// Gets the current cycle count.
///
/// Reads the `cntvct_el0` system register, the virtual counter-timer a
/// guest observes. The offset against the physical counter is fixed by the
/// host, so successive reads are monotonic.
///
/// # References
///
/// - [ARM CNTVCT_EL0 Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch64-Registers/CNTVCT-EL0--Counter-timer-Virtual-Count-Register)
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn read() -> u64 {
    let value: u64;
    // SAFETY: Reading `cntvct_el0` is a side-effect-free register read.
    unsafe {
        asm!(
            "mrs {:x}, cntvct_el0", // Move from system register to general-purpose register
            out(reg) value,
            options(nostack, nomem),
        );
    }
    value
}

/// Gets the counter-timer frequency, in Hz.
///
/// Reads the `cntfrq_el0` system register, programmed by firmware with the
/// tick rate of the system counter. On x86_64 there is no architectural
/// equivalent; the frequency arrives in the platform boot record instead.
///
/// # References
///
/// - [ARM CNTFRQ_EL0 Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch64-Registers/CNTFRQ-EL0--Counter-timer-Frequency-register)
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn frequency() -> u64 {
    let value: u64;
    // SAFETY: Reading `cntfrq_el0` is a side-effect-free register read.
    unsafe {
        asm!(
            "mrs {:x}, cntfrq_el0", // Move from system register to general-purpose register
            out(reg) value,
            options(nostack, nomem),
        );
    }
    value
}
