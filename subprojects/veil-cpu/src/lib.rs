//! # veil-cpu
//!
//! CPU register capabilities for the Veil boot bindings.
//!
//! Everything above this crate treats the CPU as a set of small register
//! effects: install the thread pointer, read the counter, read or write
//! the extended-state mask. Each effect is one function here, so the rest
//! of the bindings never touch instruction-level detail and the crate can
//! be reimplemented per target architecture without disturbing them.
//!
//! Supported architectures: x86_64 and aarch64. The thread-pointer
//! register differs between them (`IA32_FS_BASE` vs `TPIDR_EL0`), as does
//! the counter source (`rdtsc` vs `CNTVCT_EL0`); the module surfaces are
//! kept identical where the semantics allow it.

#![no_std]

extern crate veil_panic_handler; // Provides #[panic_handler]

pub mod control_regs;
pub mod counter;
#[cfg(target_arch = "x86_64")]
pub mod features;
#[cfg(target_arch = "x86_64")]
pub mod port;

/// Parks the CPU until the next interrupt, forever.
///
/// This is the termination primitive of the bindings: once boot has failed
/// or the guest has returned, there is nothing left to run and nowhere to
/// return to.
pub fn halt() -> ! {
    loop {
        #[cfg(target_arch = "x86_64")]
        // SAFETY: `hlt` only pauses the CPU until the next interrupt; it has
        // no memory or register effects.
        unsafe {
            core::arch::asm!("hlt", options(nostack, nomem))
        };
        #[cfg(target_arch = "aarch64")]
        // SAFETY: `wfi` only pauses the CPU until the next interrupt; it has
        // no memory or register effects.
        unsafe {
            core::arch::asm!("wfi", options(nostack, nomem))
        };
    }
}
