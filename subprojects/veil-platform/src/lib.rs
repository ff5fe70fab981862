//! # veil-platform
//!
//! The subsystems the boot sequencer activates before the guest can run:
//! console output, the decoded platform boot record, heap accounting,
//! time, block storage and network presence, and process termination.
//!
//! Each subsystem exposes an `init` entry the sequencer calls exactly once,
//! in a fixed order; none of them call back into the sequencer. Failures
//! at this stage are unrecoverable: the subsystems abort with a
//! diagnostic instead of returning errors, because no caller exists that
//! could handle one.

#![no_std]

extern crate veil_panic_handler; // Provides #[panic_handler]

pub mod block;
pub mod boot_info;
pub mod console;
pub mod mem;
pub mod net;
pub mod time;

/// Terminates the process with the given status.
///
/// The status is the guest's return value; it is logged so the tender side
/// can correlate it, then the CPU is parked for good. There is no
/// mechanism to hand a status code to the host beyond the diagnostic line.
pub fn exit(status: i32) -> ! {
    log::info!("halted, status={}", status);
    veil_cpu::halt()
}

/// Aborts the boot with a diagnostic.
///
/// The failure path of every subsystem: once boot has begun there is no
/// safe continuation short of the guest running, so a failed step logs
/// what went wrong and parks the CPU.
pub fn abort(reason: core::fmt::Arguments<'_>) -> ! {
    log::error!("ABORT: {}", reason);
    veil_cpu::halt()
}
