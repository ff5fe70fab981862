//! Minimal C runtime for the boot path
//!
//! The entry point needs two things for itself before it may call
//! anything: a live stack-protector guard (the compiler instruments the
//! boot code like everything else) and a working TLS block (anything it
//! calls may touch a thread-local). Both are established here, from
//! statically reserved storage; there is no allocator yet.

use veil_cpu::counter;

/// Storage reserved for the boot execution unit's TLS block.
///
/// Sized generously above any template these bindings link; the actual
/// requirement is checked against it at runtime before use.
const BOOT_TLS_CAPACITY: usize = 0x400;

/// Keeps the block aligned well past the pointer alignment the
/// initializer demands, and to a cache line for good measure.
#[repr(align(64))]
struct BootTls([u8; BOOT_TLS_CAPACITY]);

static mut BOOT_TLS: BootTls = BootTls([0; BOOT_TLS_CAPACITY]);

/// Stack-protector guard read by compiler-instrumented prologues.
///
/// The build-time value only covers the handful of instructions before
/// [`init_ssp`] replaces it with a boot-unique one.
#[unsafe(no_mangle)]
pub static mut __stack_chk_guard: usize = 0xcafe_babe_dead_5a5a_u64 as usize;

/// Called by instrumented epilogues on canary corruption.
///
/// Deliberately avoids the logging path: the stack is already known to be
/// corrupt, so the less machinery the better.
#[unsafe(no_mangle)]
pub extern "C" fn __stack_chk_fail() -> ! {
    veil_cpu::halt()
}

/// Installs a boot-unique stack-protector guard.
///
/// Derived from the cycle counter (no entropy source exists this early),
/// with the low byte forced to zero so a string overflow cannot run past
/// the canary unnoticed.
pub fn init_ssp() {
    let guard = (counter::read() as usize) << 8;
    // SAFETY: single-threaded boot path, before any instrumented callee
    // could be mid-prologue.
    unsafe { __stack_chk_guard = guard };
}

/// Initializes and installs the boot execution unit's own TLS block.
///
/// Self-referential bootstrap: the boot code needs a working TLS slot
/// before it can call anything that may use thread-locals, so the block
/// comes from static storage and is wired up with the same machinery
/// later execution units will use.
///
/// Failures here are fatal but mute; the console does not exist yet.
pub fn init_tls() {
    let block = (&raw mut BOOT_TLS) as usize;

    if veil_sys_tls::size() > BOOT_TLS_CAPACITY {
        // Cannot even log it; the image was linked with a thread-local
        // template larger than the reserved boot block.
        veil_cpu::halt();
    }

    // SAFETY: the block is statically reserved, zeroed, aligned, and
    // checked to fit the active image; nothing else uses it.
    if unsafe { veil_sys_tls::init(block) }.is_err() {
        veil_cpu::halt();
    }
    // SAFETY: the block was initialized immediately above.
    if unsafe { veil_sys_tls::set_base(veil_sys_tls::tp_offset(block)) }.is_err() {
        veil_cpu::halt();
    }
}
