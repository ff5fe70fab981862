//! The boot sequence
//!
//! One linear pass from loader handoff to guest `main`. Ordering is
//! load-bearing everywhere: the sequencer's own runtime comes first
//! (anything below may touch thread-locals), the console before anything
//! that logs, CPU state before anything that might do floating-point
//! arithmetic, the platform record before the command line that lives in
//! it, and the heap lock after every subsystem has taken its pages.

use core::ffi::c_void;

use veil_platform::{block, boot_info, console, mem, net, time};

use crate::{StartInfo, cmdline, crt};

unsafe extern "C" {
    /// The guest application entry point. Its return value is the process
    /// exit status.
    fn veil_app_main(start_info: *const StartInfo) -> i32;
}

/// The process entry point, reached from the loader with one opaque
/// argument.
///
/// Never returns: control transfers to the guest and its return value
/// goes to the termination capability.
///
/// # Safety
///
/// Must only be entered by the loader, exactly once, with a valid boot
/// argument for this platform.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _start(arg: *const c_void) -> ! {
    crt::init_ssp();
    crt::init_tls();

    console::init();

    cpu_init();

    // SAFETY: `arg` is the loader-supplied boot argument, forwarded
    // untouched.
    unsafe { boot_info::init(arg) };

    // SAFETY: boot path, called once.
    let cmdline = unsafe { cmdline::parse(boot_info::cmdline()) };

    banner();

    mem::init();

    // Device bring-up order is fixed: time, block, network.
    // SAFETY: same loader-supplied argument for each.
    unsafe {
        time::init(arg);
        block::init(arg);
        net::init(arg);
    }

    let (heap_start, heap_size) = mem::lock_heap();
    let start_info = StartInfo {
        cmdline,
        heap_start,
        heap_size,
    };

    log::info!("handing control to the guest");
    // SAFETY: every subsystem is up and the record is complete; the guest
    // owns it from here.
    let status = unsafe { veil_app_main(&start_info) };
    veil_platform::exit(status)
}

/// Resets CPU state the loader makes no promises about.
///
/// On x86_64 that is the x87 FPU, which must be reinitialized before any
/// subsystem performs floating-point arithmetic; the control word is
/// logged around the reset so a misbehaving loader shows up in the boot
/// transcript.
fn cpu_init() {
    #[cfg(target_arch = "x86_64")]
    {
        use veil_cpu::control_regs;

        let before = control_regs::fpu_control_word();
        // SAFETY: boot path; no floating-point computation can be pending.
        unsafe { control_regs::fpu_init() };
        let after = control_regs::fpu_control_word();
        log::info!("cpu: FPU control word {:#06x} -> {:#06x}", before, after);
    }
    #[cfg(target_arch = "aarch64")]
    {
        log::info!("cpu: FP state inherited from loader");
    }

    // Auxiliary, and nothing in the bindings needs vector state:
    // enable_avx();
}

/// Enables AVX state when the CPU supports AVX2.
///
/// Kept off the default sequence; guests that want vector code can ask
/// for it via their own bring-up.
#[cfg(target_arch = "x86_64")]
#[allow(dead_code)]
fn enable_avx() {
    use veil_cpu::features::{self, Xcr0};

    // SAFETY: the loaders these bindings target hand over the CPU with
    // OSXSAVE enabled, which is all xgetbv/xsetbv need.
    unsafe {
        let before = features::read_xcr0();
        log::info!("cpu: XCR0 {:#x}", before.bits());

        features::write_xcr0(before | Xcr0::SSE | Xcr0::AVX);
        log::info!("cpu: XCR0 {:#x}", features::read_xcr0().bits());
    }

    if features::avx2_supported() {
        log::info!("cpu: AVX2 enabled");
    } else {
        log::info!("cpu: AVX2 not supported");
    }
}

/// The boot transcript header: who is running, and which version.
fn banner() {
    log::info!(r"             _ _ ");
    log::info!(r" __   _____ (_) |");
    log::info!(r" \ \ / / _ \| | |");
    log::info!(r"  \ V /  __/| | |");
    log::info!(r"   \_/ \___||_|_|");
    log::info!("Veil: bindings version {}", env!("CARGO_PKG_VERSION"));
}
