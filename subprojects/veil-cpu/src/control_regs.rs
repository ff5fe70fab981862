//! Functions to read and write control registers
//!
//! This module provides the per-architecture register accessors behind the
//! thread-pointer install capability, plus the x87 control interface used
//! during CPU bring-up on x86_64.

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use core::arch::naked_asm;

/// Error returned when a thread-pointer install is rejected by the
/// capability layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("address cannot be installed as the thread pointer")]
pub struct ThreadPointerError;

/// The model-specific register holding the `fs` segment base on x86_64.
///
/// Thread-local accesses on x86_64 are generated as `fs:`-relative loads
/// and stores, so installing the thread pointer means writing this MSR.
#[cfg(target_arch = "x86_64")]
pub const IA32_FS_BASE: u32 = 0xc000_0100;

/// Write the `IA32_FS_BASE` model-specific register.
///
/// Installs `base` as the `fs` segment base, which is the x86_64 thread
/// pointer. Takes effect for the very next `fs:`-relative access.
///
/// # References
///
/// - [Intel SDM Vol. 4: MSR listing, IA32_FS_BASE (0xC0000100)](https://www.intel.com/content/www/us/en/developer/articles/technical/intel-sdm.html)
///
/// # SAFETY
///
/// This function is `naked`, and its body is written in assembly.
/// `wrmsr` takes the MSR index in `ecx` and the value in `edx:eax`; the
/// value arrives in `rdi` per the System V calling convention and is split
/// across the register pair before the write. `wrmsr` raises #GP if `base`
/// is not a canonical address; callers must validate first (see
/// [`install_thread_pointer`]). Requires CPL 0, which always holds in a
/// unikernel image.
#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
pub unsafe extern "C" fn write_fs_base(base: u64) {
    naked_asm!(
        "mov ecx, 0xc0000100", // IA32_FS_BASE
        "mov rax, rdi",        // Value low half in eax
        "mov rdx, rdi",
        "shr rdx, 32",         // Value high half in edx
        "wrmsr",
        "ret",
    );
}

/// Read the `IA32_FS_BASE` model-specific register.
///
/// Returns the currently installed `fs` segment base, i.e. the active
/// x86_64 thread pointer.
///
/// # SAFETY
///
/// This function is `naked`, and its body is written in assembly.
/// `rdmsr` takes the MSR index in `ecx` and returns the value in
/// `edx:eax`; the halves are recombined into `rax` per the System V
/// calling convention. Requires CPL 0.
#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
pub unsafe extern "C" fn read_fs_base() -> u64 {
    naked_asm!(
        "mov ecx, 0xc0000100", // IA32_FS_BASE
        "rdmsr",
        "shl rdx, 32",
        "or rax, rdx",         // Recombine edx:eax into the return register
        "ret",
    );
}

/// Write the `tpidr_el0` system register.
///
/// Installs `base` as the EL0 thread pointer. Generated thread-local
/// accesses on aarch64 are computed as offsets from this register.
///
/// # References
///
/// - [ARM TPIDR_EL0 Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch64-Registers/TPIDR-EL0--EL0-Read-Write-Software-Thread-ID-Register)
///
/// # SAFETY
///
/// This function is `naked`, and its body is written in assembly.
/// The assembly code moves the first argument register `x0` into
/// `tpidr_el0`, according to the AArch64 procedure call standard.
#[cfg(target_arch = "aarch64")]
#[unsafe(naked)]
pub unsafe extern "C" fn write_tpidr_el0(base: u64) {
    naked_asm!(
        "msr tpidr_el0, x0", // Move the value of `x0` into `tpidr_el0`
        "ret",
    );
}

/// Read the `tpidr_el0` system register.
///
/// Returns the currently installed EL0 thread pointer.
///
/// # References
///
/// - [ARM TPIDR_EL0 Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch64-Registers/TPIDR-EL0--EL0-Read-Write-Software-Thread-ID-Register)
///
/// # SAFETY
///
/// This function is `naked`, and its body is written in assembly.
/// The assembly code reads the `tpidr_el0` system register and returns
/// its value in `x0`, according to the AArch64 procedure call standard.
#[cfg(target_arch = "aarch64")]
#[unsafe(naked)]
pub unsafe extern "C" fn read_tpidr_el0() -> u64 {
    naked_asm!(
        "mrs x0, tpidr_el0", // Move the value of `tpidr_el0` into the return register `x0`
        "ret",
    );
}

/// Installs `base` as the thread pointer for the current CPU.
///
/// This is the one capability the TLS subsystem needs from the hardware:
/// after a successful install, generated thread-local accesses resolve
/// relative to `base`.
///
/// Returns [`ThreadPointerError`] if `base` cannot be installed: on
/// x86_64, when it is not a canonical address (`wrmsr` would fault rather
/// than report failure, so the check happens up front). On aarch64 every
/// 64-bit value is installable.
///
/// # Safety
///
/// `base` must point at a properly initialized TLS block for the current
/// execution unit. Installing anything else silently corrupts every
/// subsequent thread-local access.
#[cfg(target_arch = "x86_64")]
pub unsafe fn install_thread_pointer(base: usize) -> Result<(), ThreadPointerError> {
    // Canonical check: bits 63..47 must be a sign extension of bit 47.
    let ext = (base as i64) >> 47;
    if ext != 0 && ext != -1 {
        return Err(ThreadPointerError);
    }
    // SAFETY: `base` is canonical, so the MSR write cannot fault; the
    // caller guarantees it addresses a valid TLS block.
    unsafe { write_fs_base(base as u64) };
    Ok(())
}

/// Installs `base` as the thread pointer for the current CPU.
///
/// See the x86_64 variant for the contract. `tpidr_el0` accepts any
/// 64-bit value, so the install itself cannot fail on aarch64.
///
/// # Safety
///
/// `base` must point at a properly initialized TLS block for the current
/// execution unit.
#[cfg(target_arch = "aarch64")]
pub unsafe fn install_thread_pointer(base: usize) -> Result<(), ThreadPointerError> {
    // SAFETY: the caller guarantees `base` addresses a valid TLS block.
    unsafe { write_tpidr_el0(base as u64) };
    Ok(())
}

/// Resets the x87 floating-point unit to its power-on defaults.
///
/// Must run before any subsystem performs floating-point arithmetic: the
/// loader makes no promise about the FPU state it hands over.
///
/// # Safety
///
/// Discards any in-flight x87 state. Safe during boot, where no
/// floating-point computation can be pending yet.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn fpu_init() {
    // SAFETY: `fninit` only mutates x87-internal state.
    unsafe { core::arch::asm!("fninit", options(nostack, nomem)) };
}

/// Reads the x87 FPU control word.
///
/// Used for the bring-up diagnostics around [`fpu_init`].
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn fpu_control_word() -> u16 {
    let mut cw: u16 = 0;
    // SAFETY: `fnstcw` stores the 16-bit control word to the given memory
    // operand and touches nothing else.
    unsafe {
        core::arch::asm!(
            "fnstcw [{ptr}]",
            ptr = in(reg) &raw mut cw,
            options(nostack),
        )
    };
    cw
}
