//! Extended-state feature control (x86_64)
//!
//! Vector units above baseline SSE must be enabled explicitly through the
//! XCR0 extended control register before the corresponding instructions
//! may execute. This module exposes the three register effects the
//! bring-up path needs: read the state-component mask, write it, and probe
//! whether the CPU implements AVX2 at all.
//!
//! Enabling AVX is auxiliary (nothing in the bindings requires it), so
//! policy, such as when to enable and what to log, lives with the boot
//! sequencer, not here.

use core::arch::asm;

bitflags::bitflags! {
    /// XCR0 state-component mask.
    ///
    /// Each bit permits one class of processor state to be used and
    /// context-switched. `X87` is hardwired to 1; `SSE` and `AVX` must
    /// both be set for AVX instructions to execute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Xcr0: u64 {
        /// x87 FPU state. Always set.
        const X87 = 1 << 0;
        /// SSE state (XMM registers, MXCSR).
        const SSE = 1 << 1;
        /// AVX state (upper halves of the YMM registers).
        const AVX = 1 << 2;
    }
}

/// Reads the XCR0 extended control register.
///
/// # Safety
///
/// `xgetbv` faults unless CR4.OSXSAVE is set. The loaders Veil boots under
/// hand over the CPU with XSAVE enabled; anything else is a platform
/// contract violation.
#[inline]
pub unsafe fn read_xcr0() -> Xcr0 {
    let (lo, hi): (u32, u32);
    // SAFETY: `xgetbv` with ecx=0 reads XCR0 into edx:eax; the caller
    // guarantees OSXSAVE is enabled.
    unsafe {
        asm!(
            "xgetbv",            // XCR[ecx] into edx:eax
            in("ecx") 0u32,
            out("eax") lo,
            out("edx") hi,
            options(nostack, nomem),
        );
    }
    Xcr0::from_bits_retain((hi as u64) << 32 | lo as u64)
}

/// Writes the XCR0 extended control register.
///
/// # Safety
///
/// `xsetbv` requires CPL 0 and faults on an invalid mask (`X87` clear, or
/// `AVX` set without `SSE`). The caller must pass a mask derived from
/// [`read_xcr0`] with only supported bits added.
#[inline]
pub unsafe fn write_xcr0(mask: Xcr0) {
    let bits = mask.bits();
    // SAFETY: `xsetbv` with ecx=0 writes edx:eax into XCR0; the caller
    // guarantees the mask is valid for this CPU.
    unsafe {
        asm!(
            "xsetbv",            // edx:eax into XCR[ecx]
            in("ecx") 0u32,
            in("eax") bits as u32,
            in("edx") (bits >> 32) as u32,
            options(nostack, nomem),
        );
    }
}

/// Returns whether the CPU implements AVX2.
///
/// Probes CPUID leaf 7 sub-leaf 0, EBX bit 5. Returns `false` when the CPU
/// does not report structured extended feature leaves at all.
pub fn avx2_supported() -> bool {
    let max_leaf = cpuid(0, 0).0;
    if max_leaf < 7 {
        return false;
    }
    cpuid(7, 0).1 & (1 << 5) != 0
}

/// Executes `cpuid` for the given leaf and sub-leaf.
///
/// Returns `(eax, ebx, ecx, edx)`.
fn cpuid(leaf: u32, subleaf: u32) -> (u32, u32, u32, u32) {
    let (eax, ecx, edx): (u32, u32, u32);
    let ebx: u64;
    // SAFETY: `cpuid` only writes the four named registers. LLVM reserves
    // rbx internally, so it is parked in a scratch register around the
    // instruction.
    unsafe {
        asm!(
            "mov {scratch:r}, rbx",  // rbx is reserved by LLVM
            "cpuid",
            "xchg {scratch:r}, rbx", // Recover rbx, capture ebx
            scratch = out(reg) ebx,
            inout("eax") leaf => eax,
            inout("ecx") subleaf => ecx,
            out("edx") edx,
            options(nostack, nomem),
        );
    }
    (eax, ebx as u32, ecx, edx)
}
