//! # Thread-Local Storage (TLS) layout and initialization
//!
//! This crate computes the exact byte layout of a TLS block for the target
//! architecture's ABI and populates caller-owned memory with it. It is the
//! leaf of the boot bindings: no heap, no thread library and no other
//! subsystem exists when it runs, so everything here is pure computation
//! over link-time constants plus one in-place write pass.
//!
//! ## ABI variants
//!
//! The ELF TLS ABI places the Thread Control Block (TCB) on one of two
//! sides of the thread-local data, depending on the architecture:
//!
//! **Variant II** (x86_64): the TCB trails the data, and the thread
//! pointer addresses it. The first TCB field must hold the thread
//! pointer's own value, because generated code dereferences `fs:0` to
//! rediscover itself.
//!
//! ```text
//! block                                  tp = block + tdata_len + tbss_len
//! ├────────────────┬────────────────┬────┤
//! │ .tdata copy    │ .tbss (zeroed) │ TCB│
//! └────────────────┴────────────────┴────┘
//!                                     └─ tp slot: holds `tp` itself
//! ```
//!
//! **Variant I** (aarch64): the TCB leads, the thread pointer addresses
//! the block base, and the data begins `size_of::<TcbVariantI>()` bytes
//! in. The second TCB slot is reserved by the ABI.
//!
//! ```text
//! tp = block
//! ├─────────┬────────────────┬────────────────┤
//! │ TCB     │ .tdata copy    │ .tbss (zeroed) │
//! └─────────┴────────────────┴────────────────┘
//!  └─ tp slot: holds `tp` itself
//! ```
//!
//! Some other 64-bit architectures bias Variant II thread-local offsets by
//! a fixed constant (0x7000 on powerpc64); none of the supported targets
//! do, so no bias appears in the layout math.
//!
//! The two placements are architecture-mandated and must not be unified:
//! producing the wrong variant corrupts every thread-local access in the
//! guest, silently.
//!
//! ## Link-time inputs
//!
//! The linker script exports three symbols describing the thread-local
//! template: `_stdata` (the initialized `.tdata` bytes) and `_ltdata` /
//! `_ltbss`, whose *addresses* encode the section lengths. They are read
//! exactly once, into a [`TlsImage`], and injected into the layout math;
//! nothing else in the crate touches globals.
//!
//! ## Ownership
//!
//! A TLS block is always caller-owned: the caller allocates exactly
//! [`TlsImage::size`] bytes (pre-zeroed, so `.tbss` needs no write) and
//! this crate mutates them in place. Nothing here allocates, and distinct
//! blocks can be initialized concurrently without locking.

#![cfg_attr(not(test), no_std)]

use core::{mem::size_of, ptr};

use static_assertions::const_assert_eq;

/// The two ABI-defined placements of the TCB within a TLS block.
///
/// Exactly one variant is active per build, fixed by the target
/// architecture; see [`Variant::ACTIVE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// TCB leads the thread-local data (aarch64).
    I,
    /// TCB trails the thread-local data (x86_64).
    II,
}

impl Variant {
    /// The variant mandated by the target architecture's ABI.
    #[cfg(target_arch = "x86_64")]
    pub const ACTIVE: Variant = Variant::II;

    /// The variant mandated by the target architecture's ABI.
    #[cfg(target_arch = "aarch64")]
    pub const ACTIVE: Variant = Variant::I;

    /// Size in bytes of this variant's TCB.
    pub const fn tcb_size(self) -> usize {
        match self {
            Variant::I => size_of::<TcbVariantI>(),
            Variant::II => size_of::<TcbVariantII>(),
        }
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("unsupported architecture: no TLS variant defined for this target");

/// Thread Control Block for Variant I layouts.
///
/// The thread pointer addresses this record at the block base; the ABI
/// reserves the slot after the pointer.
#[repr(C)]
pub struct TcbVariantI {
    /// Self-referential thread pointer.
    pub tp: usize,
    _reserved: usize,
}

/// Thread Control Block for Variant II layouts.
///
/// The thread pointer addresses this record at the end of the block.
#[repr(C)]
pub struct TcbVariantII {
    /// Self-referential thread pointer.
    pub tp: usize,
}

const_assert_eq!(size_of::<TcbVariantI>(), 2 * size_of::<usize>());
const_assert_eq!(size_of::<TcbVariantII>(), size_of::<usize>());

/// Errors surfaced by TLS operations.
///
/// Every variant is an invalid-argument condition: the operations have no
/// other failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TlsError {
    /// The TLS block address is null.
    #[error("TLS block address is null")]
    NullBlock,
    /// The TLS block address is not aligned for a thread-pointer write.
    #[error("TLS block address is not pointer-aligned")]
    MisalignedBlock,
    /// The CPU capability layer rejected the thread-pointer install.
    #[error("thread pointer install rejected: {0}")]
    InstallRejected(#[from] veil_cpu::control_regs::ThreadPointerError),
}

/// Byte layout of one TLS block: a variant plus the two section lengths.
///
/// All methods are pure offset arithmetic; the block itself is modeled as
/// a base address, never as a typed structure overlay, because the
/// internal placement differs per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsLayout {
    variant: Variant,
    tdata_len: usize,
    tbss_len: usize,
}

impl TlsLayout {
    /// Creates a layout from a variant and the `.tdata` / `.tbss` lengths.
    pub const fn new(variant: Variant, tdata_len: usize, tbss_len: usize) -> Self {
        Self {
            variant,
            tdata_len,
            tbss_len,
        }
    }

    /// The ABI variant this layout implements.
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// Length of the initialized thread-local data section.
    pub const fn tdata_len(&self) -> usize {
        self.tdata_len
    }

    /// Length of the zero-initialized thread-local data section.
    pub const fn tbss_len(&self) -> usize {
        self.tbss_len
    }

    /// Total size in bytes of one TLS block: both sections plus the TCB.
    pub const fn size(&self) -> usize {
        self.tdata_len + self.tbss_len + self.variant.tcb_size()
    }

    /// Address of the thread-pointer slot within the block at `base`.
    ///
    /// Variant II places it past the data sections; Variant I places it at
    /// the block base.
    pub const fn tp_offset(&self, base: usize) -> usize {
        match self.variant {
            Variant::I => base,
            Variant::II => base + self.tdata_len + self.tbss_len,
        }
    }

    /// Address where the `.tdata` template is copied within the block at
    /// `base`.
    ///
    /// Mirrors [`tp_offset`](Self::tp_offset): whichever end the TCB
    /// occupies, the data occupies the other.
    pub const fn data_offset(&self, base: usize) -> usize {
        match self.variant {
            Variant::I => base + self.variant.tcb_size(),
            Variant::II => base,
        }
    }
}

/// The link-time TLS template: a layout plus the `.tdata` bytes to copy.
///
/// The process-wide instance is built once from linker symbols (see
/// [`active`]); tests construct synthetic images for either variant.
#[derive(Debug, Clone, Copy)]
pub struct TlsImage {
    template: *const u8,
    layout: TlsLayout,
}

impl TlsImage {
    /// Creates an image from a `.tdata` template pointer and a layout.
    ///
    /// `template` must be valid for reads of `layout.tdata_len()` bytes
    /// for as long as [`init`](Self::init) is called on the image.
    pub const fn new(template: *const u8, layout: TlsLayout) -> Self {
        Self { template, layout }
    }

    /// The layout of blocks initialized from this image.
    pub const fn layout(&self) -> TlsLayout {
        self.layout
    }

    /// Total size in bytes a caller must allocate for one TLS block.
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    /// Address of the thread-pointer slot within the block at `base`.
    pub const fn tp_offset(&self, base: usize) -> usize {
        self.layout.tp_offset(base)
    }

    /// Initializes the TLS block at `block` in place.
    ///
    /// Writes the self-referential thread pointer at
    /// [`tp_offset`](Self::tp_offset) (the slot holds its own address,
    /// because generated code dereferences the thread pointer to find
    /// itself), then copies the `.tdata` template into the data area. The
    /// `.tbss` region is assumed pre-zeroed by the caller's allocation and
    /// is not written.
    ///
    /// Exactly [`size`](Self::size) bytes starting at `block` are mutated;
    /// no other memory is touched. Calling this twice on the same block
    /// yields byte-identical contents.
    ///
    /// Returns [`TlsError::NullBlock`] for a null address and
    /// [`TlsError::MisalignedBlock`] for one that is not pointer-aligned,
    /// in both cases before any write.
    ///
    /// # Safety
    ///
    /// `block` must address at least [`size`](Self::size) bytes owned by
    /// the caller and not in use by any live execution unit. Sizing is the
    /// caller's contract: no bounds information exists here to check it.
    pub unsafe fn init(&self, block: usize) -> Result<(), TlsError> {
        if block == 0 {
            return Err(TlsError::NullBlock);
        }
        if block % size_of::<usize>() != 0 {
            return Err(TlsError::MisalignedBlock);
        }

        // Set the thread pointer at its proper place in the block.
        let tp = self.layout.tp_offset(block);
        // SAFETY: `tp` lies within the caller-owned block (checked layout
        // math) and is pointer-aligned because `block` is and both section
        // lengths offset it by whole sections.
        unsafe { (tp as *mut usize).write(tp) };

        // Copy the .tdata template values.
        // SAFETY: source is the link-time template, valid for
        // `tdata_len` reads per `new`; destination lies within the
        // caller-owned block; the ranges cannot overlap because the
        // template is immutable link-time data.
        unsafe {
            ptr::copy_nonoverlapping(
                self.template,
                self.layout.data_offset(block) as *mut u8,
                self.layout.tdata_len(),
            )
        };

        Ok(())
    }
}

/// Lengths of the `.tdata` and `.tbss` sections, encoded by the linker
/// script as symbol *addresses*, plus the start of the `.tdata` template.
#[cfg(target_os = "none")]
unsafe extern "C" {
    /// Start of the initialized thread-local template.
    static _stdata: u8;
    /// `.tdata` length, encoded as this symbol's address.
    static _ltdata: u8;
    /// `.tbss` length, encoded as this symbol's address.
    static _ltbss: u8;
}

/// Returns the process-wide TLS image, built from the linker-provided
/// template description and the target's ABI variant.
///
/// The description is fixed at link time and read-only for the life of the
/// process image, so this is a pure function.
#[cfg(target_os = "none")]
pub fn active() -> TlsImage {
    // SAFETY: only the symbol addresses are taken; the linker script
    // guarantees all three exist in every image.
    let (template, tdata_len, tbss_len) = unsafe {
        (
            ptr::addr_of!(_stdata),
            ptr::addr_of!(_ltdata) as usize,
            ptr::addr_of!(_ltbss) as usize,
        )
    };
    TlsImage::new(template, TlsLayout::new(Variant::ACTIVE, tdata_len, tbss_len))
}

/// Total size in bytes of one TLS block for this image.
///
/// Callers allocate exactly this many (pre-zeroed) bytes per execution
/// unit.
#[cfg(target_os = "none")]
pub fn size() -> usize {
    active().size()
}

/// Address of the thread-pointer slot within the block at `block`.
#[cfg(target_os = "none")]
pub fn tp_offset(block: usize) -> usize {
    active().tp_offset(block)
}

/// Initializes the TLS block at `block` from the process-wide image.
///
/// See [`TlsImage::init`] for the contract.
///
/// # Safety
///
/// `block` must address at least [`size`] bytes owned by the caller and
/// not in use by any live execution unit.
#[cfg(target_os = "none")]
pub unsafe fn init(block: usize) -> Result<(), TlsError> {
    // SAFETY: forwarded caller contract.
    unsafe { active().init(block) }
}

/// Installs `base` into the CPU's thread-pointer register.
///
/// Delegates to the [`veil_cpu`] capability layer; the underlying register
/// mechanism is per-architecture and not this crate's concern. A rejected
/// install surfaces as [`TlsError::InstallRejected`].
///
/// # Safety
///
/// `base` must be the [`tp_offset`] of a block previously initialized with
/// [`init`]. Installing anything else corrupts every subsequent
/// thread-local access of the current execution unit.
pub unsafe fn set_base(base: usize) -> Result<(), TlsError> {
    // SAFETY: forwarded caller contract.
    unsafe { veil_cpu::control_regs::install_thread_pointer(base)? };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A pointer-aligned block with canary padding past the layout's size.
    #[repr(align(16))]
    struct Block([u8; 96]);

    static TDATA: [u8; 16] = [
        0xd0, 0xd1, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xdb, 0xdc, 0xdd, 0xde,
        0xdf,
    ];

    fn image(variant: Variant) -> TlsImage {
        TlsImage::new(TDATA.as_ptr(), TlsLayout::new(variant, TDATA.len(), 8))
    }

    #[test]
    fn variant_ii_size_and_tp_offset() {
        // tdata 16 + tbss 8 + one-pointer TCB.
        let layout = TlsLayout::new(Variant::II, 16, 8);
        assert_eq!(layout.size(), 32);
        assert_eq!(layout.tp_offset(0x1000), 0x1018);
        assert_eq!(layout.data_offset(0x1000), 0x1000);
    }

    #[test]
    fn variant_i_tp_leads_and_data_follows_tcb() {
        let layout = TlsLayout::new(Variant::I, 16, 8);
        assert_eq!(layout.size(), 16 + 8 + 2 * size_of::<usize>());
        assert_eq!(layout.tp_offset(0x1000), 0x1000);
        assert_eq!(layout.data_offset(0x1000), 0x1000 + 2 * size_of::<usize>());
    }

    #[test]
    fn init_rejects_null_block_for_both_variants() {
        for variant in [Variant::I, Variant::II] {
            let err = unsafe { image(variant).init(0) };
            assert_eq!(err, Err(TlsError::NullBlock));
        }
    }

    #[test]
    fn init_rejects_misaligned_block() {
        let mut block = Block([0; 96]);
        let base = block.0.as_mut_ptr() as usize;
        let err = unsafe { image(Variant::II).init(base + 1) };
        assert_eq!(err, Err(TlsError::MisalignedBlock));
    }

    #[test]
    fn init_writes_self_referential_thread_pointer() {
        for variant in [Variant::I, Variant::II] {
            let image = image(variant);
            let mut block = Block([0; 96]);
            let base = block.0.as_mut_ptr() as usize;

            unsafe { image.init(base) }.unwrap();

            let tp = image.tp_offset(base);
            let stored = unsafe { (tp as *const usize).read() };
            assert_eq!(stored, tp);
        }
    }

    #[test]
    fn init_copies_template_bytes_exactly() {
        for variant in [Variant::I, Variant::II] {
            let image = image(variant);
            let mut block = Block([0; 96]);
            let base = block.0.as_mut_ptr() as usize;

            unsafe { image.init(base) }.unwrap();

            let data = image.layout().data_offset(base) as *const u8;
            let copied = unsafe { core::slice::from_raw_parts(data, TDATA.len()) };
            assert_eq!(copied, &TDATA[..]);
        }
    }

    #[test]
    fn init_touches_only_the_block() {
        let image = image(Variant::II);
        let mut block = Block([0xaa; 96]);
        let base = block.0.as_mut_ptr() as usize;

        unsafe { image.init(base) }.unwrap();

        // Everything past size() keeps the canary value.
        assert!(block.0[image.size()..].iter().all(|&b| b == 0xaa));
    }

    #[test]
    fn init_twice_is_idempotent() {
        for variant in [Variant::I, Variant::II] {
            let image = image(variant);
            let mut block = Block([0; 96]);
            let base = block.0.as_mut_ptr() as usize;

            unsafe { image.init(base) }.unwrap();
            let first = block.0;

            unsafe { image.init(base) }.unwrap();
            assert_eq!(block.0, first);
        }
    }
}
