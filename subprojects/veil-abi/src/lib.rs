//! # veil-abi
//!
//! Binary identification metadata for Veil guest images.
//!
//! Tenders and host kernels identify a Veil image by ELF notes embedded
//! verbatim in the binary, not by anything executable:
//!
//! - the **ABI note**: the fixed target identifier plus the ABI version
//!   integer, which a tender checks before loading;
//! - the **OpenBSD identification note**: impersonates an OpenBSD
//!   executable so host kernels that gate execution on that note (the
//!   spt-style tenders run as ordinary OpenBSD processes) accept the
//!   image;
//! - the **`.interp` entry**: a deliberately non-existent interpreter
//!   path, which keeps generic ELF tooling treating the image as a
//!   dynamic-looking executable without ever invoking a real interpreter.
//!
//! This crate must come first in member link order so the notes land
//! ahead of all other boot code in the image; the workspace member list
//! and the linker script preserve that.
//!
//! All emitting statics are gated to freestanding targets; hosted builds
//! of the workspace only see the types and constants.

#![no_std]

use static_assertions::const_assert_eq;

/// ABI version implemented by these bindings.
///
/// Version 2 is the current shared-memory channel ABI of the separation
/// kernel targets.
pub const ABI_VERSION: u32 = 2;

/// The binding targets a tender can identify from the ABI note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AbiTarget {
    /// Hardware-virtualized tender.
    Hvt = 1,
    /// Sandboxed-process tender.
    Spt = 2,
    /// Separation-kernel shared-memory target.
    Shm = 3,
}

/// The target identifier baked into this build's ABI note.
pub const ABI_TARGET: AbiTarget = AbiTarget::Shm;

/// Payload of the ABI note: what a tender reads to decide whether it can
/// run this image.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AbiInfo {
    /// One of the [`AbiTarget`] discriminants.
    pub target: u32,
    /// The [`ABI_VERSION`] the image was built against.
    pub version: u32,
}

const_assert_eq!(size_of::<AbiInfo>(), 8);

/// ELF note header: name size, descriptor size, note type.
///
/// Name and descriptor follow the header, each padded to 4-byte
/// alignment.
#[cfg(target_os = "none")]
#[derive(Debug, Clone, Copy)]
#[repr(C)]
struct NoteHeader {
    namesz: u32,
    descsz: u32,
    r#type: u32,
}

/// The complete ABI note record as it appears in the image.
#[cfg(target_os = "none")]
#[repr(C)]
struct AbiNote {
    header: NoteHeader,
    /// "Veil\0", padded to 4-byte alignment.
    name: [u8; 8],
    desc: AbiInfo,
}

#[cfg(target_os = "none")]
const_assert_eq!(size_of::<NoteHeader>(), 12);
#[cfg(target_os = "none")]
const_assert_eq!(size_of::<AbiNote>(), 28);

/// The ABI note emitted into every image linked against these bindings.
#[cfg(target_os = "none")]
#[used]
#[unsafe(link_section = ".note.veil.abi")]
static ABI_NOTE: AbiNote = AbiNote {
    header: NoteHeader {
        namesz: 5,
        descsz: size_of::<AbiInfo>() as u32,
        r#type: 1,
    },
    name: *b"Veil\0\0\0\0",
    desc: AbiInfo {
        target: ABI_TARGET as u32,
        version: ABI_VERSION,
    },
};

/// The OpenBSD identification note record.
#[cfg(target_os = "none")]
#[repr(C)]
struct OpenBsdNote {
    header: NoteHeader,
    /// "OpenBSD\0" is exactly 4-byte aligned already.
    name: [u8; 8],
    desc: u32,
}

#[cfg(target_os = "none")]
const_assert_eq!(size_of::<OpenBsdNote>(), 24);

/// Impersonates an OpenBSD executable.
///
/// The OpenBSD kernel refuses to execute images without this note; tenders
/// that run as ordinary OpenBSD processes therefore need it present in the
/// guest image they re-exec.
#[cfg(target_os = "none")]
#[used]
#[unsafe(link_section = ".note.openbsd.ident")]
static OPENBSD_NOTE: OpenBsdNote = OpenBsdNote {
    header: NoteHeader {
        namesz: 8,
        descsz: 4,
        r#type: 1,
    },
    name: *b"OpenBSD\0",
    desc: 0,
};

/// The `.interp` entry. The path never resolves; only its presence
/// matters.
#[cfg(target_os = "none")]
#[used]
#[unsafe(link_section = ".interp")]
static INTERP: [u8; 19] = *b"/nonexistent/veil/\0";
