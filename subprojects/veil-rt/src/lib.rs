//! # veil-rt
//!
//! The boot sequencer: the single entry point the loader reaches with one
//! opaque argument, the minimal C runtime that entry needs for itself
//! (stack protector, boot TLS), and the strictly ordered activation of
//! every subsystem between reset and the guest's `main`.
//!
//! The sequence is linear by construction: one function, no branches
//! back, no loops, reached exactly once per process lifetime. Anything
//! that fails before the guest runs is fatal; see
//! [`veil_platform::abort`].

#![cfg_attr(not(test), no_std)]

#[cfg(target_os = "none")]
extern crate veil_abi; // Emits the identification notes into the image
#[cfg(target_os = "none")]
extern crate veil_panic_handler; // Provides #[panic_handler]

#[cfg(target_os = "none")]
mod boot;
pub mod cmdline;
#[cfg(target_os = "none")]
mod crt;
pub mod start_info;

pub use start_info::StartInfo;
