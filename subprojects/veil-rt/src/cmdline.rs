//! Command-line capture
//!
//! The tender hands over a raw command line living wherever the platform
//! put it. The guest gets a stable copy: leading whitespace stripped,
//! re-homed into a static buffer that outlives everything, truncated with
//! a warning when it does not fit. There is no tokenization here; the
//! guest decides what its arguments mean.

use core::ffi::{CStr, c_char};

/// Fixed capacity for the captured command line, NUL included.
pub const CMDLINE_CAPACITY: usize = 8192;

static mut CMDLINE: [u8; CMDLINE_CAPACITY] = [0; CMDLINE_CAPACITY];

/// Copies the raw command line into the static buffer and returns the
/// stable NUL-terminated form for the start information record.
///
/// # Safety
///
/// Must be called at most once, from the boot path, before the guest
/// runs; it writes the process-wide buffer without locking.
pub unsafe fn parse(raw: &CStr) -> *const c_char {
    // SAFETY: single-threaded boot path, sole writer of the buffer.
    let buf = unsafe {
        let raw_ptr = &raw mut CMDLINE;
        core::slice::from_raw_parts_mut(raw_ptr as *mut u8, CMDLINE_CAPACITY)
    };

    let (len, truncated) = capture(buf, raw.to_bytes());
    if truncated {
        log::warn!("cmdline: truncated to {} bytes", CMDLINE_CAPACITY - 1);
    }
    buf[len] = 0;
    buf.as_ptr().cast()
}

/// Writes the stripped command line into `buf`, reserving one byte for
/// the NUL terminator. Returns the number of bytes written and whether
/// input was dropped.
fn capture(buf: &mut [u8], raw: &[u8]) -> (usize, bool) {
    let stripped = strip_leading_whitespace(raw);
    let capacity = buf.len() - 1;
    let len = stripped.len().min(capacity);
    buf[..len].copy_from_slice(&stripped[..len]);
    (len, stripped.len() > capacity)
}

/// Strips leading ASCII whitespace; the tender may pad the line it hands
/// over.
fn strip_leading_whitespace(raw: &[u8]) -> &[u8] {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    &raw[start..]
}

#[cfg(test)]
mod tests {
    use super::{capture, strip_leading_whitespace};

    #[test]
    fn strips_leading_whitespace_only() {
        assert_eq!(strip_leading_whitespace(b"  \t guest.ten --x"), b"guest.ten --x");
        assert_eq!(strip_leading_whitespace(b"guest.ten  "), b"guest.ten  ");
    }

    #[test]
    fn all_whitespace_becomes_empty() {
        assert_eq!(strip_leading_whitespace(b" \t\n "), b"");
    }

    #[test]
    fn capture_copies_verbatim_when_it_fits() {
        let mut buf = [0xffu8; 16];
        let (len, truncated) = capture(&mut buf, b" hello");
        assert_eq!(&buf[..len], b"hello");
        assert!(!truncated);
    }

    #[test]
    fn capture_truncates_and_reports_it() {
        let mut buf = [0u8; 8];
        let (len, truncated) = capture(&mut buf, b"0123456789");
        // One byte is reserved for the terminator.
        assert_eq!(len, 7);
        assert_eq!(&buf[..len], b"0123456");
        assert!(truncated);
    }

    #[test]
    fn empty_input_is_an_empty_line() {
        let mut buf = [0u8; 8];
        let (len, truncated) = capture(&mut buf, b"");
        assert_eq!(len, 0);
        assert!(!truncated);
    }
}
