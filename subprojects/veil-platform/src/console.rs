//! Diagnostic console
//!
//! Early serial output plus the [`log`] facade wiring. On x86_64 the
//! console is the COM1 16550 UART driven over port I/O; on aarch64 it is
//! the PL011 at the virt machine's standard address. Output is polled and
//! unbuffered: at this stage there are no interrupts to wait on and no
//! allocator to buffer with.

use core::fmt::Write;

use log::{Level, LevelFilter, Metadata, Record};

/// COM1 base port.
#[cfg(target_arch = "x86_64")]
const COM1: u16 = 0x3f8;

/// PL011 UART base of the virt machine memory map.
#[cfg(target_arch = "aarch64")]
const PL011_BASE: usize = 0x0900_0000;

/// Formatting scratch for one log record.
const LOG_BUFFER_SIZE: usize = 512;

/// Initializes the console device and installs the logger.
///
/// Must run before any other subsystem so their milestone diagnostics have
/// somewhere to go. Called exactly once, from the boot sequencer.
pub fn init() {
    device::init();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Writes raw bytes to the console, translating `\n` to `\r\n`.
pub fn write_bytes(bytes: &[u8]) {
    for &b in bytes {
        if b == b'\n' {
            device::write_byte(b'\r');
        }
        device::write_byte(b);
    }
}

/// Global logger instance.
static LOGGER: Console = Console;

/// Logger that formats each record into a fixed buffer and pushes it out
/// over the serial device.
struct Console;

impl log::Log for Console {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        let mut buf = [0u8; LOG_BUFFER_SIZE];
        let mut writer = BufferWriter {
            buf: &mut buf,
            pos: 0,
        };
        let _ = write!(writer, "[{}] {}\n", level, record.args());
        let written = writer.pos;
        write_bytes(&buf[..written]);
    }

    fn flush(&self) {}
}

/// Fixed-buffer `fmt::Write` sink; excess output is dropped, not grown.
struct BufferWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl core::fmt::Write for BufferWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len().saturating_sub(self.pos);
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

#[cfg(target_arch = "x86_64")]
mod device {
    use veil_cpu::port::{inb, outb};

    use super::COM1;

    /// Programs the UART: no interrupts, 115200 baud, 8n1, FIFOs on.
    pub(super) fn init() {
        // SAFETY: all writes address the COM1 register block only.
        unsafe {
            outb(COM1 + 1, 0x00); // Interrupts off
            outb(COM1 + 3, 0x80); // DLAB on
            outb(COM1 + 0, 0x01); // Divisor 1 (115200 baud), low byte
            outb(COM1 + 1, 0x00); // Divisor high byte
            outb(COM1 + 3, 0x03); // DLAB off, 8 data bits, no parity, 1 stop
            outb(COM1 + 2, 0xc7); // FIFOs enabled and cleared
        }
    }

    /// Transmits one byte, polling until the holding register is free.
    pub(super) fn write_byte(b: u8) {
        // SAFETY: reads the line status register and writes the data
        // register; no other device state is touched.
        unsafe {
            while inb(COM1 + 5) & 0x20 == 0 {}
            outb(COM1, b);
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod device {
    use super::PL011_BASE;

    /// The PL011 arrives programmed by firmware; nothing to do.
    pub(super) fn init() {}

    /// Transmits one byte, polling while the transmit FIFO is full.
    pub(super) fn write_byte(b: u8) {
        let dr = PL011_BASE as *mut u32;
        let fr = (PL011_BASE + 0x18) as *const u32;
        // SAFETY: volatile accesses to the PL011 data and flag registers
        // at their fixed mapping; no other memory is touched.
        unsafe {
            while core::ptr::read_volatile(fr) & (1 << 5) != 0 {}
            core::ptr::write_volatile(dr, b as u32);
        }
    }
}
