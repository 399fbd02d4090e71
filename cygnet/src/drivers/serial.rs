//! Serial Port Driver (UART 16550, COM1)
//!
//! The kernel's channel to the outside world: boot log output, and the
//! half-duplex message link the AI bridge front end rides on. Messages
//! are framed by a single EOT byte rather than a length prefix, so a
//! slow or partial remote writer never wedges the protocol — though an
//! EOT inside a payload truncates it early (known protocol limitation).

use crate::drivers::pit;
use bitflags::bitflags;
use core::fmt;
use spin::Mutex;
use x86_64::instructions::port::Port;

/// COM1 base port
const COM1: u16 = 0x3F8;

/// Serial port registers (offsets from base)
const DATA: u16 = 0; // Data register (DLAB=0)
const INT_ENABLE: u16 = 1; // Interrupt Enable (DLAB=0)
const FIFO_CTRL: u16 = 2; // FIFO Control
const LINE_CTRL: u16 = 3; // Line Control
const MODEM_CTRL: u16 = 4; // Modem Control
const LINE_STATUS: u16 = 5; // Line Status
const DIVISOR_LSB: u16 = 0; // Divisor Latch LSB (DLAB=1)
const DIVISOR_MSB: u16 = 1; // Divisor Latch MSB (DLAB=1)

/// End-of-transmission sentinel delimiting messages on the wire.
pub const EOT: u8 = 0x04;

bitflags! {
    /// Line Status Register bits we poll.
    struct LineStatus: u8 {
        const DATA_READY = 1 << 0;
        const TRANSMIT_EMPTY = 1 << 5;
    }
}

/// Serial port instance
pub struct SerialPort {
    data: Port<u8>,
    int_enable: Port<u8>,
    fifo_ctrl: Port<u8>,
    line_ctrl: Port<u8>,
    modem_ctrl: Port<u8>,
    line_status: Port<u8>,
}

impl SerialPort {
    /// Create a new serial port instance (doesn't initialize hardware)
    const fn new(base: u16) -> Self {
        Self {
            data: Port::new(base + DATA),
            int_enable: Port::new(base + INT_ENABLE),
            fifo_ctrl: Port::new(base + FIFO_CTRL),
            line_ctrl: Port::new(base + LINE_CTRL),
            modem_ctrl: Port::new(base + MODEM_CTRL),
            line_status: Port::new(base + LINE_STATUS),
        }
    }

    /// Initialize the serial port.
    ///
    /// Sets up 115200 baud, 8N1 (8 data bits, no parity, 1 stop bit).
    /// Called once at boot; not re-entrant.
    pub unsafe fn init(&mut self) {
        // Disable UART interrupts; this port is polled.
        self.int_enable.write(0x00);

        // Enable DLAB to set the baud rate divisor.
        self.line_ctrl.write(0x80);

        // Divisor 1 = 115200 baud.
        Port::<u8>::new(COM1 + DIVISOR_LSB).write(0x01);
        Port::<u8>::new(COM1 + DIVISOR_MSB).write(0x00);

        // 8 bits, no parity, 1 stop bit; DLAB back off.
        self.line_ctrl.write(0x03);

        // Enable FIFO, clear buffers, 14-byte threshold.
        self.fifo_ctrl.write(0xC7);

        // DTR, RTS, OUT2.
        self.modem_ctrl.write(0x0B);
    }

    fn line_status(&mut self) -> LineStatus {
        LineStatus::from_bits_truncate(unsafe { self.line_status.read() })
    }

    fn transmit_ready(&mut self) -> bool {
        self.line_status().contains(LineStatus::TRANSMIT_EMPTY)
    }

    fn data_available(&mut self) -> bool {
        self.line_status().contains(LineStatus::DATA_READY)
    }

    /// Write a byte, polling until the transmitter is ready.
    pub fn write_byte(&mut self, byte: u8) {
        while !self.transmit_ready() {
            core::hint::spin_loop();
        }
        unsafe {
            self.data.write(byte);
        }
    }

    /// Write a string as raw bytes (no framing).
    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    /// Send one framed message: the bytes of `msg` followed by EOT, so
    /// the remote peer can delimit it without a length prefix.
    pub fn send_message(&mut self, msg: &str) {
        self.write_str(msg);
        self.write_byte(EOT);
    }

    /// Read one byte if the receiver has one, without blocking.
    pub fn try_read(&mut self) -> Option<u8> {
        if self.data_available() {
            Some(unsafe { self.data.read() })
        } else {
            None
        }
    }
}

/// The framing/timeout core of [`read_line`], generic over the byte
/// source, clock, and idle primitive so hosted tests can stand in a
/// simulated peer.
pub(crate) fn read_framed(
    buf: &mut [u8],
    timeout_secs: u64,
    mut poll: impl FnMut() -> Option<u8>,
    mut seconds: impl FnMut() -> u64,
    mut idle: impl FnMut(),
) -> usize {
    let mut pos = 0;
    let mut last_progress = seconds();

    while pos < buf.len() {
        if timeout_secs > 0 && seconds() - last_progress > timeout_secs {
            break;
        }

        match poll() {
            Some(EOT) => break,
            Some(byte) => {
                buf[pos] = byte;
                pos += 1;
                last_progress = seconds();
            }
            None => idle(),
        }
    }

    pos
}

/// Global serial port instance.
///
/// A plain spinlock is enough: nothing in interrupt context writes to
/// the port during normal operation (exception reports only fire on
/// faults, where a wedged lock is the least of our problems).
static SERIAL1: Mutex<SerialPort> = Mutex::new(SerialPort::new(COM1));

/// Initialize COM1 (call once during boot).
pub fn init() {
    unsafe {
        SERIAL1.lock().init();
    }
}

/// Write a byte to COM1.
pub fn write_byte(byte: u8) {
    SERIAL1.lock().write_byte(byte);
}

/// Write a string to COM1 (raw, unframed).
pub fn write_str(s: &str) {
    SERIAL1.lock().write_str(s);
}

/// Send one EOT-framed message over COM1.
pub fn send_message(msg: &str) {
    SERIAL1.lock().send_message(msg);
}

/// Read one framed message from COM1 into `buf`, returning the byte
/// count.
///
/// Accumulates until EOT (not stored), the buffer fills, or
/// `timeout_secs` pass without a byte arriving — the deadline resets
/// on every byte of progress. A zero timeout never expires.
///
/// The port lock is taken per poll and released before each idle
/// `hlt`, so interrupt-context output (exception reports) can still
/// reach the port while a read is blocked.
pub fn read_line(buf: &mut [u8], timeout_secs: u64) -> usize {
    read_framed(
        buf,
        timeout_secs,
        || SERIAL1.lock().try_read(),
        pit::seconds,
        x86_64::instructions::hlt,
    )
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        SerialPort::write_str(self, s);
        Ok(())
    }
}

/// Macro for serial output (like print!)
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::drivers::serial::_print(format_args!($($arg)*))
    };
}

/// Macro for serial output with newline (like println!)
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}

/// Internal print function for macro
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    let _ = SERIAL1.lock().write_fmt(args);
}
