//! # PS/2 Keyboard Driver
//!
//! IRQ 1 handler: scancode → ASCII translation and a bounded ring
//! buffer bridging interrupt context to synchronous readers. The
//! producer (the interrupt callback) never blocks and never errors —
//! when the ring is full, new input is silently dropped rather than
//! overwriting unread characters. The consumer blocks in [`getchar`],
//! idling the processor until an interrupt delivers data.
//!
//! We trust that the BIOS has already set up the PS/2 controller; the
//! driver only reads the data port.

use crate::interrupt_lock::InterruptSafeLock;
use crate::interrupts::{self, VECTOR_KEYBOARD};
use x86_64::instructions::port::Port;

/// PS/2 controller data port.
const KEYBOARD_DATA_PORT: u16 = 0x60;

const KB_BUFFER_SIZE: usize = 256;

/// Left/right shift press and release scancodes.
const SC_LSHIFT_DOWN: u8 = 0x2A;
const SC_RSHIFT_DOWN: u8 = 0x36;
const SC_LSHIFT_UP: u8 = 0xAA;
const SC_RSHIFT_UP: u8 = 0xB6;

/// Pad a scancode table out to 128 entries; everything past the prefix
/// is unmapped (zero).
const fn pad128(prefix: &[u8]) -> [u8; 128] {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < prefix.len() {
        table[i] = prefix[i];
        i += 1;
    }
    table
}

/// US keyboard scancode → ASCII (lowercase).
static SCANCODE_MAP: [u8; 128] =
    pad128(b"\x00\x1b1234567890-=\x08\x09qwertyuiop[]\x0a\x00asdfghjkl;'`\x00\\zxcvbnm,./\x00*\x00 ");

/// Shifted variant.
static SCANCODE_MAP_SHIFT: [u8; 128] =
    pad128(b"\x00\x1b!@#$%^&*()_+\x08\x09QWERTYUIOP{}\x0a\x00ASDFGHJKL:\"~\x00|ZXCVBNM<>?\x00*\x00 ");

/// Ring indices, character slots, and modifier state — everything the
/// interrupt handler and synchronous readers share.
///
/// Invariant: `head == tail` means empty; `head` is never advanced
/// onto `tail`, so one slot always stays free and unread data is never
/// overwritten.
struct KeyboardState {
    buffer: [u8; KB_BUFFER_SIZE],
    head: usize,
    tail: usize,
    shift_pressed: bool,
}

impl KeyboardState {
    const fn new() -> Self {
        KeyboardState {
            buffer: [0; KB_BUFFER_SIZE],
            head: 0,
            tail: 0,
            shift_pressed: false,
        }
    }

    /// Decode one scancode and buffer the resulting character, if any.
    fn handle_scancode(&mut self, scancode: u8) {
        match scancode {
            SC_LSHIFT_DOWN | SC_RSHIFT_DOWN => {
                self.shift_pressed = true;
                return;
            }
            SC_LSHIFT_UP | SC_RSHIFT_UP => {
                self.shift_pressed = false;
                return;
            }
            _ => {}
        }

        // Bit 7 set = key release; only presses produce characters.
        if scancode & 0x80 != 0 {
            return;
        }

        let c = if self.shift_pressed {
            SCANCODE_MAP_SHIFT[scancode as usize]
        } else {
            SCANCODE_MAP[scancode as usize]
        };

        // Zero = unmapped scancode.
        if c == 0 {
            return;
        }

        self.push(c);
    }

    /// Producer side: drops `c` if the ring is full.
    fn push(&mut self, c: u8) {
        let next = (self.head + 1) % KB_BUFFER_SIZE;
        if next != self.tail {
            self.buffer[self.head] = c;
            self.head = next;
        }
    }

    /// Consumer side: pop the oldest unread character.
    fn pop(&mut self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        let c = self.buffer[self.tail];
        self.tail = (self.tail + 1) % KB_BUFFER_SIZE;
        Some(c)
    }
}

static KEYBOARD: InterruptSafeLock<KeyboardState> =
    InterruptSafeLock::new(KeyboardState::new(), "KEYBOARD");

/// Bind the keyboard callback to IRQ 1's vector.
pub fn init() {
    interrupts::register(VECTOR_KEYBOARD, on_interrupt);
}

/// The keyboard interrupt callback: read one scancode and decode it.
fn on_interrupt() {
    let scancode = unsafe { Port::<u8>::new(KEYBOARD_DATA_PORT).read() };
    KEYBOARD.lock().handle_scancode(scancode);
}

/// Read one character if one is buffered, without blocking.
pub fn try_getchar() -> Option<u8> {
    KEYBOARD.lock().pop()
}

/// Blocking read of one character.
///
/// Idles the processor between checks; the `hlt` is resumed by
/// interrupt delivery, not by polling. The lock is released before
/// idling — holding it across `hlt` would mask the very interrupt
/// that produces data.
pub fn getchar() -> u8 {
    loop {
        if let Some(c) = try_getchar() {
            return c;
        }
        x86_64::instructions::hlt();
    }
}

/// Read a line with in-place edit semantics. See [`edit_line`].
pub fn read_line(buf: &mut [u8]) -> usize {
    edit_line(buf, getchar)
}

/// The editing loop of [`read_line`], factored over its character
/// source so hosted tests can script keystrokes.
///
/// Newline terminates the line and NUL-terminates `buf`; backspace
/// removes the previous character if any exist; printable characters
/// (≥ space) are appended while capacity remains (one slot is reserved
/// for the terminator); other control characters are ignored.
pub(crate) fn edit_line(buf: &mut [u8], mut next_char: impl FnMut() -> u8) -> usize {
    if buf.is_empty() {
        return 0;
    }

    let mut pos = 0;

    while pos < buf.len() - 1 {
        let c = next_char();

        if c == b'\n' {
            break;
        } else if c == 0x08 {
            if pos > 0 {
                pos -= 1;
            }
        } else if c >= b' ' {
            buf[pos] = c;
            pos += 1;
        }
    }

    buf[pos] = 0;
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(state: &mut KeyboardState, scancodes: &[u8]) {
        for &sc in scancodes {
            state.handle_scancode(sc);
        }
    }

    fn drain(state: &mut KeyboardState) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(c) = state.pop() {
            out.push(c);
        }
        out
    }

    #[test]
    fn decodes_unshifted_characters() {
        let mut kb = KeyboardState::new();
        // h, i, Enter
        pressed(&mut kb, &[0x23, 0x17, 0x1C]);
        assert_eq!(drain(&mut kb), b"hi\n");
    }

    #[test]
    fn shift_selects_the_shifted_table() {
        let mut kb = KeyboardState::new();
        // shift down, 'a', '1', shift up, 'a'
        pressed(&mut kb, &[SC_LSHIFT_DOWN, 0x1E, 0x02, SC_LSHIFT_UP, 0x1E]);
        assert_eq!(drain(&mut kb), b"A!a");
    }

    #[test]
    fn shift_keys_themselves_produce_no_characters() {
        let mut kb = KeyboardState::new();
        pressed(&mut kb, &[SC_RSHIFT_DOWN, SC_RSHIFT_UP]);
        assert_eq!(kb.pop(), None);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut kb = KeyboardState::new();
        // 'a' press, 'a' release
        pressed(&mut kb, &[0x1E, 0x1E | 0x80]);
        assert_eq!(drain(&mut kb), b"a");
    }

    #[test]
    fn unmapped_scancodes_are_discarded() {
        let mut kb = KeyboardState::new();
        // 0x3A (caps lock) maps to zero, 0x7F is past every table entry
        pressed(&mut kb, &[0x3A, 0x7F]);
        assert_eq!(kb.pop(), None);
    }

    #[test]
    fn full_ring_drops_new_input_not_old() {
        let mut kb = KeyboardState::new();
        // Capacity is size - 1: head never advances onto tail.
        for _ in 0..KB_BUFFER_SIZE + 10 {
            kb.push(b'x');
        }
        let drained = drain(&mut kb);
        assert_eq!(drained.len(), KB_BUFFER_SIZE - 1);

        // Oldest unread data survives a flood.
        kb.push(b'1');
        kb.push(b'2');
        for _ in 0..KB_BUFFER_SIZE * 2 {
            kb.push(b'x');
        }
        let drained = drain(&mut kb);
        assert_eq!(&drained[..2], b"12");
        assert_eq!(drained.len(), KB_BUFFER_SIZE - 1);
    }

    #[test]
    fn edit_line_terminates_on_newline() {
        let mut buf = [0xFFu8; 16];
        let script = b"ok\n";
        let mut i = 0;
        let n = edit_line(&mut buf, || {
            let c = script[i];
            i += 1;
            c
        });
        assert_eq!(n, 2);
        assert_eq!(&buf[..2], b"ok");
        assert_eq!(buf[2], 0);
    }

    #[test]
    fn edit_line_backspace_removes_previous_character() {
        let mut buf = [0u8; 16];
        // "cax" + backspace + "t" -> "cat"; leading backspace on an
        // empty line is a no-op.
        let script = b"\x08cax\x08t\n";
        let mut i = 0;
        let n = edit_line(&mut buf, || {
            let c = script[i];
            i += 1;
            c
        });
        assert_eq!(&buf[..n], b"cat");
    }

    #[test]
    fn edit_line_ignores_other_control_characters() {
        let mut buf = [0u8; 16];
        let script = b"a\x01\x1bb\n"; // ^A and ESC vanish
        let mut i = 0;
        let n = edit_line(&mut buf, || {
            let c = script[i];
            i += 1;
            c
        });
        assert_eq!(&buf[..n], b"ab");
    }

    #[test]
    fn edit_line_stops_when_capacity_remains_only_for_terminator() {
        let mut buf = [0u8; 4];
        let script = b"abcdefg\n";
        let mut i = 0;
        let n = edit_line(&mut buf, || {
            let c = script[i];
            i += 1;
            c
        });
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(buf[3], 0);
    }
}
