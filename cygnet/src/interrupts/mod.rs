//! # The Interrupt Dispatch Core
//!
//! Three pieces make a keystroke or a timer tick reach its driver:
//! 1. The PIC (`pic8259`) remapped so IRQs 0-15 land on vectors 32-47
//! 2. The IDT (`x86_64`) with one minimal stub per vector
//! 3. A dense 256-entry registration table the stubs dispatch through
//!
//! Drivers bind a plain `fn()` to their vector with [`register`]; the
//! stub for that vector forwards to [`dispatch`], which runs the bound
//! callback (or nothing) with interrupts masked for its whole duration.
//! Re-registering a vector overwrites the previous binding.

#[cfg(not(test))]
pub mod idt;

use crate::interrupt_lock::InterruptSafeLock;
use pic8259::ChainedPics;

/// IRQs 0-15 are remapped to vectors 32-47 so they never collide with
/// the CPU exception vectors 0-31.
pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

/// Vector the PIT timer fires on (IRQ 0).
pub const VECTOR_TIMER: u8 = PIC_1_OFFSET;
/// Vector the PS/2 keyboard fires on (IRQ 1).
pub const VECTOR_KEYBOARD: u8 = PIC_1_OFFSET + 1;

/// The chained Programmable Interrupt Controllers.
/// Interrupt-safe: handlers lock this for end-of-interrupt.
pub static PICS: InterruptSafeLock<ChainedPics> =
    InterruptSafeLock::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) }, "PICS");

/// An interrupt callback. Runs in interrupt context with interrupts
/// masked; it must not block.
pub type Handler = fn();

const UNBOUND: Option<Handler> = None;

/// The registration table: index = vector number, dense because the
/// vector space is small and fixed.
static HANDLERS: InterruptSafeLock<[Option<Handler>; 256]> =
    InterruptSafeLock::new([UNBOUND; 256], "HANDLERS");

/// Bind `handler` to `vector`, replacing any prior binding.
pub fn register(vector: u8, handler: Handler) {
    HANDLERS.lock()[vector as usize] = Some(handler);
}

/// Invoke the callback bound to `vector`, if any.
///
/// Returns whether a handler was bound, so exception stubs can fall
/// back to a default report. The binding is copied out before the call:
/// the callback itself runs without holding the table lock.
pub fn dispatch(vector: u8) -> bool {
    let handler = HANDLERS.lock()[vector as usize];
    match handler {
        Some(handler) => {
            handler();
            true
        }
        None => false,
    }
}

/// Remap the PICs, load the IDT, and open the gates.
///
/// Drivers may register callbacks before or after this; the table is
/// independent of the IDT load.
#[cfg(not(test))]
pub fn init() {
    unsafe {
        PICS.lock().initialize();
    }
    idt::init();
    x86_64::instructions::interrupts::enable();
}
