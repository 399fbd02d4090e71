//! # Programmable Interval Timer (PIT)
//!
//! The system's sense of time's passage. Channel 0 of the Intel
//! 8253/8254 fires IRQ 0 at a fixed rate; each interrupt advances a
//! tick counter by exactly one, and uptime in seconds is derived by
//! integer division (sub-second precision is lost by design, and there
//! is no missed-tick compensation).
//!
//! The counter is a u64: at the default 100 Hz it wraps after roughly
//! 5.8 billion years, which we accept.

use crate::interrupts::{self, VECTOR_TIMER};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use x86_64::instructions::port::Port;

/// PIT I/O ports
const PIT_CHANNEL0: u16 = 0x40; // Channel 0 data port (system timer)
const PIT_COMMAND: u16 = 0x43; // Mode/Command register

/// PIT base frequency (Hz)
const PIT_BASE_FREQ: u32 = 1_193_182;

/// Command byte: channel 0, lobyte/hibyte access, mode 3 (square
/// wave), binary counting.
const CMD_CHANNEL0_MODE3: u8 = 0b00_11_011_0;

/// Default timer frequency (100 Hz = 10ms per tick)
pub const DEFAULT_FREQ: u32 = 100;

/// The timer singleton: tick counter plus the frequency it was
/// programmed with. The counter is written only by the interrupt
/// callback; reads from synchronous context can never see a torn value.
pub struct Timer {
    ticks: AtomicU64,
    frequency: AtomicU32,
}

impl Timer {
    pub const fn new() -> Self {
        Timer {
            ticks: AtomicU64::new(0),
            frequency: AtomicU32::new(DEFAULT_FREQ),
        }
    }

    /// Advance the counter by one. Called only from the timer
    /// interrupt callback.
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Raw tick count since init.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Whole seconds since init.
    pub fn seconds(&self) -> u64 {
        self.ticks() / self.frequency.load(Ordering::Relaxed) as u64
    }

    /// Divisor programmed into the hardware for `freq`.
    fn divisor(freq: u32) -> u16 {
        let freq = freq.clamp(19, PIT_BASE_FREQ);
        (PIT_BASE_FREQ / freq) as u16
    }
}

static TIMER: Timer = Timer::new();

fn timer_callback() {
    TIMER.tick();
}

/// Program the PIT to fire at `frequency` Hz and bind the tick
/// callback to the timer vector.
pub fn init(frequency: u32) {
    TIMER.frequency.store(frequency, Ordering::Relaxed);
    interrupts::register(VECTOR_TIMER, timer_callback);

    let divisor = Timer::divisor(frequency);
    unsafe {
        Port::<u8>::new(PIT_COMMAND).write(CMD_CHANNEL0_MODE3);
        Port::<u8>::new(PIT_CHANNEL0).write((divisor & 0xFF) as u8);
        Port::<u8>::new(PIT_CHANNEL0).write(((divisor >> 8) & 0xFF) as u8);
    }
}

/// Raw tick count.
pub fn ticks() -> u64 {
    TIMER.ticks()
}

/// Whole seconds of uptime.
pub fn seconds() -> u64 {
    TIMER.seconds()
}
