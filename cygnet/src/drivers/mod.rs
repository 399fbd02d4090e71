//! Hardware device drivers
//!
//! Each driver owns its state in an explicit singleton and talks to
//! its device purely through port I/O. The PIT and keyboard produce
//! data from interrupt context for later synchronous consumption; the
//! serial port is polled synchronously in both directions.

pub mod keyboard;
pub mod pit;
pub mod serial;
