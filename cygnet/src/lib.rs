//! # Cygnet - The CygnetOS Kernel
//!
//! The living core of CygnetOS: interrupt dispatch, the three
//! interrupt-driven device drivers (PIT timer, PS/2 keyboard, COM1
//! serial), the non-freeing kernel heap, and the in-memory filesystem.
//!
//! The kernel is a library: the multiboot entry stub links against it
//! and calls [`init`] once, and the shell/UI front ends above it call
//! the driver and filesystem APIs synchronously. Nothing in here knows
//! those layers exist.
//!
//! Hosted builds (`cargo test`) compile the pure logic — dispatch
//! table, ring buffer, allocator arithmetic, path resolution — against
//! std so it can be exercised without hardware.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), feature(abi_x86_interrupt))]

pub mod drivers;
pub mod interrupt_lock;
pub mod interrupts;
pub mod memory;
pub mod ramfs;

pub use interrupt_lock::InterruptSafeLock;
pub use ramfs::{DirEntry, FileStat, FsError, NodeKind};

/// Bring the core online. Called exactly once by the boot stub, before
/// interrupts are enabled and before any heap allocation.
#[cfg(not(test))]
pub fn init() {
    drivers::serial::init();
    crate::serial_println!("[cygnet] COM1 serial port initialized (115200 baud)");

    memory::init();
    crate::serial_println!("[cygnet] memory allocator ready (4 MB heap)");

    ramfs::init();
    seed_filesystem();
    crate::serial_println!("[cygnet] in-memory filesystem mounted");

    drivers::pit::init(drivers::pit::DEFAULT_FREQ);
    crate::serial_println!("[cygnet] PIT timer initialized (100 Hz)");

    drivers::keyboard::init();
    crate::serial_println!("[cygnet] PS/2 keyboard driver loaded");

    // Remap the PICs, load the IDT, and open the gates last: every
    // callback above is already bound when the first interrupt lands.
    interrupts::init();
    crate::serial_println!("[cygnet] interrupt dispatch online");
}

/// First files a fresh boot greets the user with.
#[cfg(not(test))]
fn seed_filesystem() {
    ramfs::with(|fs| {
        let _ = fs.write(
            "readme.txt",
            b"Welcome to CygnetOS!\n\
              A bare-metal operating system.\n\
              Type 'help' for commands.",
        );
        let _ = fs.create_dir("documents");
        let _ = fs.create_dir("programs");
    });
}

/// Idle forever; interrupts still wake the processor to run their
/// handlers between halts.
pub fn hlt_loop() -> ! {
    loop {
        #[cfg(not(test))]
        x86_64::instructions::hlt();
    }
}

/// Report the panic over serial and halt cleanly.
#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    crate::serial_println!("KERNEL PANIC: {}", info);
    hlt_loop()
}
