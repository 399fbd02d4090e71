//! # Interrupt-Safe Locking
//!
//! A spinlock that disables interrupts while held. State shared between
//! interrupt handlers and synchronous code (the keyboard ring buffer, the
//! dispatch table, the PICs) must never be observed mid-update; on a single
//! core it is enough to mask interrupts for the critical section.
//!
//! Holding one of these locks across a `hlt` would deadlock the machine,
//! so blocking callers release the guard before idling.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A spinlock that disables interrupts while held.
///
/// Prevents the classic single-core deadlock:
/// 1. Synchronous code acquires the lock
/// 2. An interrupt fires
/// 3. The handler tries to acquire the same lock
/// 4. Deadlock
pub struct InterruptSafeLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
    /// Name reported if a deadlock is ever diagnosed by hand.
    debug_name: &'static str,
}

unsafe impl<T> Sync for InterruptSafeLock<T> {}
unsafe impl<T: Send> Send for InterruptSafeLock<T> {}

impl<T> InterruptSafeLock<T> {
    pub const fn new(data: T, debug_name: &'static str) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
            debug_name,
        }
    }

    /// Acquire the lock, returning a guard that restores the interrupt
    /// flag on drop.
    pub fn lock(&self) -> InterruptSafeLockGuard<'_, T> {
        // Flag state must be captured and interrupts masked BEFORE the
        // spin, or a handler firing mid-acquire can re-enter this lock.
        let were_enabled = interrupts_enabled();
        disable_interrupts();

        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }

        InterruptSafeLockGuard {
            lock: self,
            restore_interrupts: were_enabled,
        }
    }

    pub fn name(&self) -> &'static str {
        self.debug_name
    }
}

pub struct InterruptSafeLockGuard<'a, T> {
    lock: &'a InterruptSafeLock<T>,
    restore_interrupts: bool,
}

impl<'a, T> Drop for InterruptSafeLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
        if self.restore_interrupts {
            enable_interrupts();
        }
    }
}

impl<'a, T> core::ops::Deref for InterruptSafeLockGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> core::ops::DerefMut for InterruptSafeLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

#[cfg(not(test))]
#[inline]
fn interrupts_enabled() -> bool {
    x86_64::instructions::interrupts::are_enabled()
}

#[cfg(not(test))]
#[inline]
fn disable_interrupts() {
    x86_64::instructions::interrupts::disable();
}

#[cfg(not(test))]
#[inline]
fn enable_interrupts() {
    x86_64::instructions::interrupts::enable();
}

// Hosted test builds run in user mode where cli/sti are privileged;
// the lock degrades to a plain spinlock there.
#[cfg(test)]
fn interrupts_enabled() -> bool {
    false
}

#[cfg(test)]
fn disable_interrupts() {}

#[cfg(test)]
fn enable_interrupts() {}
