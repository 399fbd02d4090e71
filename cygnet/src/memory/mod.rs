//! Memory management
//!
//! One non-freeing bump allocator backs the whole kernel heap. The
//! region is fixed at boot (4 MB starting at the 4 MB mark) and is
//! never reclaimed; callers treat every allocation as living for the
//! remainder of the process.

pub mod bump;

use bump::BumpAllocator;
use core::ptr::NonNull;

/// Heap region: 4 MB - 8 MB (4 MB total)
pub const HEAP_START: usize = 0x400000;
pub const HEAP_SIZE: usize = 0x400000;

/// The kernel heap. Also wired up as the global allocator so `alloc`
/// users in the layers above share the same region. Hosted test builds
/// keep the host's allocator instead.
#[cfg_attr(not(test), global_allocator)]
pub static ALLOCATOR: BumpAllocator = BumpAllocator::new();

/// Hand the allocator its region. Must run before any heap allocation.
pub fn init() {
    ALLOCATOR.init(HEAP_START, HEAP_SIZE);
}

/// Allocate `size` zero-filled bytes from the kernel heap, or `None`
/// on exhaustion.
pub fn allocate(size: usize) -> Option<NonNull<u8>> {
    ALLOCATOR.allocate(size)
}

/// Deliberate no-op; see [`bump::BumpAllocator::release`].
pub fn release(ptr: *mut u8) {
    ALLOCATOR.release(ptr);
}
