//! Bump Allocator
//!
//! The simplest allocator that can back a heap: a cursor that only
//! moves forward. Allocation advances it; release is a no-op, so every
//! allocation lives for the remainder of the process. Returned regions
//! are zero-filled.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{null_mut, NonNull};
use core::sync::atomic::{AtomicUsize, Ordering};

/// Sizes are rounded up to this granularity.
const MIN_ALIGN: usize = 4;

pub struct BumpAllocator {
    heap_start: AtomicUsize,
    heap_end: AtomicUsize,
    next: AtomicUsize,
}

impl BumpAllocator {
    pub const fn new() -> Self {
        Self {
            heap_start: AtomicUsize::new(0),
            heap_end: AtomicUsize::new(0),
            next: AtomicUsize::new(0),
        }
    }

    /// Hand the allocator its region. Must be called before the first
    /// allocation; any allocation attempt before init fails (the empty
    /// region is always exhausted).
    pub fn init(&self, heap_start: usize, heap_size: usize) {
        self.heap_start.store(heap_start, Ordering::Relaxed);
        self.heap_end.store(heap_start + heap_size, Ordering::Relaxed);
        self.next.store(heap_start, Ordering::Relaxed);
    }

    /// Allocate `size` bytes (rounded up to a multiple of 4),
    /// zero-filled. Returns `None` once the region is exhausted;
    /// exhaustion is permanent since nothing is ever reclaimed.
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.allocate_aligned(size, MIN_ALIGN)
    }

    /// Release is deliberately a no-op: this allocator can never
    /// reclaim memory.
    pub fn release(&self, _ptr: *mut u8) {}

    /// Bytes left before exhaustion.
    pub fn remaining(&self) -> usize {
        self.heap_end.load(Ordering::Relaxed) - self.next.load(Ordering::Relaxed)
    }

    fn allocate_aligned(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let align = align.max(MIN_ALIGN);
        let size = size.checked_add(MIN_ALIGN - 1)? & !(MIN_ALIGN - 1);

        let current = self.next.load(Ordering::Relaxed);
        let base = current.checked_add(align - 1)? & !(align - 1);
        let new_next = base.checked_add(size)?;

        if new_next > self.heap_end.load(Ordering::Relaxed) {
            return None;
        }

        self.next.store(new_next, Ordering::Relaxed);

        // Callers rely on fresh regions reading as zero.
        unsafe {
            core::ptr::write_bytes(base as *mut u8, 0, size);
        }

        NonNull::new(base as *mut u8)
    }
}

unsafe impl GlobalAlloc for BumpAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match self.allocate_aligned(layout.size(), layout.align()) {
            Some(ptr) => ptr.as_ptr(),
            None => null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.release(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_heap(size: usize) -> (BumpAllocator, usize) {
        // u64 backing keeps the region start well-aligned so the first
        // allocation lands exactly at heap_start.
        assert_eq!(size % 8, 0);
        let region = Box::leak(vec![0xAAAA_AAAA_AAAA_AAAAu64; size / 8].into_boxed_slice());
        let start = region.as_ptr() as usize;
        let bump = BumpAllocator::new();
        bump.init(start, size);
        (bump, start)
    }

    #[test]
    fn exact_fill_succeeds_then_one_more_byte_fails() {
        let (bump, _) = test_heap(1024);
        // 16 allocations of 64 bytes exactly fill the heap.
        for _ in 0..16 {
            assert!(bump.allocate(64).is_some());
        }
        assert_eq!(bump.remaining(), 0);
        assert!(bump.allocate(1).is_none());
    }

    #[test]
    fn regions_are_zero_filled() {
        let (bump, _) = test_heap(256);
        // The backing region was deliberately seeded with 0xAA.
        let ptr = bump.allocate(64).expect("allocation");
        let slice = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), 64) };
        assert!(slice.iter().all(|&b| b == 0));
    }

    #[test]
    fn sizes_round_up_to_four_bytes() {
        let (bump, start) = test_heap(256);
        let first = bump.allocate(1).expect("allocation");
        let second = bump.allocate(1).expect("allocation");
        assert_eq!(first.as_ptr() as usize, start);
        assert_eq!(second.as_ptr() as usize, start + 4);
    }

    #[test]
    fn release_reclaims_nothing() {
        let (bump, _) = test_heap(64);
        let ptr = bump.allocate(32).expect("allocation");
        let before = bump.remaining();
        bump.release(ptr.as_ptr());
        assert_eq!(bump.remaining(), before);
    }

    #[test]
    fn allocation_before_init_is_refused() {
        let bump = BumpAllocator::new();
        assert!(bump.allocate(4).is_none());
    }

    #[test]
    fn global_alloc_honors_layout_alignment() {
        let (bump, _) = test_heap(4096);
        let _ = bump.allocate(1); // skew the cursor off nice boundaries
        let layout = Layout::from_size_align(32, 64).unwrap();
        let ptr = unsafe { bump.alloc(layout) };
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 64, 0);
    }
}
