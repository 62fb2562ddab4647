//! Allocation tracking for memory leak detection.
//!
//! [`TrackingAllocator`] wraps the system allocator and counts allocations,
//! deallocations and live bytes. The counters are kept per thread, so tests
//! running in parallel inside one test binary do not see each other's
//! traffic.
//!
//! # Usage
//!
//! ```ignore
//! use arbor::alloc::TrackingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator;
//!
//! #[test]
//! fn blocks_are_released() {
//!     arbor::alloc::reset_counters();
//!
//!     let mut map = arbor::BlobMap::new(4, 4, arbor::Bytewise).unwrap();
//!     map.set(b"abcd", b"wxyz").unwrap();
//!     drop(map);
//!
//!     arbor::alloc::check_no_leaks();
//! }
//! ```
//!
//! [`fail_allocation_after`] injects a single allocation failure on the
//! current thread, for testing how callers recover from running out of
//! memory.
//!
//! Memory freed on a thread other than the one that allocated it shows up as
//! a leak on the allocating thread, so measured code should stay on one
//! thread.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
	static ALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
	static DEALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
	static BYTES_ALLOCATED: Cell<isize> = const { Cell::new(0) };
	static PEAK_BYTES: Cell<usize> = const { Cell::new(0) };
	/// Allocation requests still allowed to succeed before one is refused.
	/// `usize::MAX` disables fault injection.
	static FAIL_AFTER: Cell<usize> = const { Cell::new(usize::MAX) };
}

/// A global allocator that counts what the current thread allocates.
pub struct TrackingAllocator;

/// Records a change of `delta` live bytes, plus one allocation or
/// deallocation where `counter` is given.
///
/// Uses `try_with` because the allocator may run while the thread's locals
/// are being torn down.
#[inline]
fn record(counter: Option<&'static std::thread::LocalKey<Cell<usize>>>, delta: isize) {
	if let Some(counter) = counter {
		let _ = counter.try_with(|c| c.set(c.get() + 1));
	}
	let _ = BYTES_ALLOCATED.try_with(|bytes| {
		let current = bytes.get() + delta;
		bytes.set(current);
		if current > 0 {
			let _ = PEAK_BYTES.try_with(|peak| peak.set(peak.get().max(current as usize)));
		}
	});
}

/// Consumes one allocation request and reports whether it must be refused.
#[inline]
fn should_fail() -> bool {
	FAIL_AFTER
		.try_with(|left| match left.get() {
			usize::MAX => false,
			0 => {
				left.set(usize::MAX);
				true
			}
			n => {
				left.set(n - 1);
				false
			}
		})
		.unwrap_or(false)
}

unsafe impl GlobalAlloc for TrackingAllocator {
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		if should_fail() {
			return std::ptr::null_mut();
		}
		record(Some(&ALLOC_COUNT), layout.size() as isize);
		System.alloc(layout)
	}

	unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
		record(Some(&DEALLOC_COUNT), -(layout.size() as isize));
		System.dealloc(ptr, layout)
	}

	unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
		if should_fail() {
			return std::ptr::null_mut();
		}
		record(Some(&ALLOC_COUNT), layout.size() as isize);
		System.alloc_zeroed(layout)
	}

	unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
		// A refused realloc leaves the old block in place.
		if should_fail() {
			return std::ptr::null_mut();
		}
		record(None, new_size as isize - layout.size() as isize);
		System.realloc(ptr, layout, new_size)
	}
}

/// Resets the current thread's counters to zero.
pub fn reset_counters() {
	ALLOC_COUNT.with(|c| c.set(0));
	DEALLOC_COUNT.with(|c| c.set(0));
	BYTES_ALLOCATED.with(|c| c.set(0));
	PEAK_BYTES.with(|c| c.set(0));
}

/// Lets the current thread's next `successes` allocation requests through
/// and refuses the one after, as if the system were out of memory.
///
/// Reallocations count as requests. The fault fires once; later requests
/// succeed again.
pub fn fail_allocation_after(successes: usize) {
	FAIL_AFTER.with(|left| left.set(successes));
}

/// Cancels a pending [`fail_allocation_after`].
pub fn disarm_failure() {
	FAIL_AFTER.with(|left| left.set(usize::MAX));
}

/// Returns the current thread's allocation statistics.
pub fn get_stats() -> AllocationStats {
	AllocationStats {
		alloc_count: ALLOC_COUNT.with(Cell::get),
		dealloc_count: DEALLOC_COUNT.with(Cell::get),
		bytes_allocated: BYTES_ALLOCATED.with(Cell::get),
		peak_bytes: PEAK_BYTES.with(Cell::get),
	}
}

/// Allocation statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationStats {
	/// Allocations since the last reset.
	pub alloc_count: usize,
	/// Deallocations since the last reset.
	pub dealloc_count: usize,
	/// Live bytes relative to the last reset. Negative when memory allocated
	/// before the reset has since been freed.
	pub bytes_allocated: isize,
	/// Peak live bytes since the last reset.
	pub peak_bytes: usize,
}

impl AllocationStats {
	/// Allocations not yet matched by a deallocation.
	pub fn outstanding(&self) -> isize {
		self.alloc_count as isize - self.dealloc_count as isize
	}
}

/// Asserts that everything allocated on this thread since the last reset has
/// been freed.
///
/// # Panics
///
/// Panics if allocations are unmatched or bytes are still live.
pub fn check_no_leaks() {
	let stats = get_stats();

	assert_eq!(
		stats.outstanding(),
		0,
		"memory leak: {} allocations, {} deallocations, {} bytes still live",
		stats.alloc_count,
		stats.dealloc_count,
		stats.bytes_allocated
	);
	assert_eq!(
		stats.bytes_allocated, 0,
		"memory leak: allocation counts match but {} bytes are still live",
		stats.bytes_allocated
	);
}
