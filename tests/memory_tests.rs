// Explicit drops mark the point at which every block should be released.
#![allow(clippy::drop_non_drop)]

//! Memory leak detection tests for arbor.
//!
//! This binary installs the tracking allocator from `arbor::alloc` as its
//! global allocator. Counters are per thread, so every test measures only
//! what it allocated itself even when the harness runs tests in parallel.
//!
//! # Test Design
//!
//! Each test follows this pattern:
//! 1. Build the container so its arena and any copies already exist
//! 2. Reset the counters
//! 3. Perform the operations under test
//! 4. Drop what was returned, or the container itself
//! 5. Check that the counters balance
//!
//! For broader coverage run under LeakSanitizer:
//!
//! ```bash
//! RUSTFLAGS="-Zsanitizer=leak" cargo +nightly test --test memory_tests --target x86_64-unknown-linux-gnu
//! ```

use arbor::alloc::{self, TrackingAllocator};
use arbor::{AvlMap, AvlTree, BlobMap, Bytewise, Error};

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

/// Hits every logging call site once so first-use registration is not
/// counted against the test that follows.
fn warm_up() {
	let mut map = BlobMap::new(1, 1, Bytewise).unwrap();
	// Ascending and descending runs rotate both ways.
	for i in (0..8u8).chain((8..16).rev()) {
		map.set(&[i], &[i]).unwrap();
	}
	for i in 0..16u8 {
		map.remove(&[i]).unwrap();
	}
	let _ = map.set(&[], &[]);
	let _ = BlobMap::new(0, 1, Bytewise);
	map.clear();
}

fn blob_map(n: u32) -> BlobMap<Bytewise> {
	let mut map = BlobMap::new(4, 16, Bytewise).unwrap();
	for i in 0..n {
		map.set(&i.to_be_bytes(), &[i as u8; 16]).unwrap();
	}
	map
}

// ===========================================================================
// Whole-Container Tests
// ===========================================================================

#[test]
fn tree_drop_releases_everything() {
	warm_up();
	alloc::reset_counters();

	let mut tree = AvlTree::new();
	for i in 0..1_000 {
		tree.insert(i.to_string()).unwrap();
	}
	for i in (0..1_000).step_by(3) {
		tree.remove(&i.to_string());
	}
	drop(tree);

	alloc::check_no_leaks();
}

#[test]
fn blob_map_drop_releases_copies() {
	warm_up();
	alloc::reset_counters();

	let map = blob_map(500);
	assert!(alloc::get_stats().alloc_count >= 1_000, "every key and value should be copied");
	drop(map);

	alloc::check_no_leaks();
}

// ===========================================================================
// Per-Operation Tests
// ===========================================================================

#[test]
fn overwrite_releases_old_blocks() {
	let mut map = blob_map(100);
	warm_up();
	alloc::reset_counters();

	for i in 0..100u32 {
		let old = map.set(&i.to_be_bytes(), &[0xFF; 16]).unwrap();
		assert!(old.is_some());
	}

	// The replaced keys and values were freed; the new copies are live.
	let stats = alloc::get_stats();
	assert_eq!(stats.alloc_count, 200);
	assert_eq!(stats.dealloc_count, 200);
	assert_eq!(stats.bytes_allocated, 0);

	drop(map);
}

#[test]
fn remove_releases_blocks() {
	let mut map = blob_map(100);
	warm_up();
	alloc::reset_counters();

	for i in 0..100u32 {
		let value = map.remove(&i.to_be_bytes()).unwrap();
		drop(value);
	}

	// Each removal frees one key copy and the returned value.
	let stats = alloc::get_stats();
	assert_eq!(stats.alloc_count, 0);
	assert_eq!(stats.dealloc_count, 200);
	assert!(map.is_empty());
}

#[test]
fn clear_releases_arena() {
	let mut map = blob_map(100);
	warm_up();
	alloc::reset_counters();

	map.clear();

	let stats = alloc::get_stats();
	assert_eq!(stats.alloc_count, 0);
	assert_eq!(stats.dealloc_count, 200);
	drop(map);
}

#[test]
fn rejected_set_allocates_nothing() {
	let mut map = blob_map(10);
	warm_up();
	alloc::reset_counters();

	assert!(map.set(&[1, 2, 3], &[0; 16]).is_err());
	assert!(map.set(&[1, 2, 3, 4], &[0; 15]).is_err());

	alloc::check_no_leaks();
	assert_eq!(alloc::get_stats().alloc_count, 0);
	drop(map);
}

#[test]
fn lookups_allocate_nothing() {
	let mut map = AvlMap::new();
	for i in 0..1_000 {
		map.set(i, i).unwrap();
	}
	warm_up();
	alloc::reset_counters();

	for i in 0..1_000 {
		assert_eq!(map.get(&i), Some(&i));
	}
	assert!(map.some_matches(|_, v| *v == 999));
	assert!(map.iter().rev().count() == 1_000);

	assert_eq!(alloc::get_stats().alloc_count, 0);
}

#[test]
fn freed_slots_are_reused() {
	let mut tree = AvlTree::new();
	for i in 0..256 {
		tree.insert(i).unwrap();
	}
	for i in 0..128 {
		tree.remove(&i);
	}
	warm_up();
	alloc::reset_counters();

	for i in 1_000..1_128 {
		tree.insert(i).unwrap();
	}

	assert_eq!(alloc::get_stats().alloc_count, 0, "refill within capacity must not grow the arena");
	tree.assert_invariants();
}

#[test]
fn churn_does_not_leak() {
	warm_up();
	alloc::reset_counters();

	let mut map = BlobMap::new(8, 8, Bytewise).unwrap();
	for round in 0..10u64 {
		for i in 0..200u64 {
			map.set(&i.to_be_bytes(), &(i * round).to_le_bytes()).unwrap();
		}
		for i in (0..200u64).step_by(2) {
			map.remove(&i.to_be_bytes()).unwrap();
		}
	}
	map.clear();
	drop(map);

	alloc::check_no_leaks();
}

// ===========================================================================
// Allocation Failure Tests
// ===========================================================================

/// Calls `attempt` with fresh keys, refusing the allocation request that
/// follows `successes` granted ones, until a call fails.
///
/// Calls that never reached the refused request succeed normally. Returns
/// the failing key and its error.
fn first_failure<T>(
	successes: usize,
	first_key: u32,
	mut attempt: impl FnMut(u32) -> arbor::Result<T>,
) -> (u32, Error) {
	for k in first_key..first_key + 64 {
		alloc::fail_allocation_after(successes);
		let result = attempt(k);
		alloc::disarm_failure();
		if let Err(err) = result {
			return (k, err);
		}
	}
	panic!("no call reached the refused allocation");
}

#[test]
fn failed_insert_leaves_tree_unchanged() {
	warm_up();
	let mut tree = AvlTree::with_capacity_and_comparator(4, arbor::Natural);
	for k in 0..4u32 {
		tree.insert(k).unwrap();
	}

	let (failed, err) = first_failure(0, 4, |k| tree.insert(k));

	assert!(matches!(err, Error::OutOfMemory(_)), "unexpected error {:?}", err);
	assert_eq!(tree.len(), failed as usize);
	assert!(tree.iter().copied().eq(0..failed));
	assert!(!tree.contains(&failed));
	tree.assert_invariants();

	// The tree stays usable once memory is available again.
	assert_eq!(tree.insert(failed).unwrap(), None);
	tree.assert_invariants();
}

#[test]
fn failed_set_leaves_map_unchanged() {
	warm_up();
	let mut map = AvlMap::new();
	for k in 0..4u32 {
		map.set(k, k * 10).unwrap();
	}

	let (failed, err) = first_failure(0, 4, |k| map.set(k, k * 10));

	assert!(matches!(err, Error::OutOfMemory(_)), "unexpected error {:?}", err);
	assert_eq!(map.len(), failed as usize);
	assert_eq!(map.get(&failed), None);
	assert!(map.iter().map(|(k, v)| (*k, *v)).eq((0..failed).map(|k| (k, k * 10))));
	map.assert_invariants();

	assert_eq!(map.set(failed, 0).unwrap(), None);
	assert_eq!(map.len(), failed as usize + 1);
}

#[test]
fn failed_block_copy_leaves_blob_map_unchanged() {
	warm_up();
	alloc::reset_counters();
	let mut map = blob_map(10);

	// Request 0 copies the key and request 1 copies the value.
	for successes in [0, 1] {
		alloc::fail_allocation_after(successes);
		let result = map.set(&99u32.to_be_bytes(), &[7; 16]);
		alloc::disarm_failure();

		assert!(matches!(result, Err(Error::OutOfMemory(_))), "unexpected result {:?}", result);
		assert_eq!(map.len(), 10);
		assert_eq!(map.get(&99u32.to_be_bytes()).unwrap(), None);
		map.assert_invariants();
	}

	// A failed overwrite keeps the old value.
	alloc::fail_allocation_after(1);
	let result = map.set(&3u32.to_be_bytes(), &[0xEE; 16]);
	alloc::disarm_failure();
	assert!(matches!(result, Err(Error::OutOfMemory(_))));
	assert_eq!(map.get(&3u32.to_be_bytes()).unwrap(), Some(&[3u8; 16][..]));

	drop(map);
	alloc::check_no_leaks();
}

#[test]
fn failed_arena_growth_leaves_blob_map_unchanged() {
	warm_up();
	alloc::reset_counters();
	let mut map = BlobMap::new(4, 16, Bytewise).unwrap();
	map.set(&0u32.to_be_bytes(), &[0; 16]).unwrap();

	// Both block copies succeed; the arena growth after them is refused.
	let (failed, err) = first_failure(2, 1, |k| map.set(&k.to_be_bytes(), &[k as u8; 16]));

	assert!(matches!(err, Error::OutOfMemory(_)), "unexpected error {:?}", err);
	assert_eq!(map.len(), failed as usize);
	assert_eq!(map.get(&failed.to_be_bytes()).unwrap(), None);
	for k in 0..failed {
		assert_eq!(map.get(&k.to_be_bytes()).unwrap(), Some(&[k as u8; 16][..]));
	}
	map.assert_invariants();

	drop(map);
	alloc::check_no_leaks();
}
