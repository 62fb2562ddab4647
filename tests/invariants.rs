//! # Invariant Testing for the AVL Tree
//!
//! Drives the tree through insertion and removal orders chosen to hit every
//! rotation case, validating the full set of structural invariants after
//! each step:
//!
//! - Search order under the tree's comparator
//! - Balance factor within one at every node
//! - Cached heights and parent links
//! - Record count and arena free-list accounting

use arbor::AvlTree;
use rand::prelude::*;

fn filled<I: IntoIterator<Item = i32>>(keys: I) -> AvlTree<i32> {
	let mut tree = AvlTree::new();
	for k in keys {
		tree.insert(k).unwrap();
		tree.assert_invariants();
	}
	tree
}

fn shape(tree: &AvlTree<i32>) -> Vec<Vec<i32>> {
	tree.levels().into_iter().map(|level| level.into_iter().copied().collect()).collect()
}

// ===========================================================================
// Insertion Order Tests
// ===========================================================================

#[test]
fn ascending_inserts() {
	let tree = filled(0..1_000);

	assert_eq!(tree.len(), 1_000);
	assert_eq!(tree.height(), 10);
}

#[test]
fn descending_inserts() {
	let tree = filled((0..1_000).rev());

	assert_eq!(tree.len(), 1_000);
	assert_eq!(tree.height(), 10);
}

/// Alternating low and high keys close in on the middle and trigger
/// double rotations.
#[test]
fn converging_inserts() {
	let mut keys = Vec::new();
	let (mut lo, mut hi) = (0, 999);
	while lo <= hi {
		keys.push(lo);
		if lo != hi {
			keys.push(hi);
		}
		lo += 1;
		hi -= 1;
	}

	let tree = filled(keys);
	assert_eq!(tree.len(), 1_000);
	assert!(tree.iter().copied().eq(0..1_000));
}

/// Keys inserted from the middle outwards.
#[test]
fn diverging_inserts() {
	let mut keys = vec![500];
	for d in 1..500 {
		keys.push(500 - d);
		keys.push(500 + d);
	}

	let tree = filled(keys);
	assert_eq!(tree.len(), 999);
}

#[test]
fn zigzag_triples() {
	// Each triple forces a left-right or right-left case on a fresh subtree.
	let mut keys = Vec::new();
	for base in (0..900).step_by(9) {
		keys.extend([base + 6, base + 2, base + 4]);
		keys.extend([base, base + 8, base + 7]);
	}

	let tree = filled(keys);
	tree.assert_invariants();
}

#[test]
fn duplicate_inserts_do_not_grow() {
	let mut tree = filled(0..100);

	for k in 0..100 {
		assert_eq!(tree.insert(k).unwrap(), Some(k));
	}
	tree.assert_invariants();
	assert_eq!(tree.len(), 100);
}

// ===========================================================================
// Removal Order Tests
// ===========================================================================

#[test]
fn remove_ascending_from_balanced() {
	let mut tree = filled(0..512);

	for k in 0..512 {
		assert_eq!(tree.remove(&k), Some(k));
		tree.assert_invariants();
		assert_eq!(tree.len(), (511 - k) as usize);
	}
	assert!(tree.is_empty());
}

#[test]
fn remove_descending_from_balanced() {
	let mut tree = filled(0..512);

	for k in (0..512).rev() {
		assert_eq!(tree.remove(&k), Some(k));
		tree.assert_invariants();
	}
	assert!(tree.is_empty());
}

#[test]
fn remove_root_repeatedly() {
	let mut tree = filled(0..300);

	loop {
		let root = match tree.levels().first() {
			Some(level) => *level[0],
			None => break,
		};
		assert_eq!(tree.remove(&root), Some(root));
		tree.assert_invariants();
	}
	assert_eq!(tree.height(), 0);
}

#[test]
fn remove_every_other() {
	let mut tree = filled(0..1_000);

	for k in (0..1_000).step_by(2) {
		tree.remove(&k);
		tree.assert_invariants();
	}
	assert!(tree.iter().copied().eq((1..1_000).step_by(2)));
}

#[test]
fn remove_missing_keys() {
	let mut tree = filled((0..200).map(|k| k * 2));
	let before = shape(&tree);

	for k in (0..200).map(|k| k * 2 + 1) {
		assert_eq!(tree.remove(&k), None);
	}
	assert_eq!(shape(&tree), before);
}

// ===========================================================================
// Shape Tests
// ===========================================================================

#[test]
fn small_shapes() {
	assert_eq!(shape(&filled([1, 2, 3])), vec![vec![2], vec![1, 3]]);
	assert_eq!(shape(&filled([3, 2, 1])), vec![vec![2], vec![1, 3]]);
	assert_eq!(shape(&filled([1, 3, 2])), vec![vec![2], vec![1, 3]]);
	assert_eq!(shape(&filled([3, 1, 2])), vec![vec![2], vec![1, 3]]);
}

#[test]
fn overwrite_keeps_shape() {
	let mut tree = filled(0..64);
	let before = shape(&tree);

	for k in 0..64 {
		tree.insert(k).unwrap();
	}
	assert_eq!(shape(&tree), before);
}

// ===========================================================================
// Randomized Tests
// ===========================================================================

#[test]
fn random_operations_with_validation() {
	let mut rng = StdRng::seed_from_u64(0x5eed);
	let mut tree = AvlTree::new();

	for step in 0..5_000 {
		let k: i32 = rng.random_range(0..400);
		if rng.random_bool(0.55) {
			tree.insert(k).unwrap();
		} else {
			tree.remove(&k);
		}
		if step % 10 == 0 {
			tree.assert_invariants();
		}
	}
	tree.assert_invariants();
}

#[test]
fn random_fill_then_drain() {
	let mut rng = rand::rng();
	let mut keys: Vec<i32> = (0..2_000).collect();
	keys.shuffle(&mut rng);

	let mut tree = filled(keys.iter().copied());
	keys.shuffle(&mut rng);

	for k in &keys {
		assert_eq!(tree.remove(k), Some(*k));
	}
	tree.assert_invariants();
	assert!(tree.is_empty());
}
