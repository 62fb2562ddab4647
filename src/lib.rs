//! # Arbor: AVL-Balanced Ordered Containers
//!
//! This crate provides an in-memory, height-balanced binary search tree
//! ([`AvlTree`]) and two key-value maps layered on top of it:
//!
//! - [`map::AvlMap`]: a generic map whose records are `(key, value)` pairs
//!   ordered by key only.
//! - [`blob::BlobMap`]: a type-erased map over fixed-size byte blocks, for
//!   callers that only know the size of their keys and values.
//!
//! ## Design Overview
//!
//! ### Ordering
//!
//! Records are ordered by an injected three-way comparator (see
//! [`compare::Compare`]). The default, [`compare::Natural`], uses [`Ord`];
//! any `Fn(&T, &T) -> Ordering` closure works as well.
//!
//! ### Balance
//!
//! Every node stores its height (a leaf has height 1). After each structural
//! change the tree walks from the lowest touched node up to the root,
//! recomputing heights and rotating wherever the heights of two sibling
//! subtrees differ by more than one. This keeps the height of the tree within
//! about `1.44 * log2(n)`, so lookups, inserts and removals are O(log n) in
//! the worst case.
//!
//! ### Node Storage
//!
//! Nodes live in an arena (a `Vec` of slots) and refer to each other by index:
//!
//! ```text
//!    slots: [ 0 ][ 1 ][ 2 ][ 3 ][ 4 ]
//!             │    ▲    │         ▲
//!             │    └────┘ parent  │
//!             └── left ───────────┘
//!
//!    free:  3 ──► (none)           <- vacated slots, reused by inserts
//! ```
//!
//! Parent links are plain indices, so rotations can rewrite all four edges
//! they touch without fighting ownership, and dropping the tree releases every
//! record without recursion.
//!
//! ## Basic Usage
//!
//! ```
//! use arbor::AvlTree;
//!
//! let mut tree = AvlTree::new();
//!
//! for i in 0..25 {
//!     tree.insert(i).unwrap();
//! }
//!
//! assert_eq!(tree.len(), 25);
//! assert_eq!(tree.find(&7), Some(&7));
//! assert_eq!(tree.remove(&7), Some(7));
//! assert_eq!(tree.find(&7), None);
//!
//! // 24 records fit in a balanced tree of height 5
//! assert_eq!(tree.height(), 5);
//! ```
//!
//! ## Thread Safety
//!
//! The containers hold no locks. Mutators take `&mut self`, so the borrow
//! checker enforces a single writer or any number of readers. Containers are
//! `Send` and `Sync` whenever their records and comparator are.

use std::cmp::Ordering;
use std::fmt;
use std::mem;

use tracing::{debug, trace};

#[cfg(any(test, feature = "test-utils"))]
pub mod alloc;
pub mod blob;
pub mod compare;
pub mod error;
pub mod iter;
pub mod map;

pub use blob::BlobMap;
pub use compare::{Bytewise, Compare, Natural, NulTerminated};
pub use error::{Error, Result};
pub use map::AvlMap;

// ---------------------------------------------------------------------------
// Arena Types
// ---------------------------------------------------------------------------

/// Index of a node slot in the tree's arena.
pub(crate) type NodeId = usize;

/// One stored record together with its links and cached height.
pub(crate) struct Node<T> {
	pub(crate) value: T,
	/// Height of the subtree rooted here. A leaf has height 1.
	pub(crate) height: u32,
	/// Back-reference to the parent. `None` only for the root.
	pub(crate) parent: Option<NodeId>,
	pub(crate) left: Option<NodeId>,
	pub(crate) right: Option<NodeId>,
}

impl<T> Node<T> {
	fn leaf(value: T, parent: Option<NodeId>) -> Self {
		Node {
			value,
			height: 1,
			parent,
			left: None,
			right: None,
		}
	}
}

/// A slot in the arena: either a live node or a link in the free list.
pub(crate) enum Slot<T> {
	Occupied(Node<T>),
	Vacant {
		next_free: Option<NodeId>,
	},
}

impl<T> Slot<T> {
	/// Returns the node stored in this slot.
	///
	/// Ids handed around inside the tree always point at live nodes, so a
	/// vacant slot here means the links are corrupt.
	#[inline]
	pub(crate) fn node(&self) -> &Node<T> {
		match self {
			Slot::Occupied(node) => node,
			Slot::Vacant {
				..
			} => unreachable!("link points at a vacant slot - tree structure corrupt"),
		}
	}

	#[inline]
	fn node_mut(&mut self) -> &mut Node<T> {
		match self {
			Slot::Occupied(node) => node,
			Slot::Vacant {
				..
			} => unreachable!("link points at a vacant slot - tree structure corrupt"),
		}
	}
}

/// Which way a subtree leans once its heights differ by more than one.
#[derive(Debug, PartialEq, Copy, Clone)]
enum Lean {
	Left,
	Right,
	Balanced,
}

impl Lean {
	#[inline]
	fn of(left: u32, right: u32) -> Lean {
		if left > right + 1 {
			Lean::Left
		} else if right > left + 1 {
			Lean::Right
		} else {
			Lean::Balanced
		}
	}
}

// ---------------------------------------------------------------------------
// Core Tree Structure
// ---------------------------------------------------------------------------

/// An AVL-balanced binary search tree over records of type `T`.
///
/// The tree behaves like an ordered set: records that compare equal under the
/// comparator `C` are the same key, and inserting one replaces the other.
///
/// # Type Parameters
///
/// - `T`: The record type. The tree owns every record it stores.
/// - `C`: The comparator. Defaults to [`Natural`], which requires `T: Ord`.
///
/// # Internal Structure
///
/// - `slots` is the node arena. Nodes refer to each other by index.
/// - `free` heads a singly linked list of vacated slots.
/// - `root` is the only node without a parent; `None` iff the tree is empty.
/// - `len` counts the nodes reachable from `root`.
pub struct AvlTree<T, C = Natural> {
	slots: Vec<Slot<T>>,
	free: Option<NodeId>,
	root: Option<NodeId>,
	len: usize,
	compare: C,
}

impl<T: Ord> AvlTree<T, Natural> {
	/// Creates an empty tree ordered by `T`'s [`Ord`] implementation.
	///
	/// No memory is allocated until the first insert.
	pub fn new() -> Self {
		Self::with_comparator(Natural)
	}
}

impl<T: Ord> Default for AvlTree<T, Natural> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T, C> AvlTree<T, C> {
	// -----------------------------------------------------------------------
	// Construction
	// -----------------------------------------------------------------------

	/// Creates an empty tree ordered by `compare`.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// // Order strings by length, then alphabetically
	/// let mut tree = AvlTree::with_comparator(|a: &&str, b: &&str| {
	///     a.len().cmp(&b.len()).then_with(|| a.cmp(b))
	/// });
	/// tree.insert("pear").unwrap();
	/// tree.insert("fig").unwrap();
	/// tree.insert("apple").unwrap();
	///
	/// assert_eq!(tree.first(), Some(&"fig"));
	/// assert_eq!(tree.last(), Some(&"apple"));
	/// ```
	pub fn with_comparator(compare: C) -> Self {
		AvlTree {
			slots: Vec::new(),
			free: None,
			root: None,
			len: 0,
			compare,
		}
	}

	/// Creates an empty tree with room for `capacity` records.
	pub fn with_capacity_and_comparator(capacity: usize, compare: C) -> Self {
		AvlTree {
			slots: Vec::with_capacity(capacity),
			free: None,
			root: None,
			len: 0,
			compare,
		}
	}

	/// Reserves room for at least `additional` more records.
	///
	/// Returns [`Error::OutOfMemory`] if the arena cannot grow; the tree is
	/// unchanged in that case.
	pub fn reserve(&mut self, additional: usize) -> Result<()> {
		let vacant = self.slots.len() - self.len;
		if additional > vacant {
			self.slots.try_reserve(additional - vacant)?;
		}
		Ok(())
	}

	// -----------------------------------------------------------------------
	// Tree Metadata
	// -----------------------------------------------------------------------

	/// Returns the number of records in the tree. O(1).
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	/// Returns `true` if the tree holds no records.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.root.is_none()
	}

	/// Returns the height of the tree: 0 when empty, 1 for a single record.
	pub fn height(&self) -> usize {
		self.height_of(self.root) as usize
	}

	/// Returns the comparator that orders this tree.
	pub fn comparator(&self) -> &C {
		&self.compare
	}

	// -----------------------------------------------------------------------
	// Public API: Read Operations
	// -----------------------------------------------------------------------

	/// Searches the tree with a probe function.
	///
	/// `f` receives a stored record and returns its ordering relative to the
	/// record being looked for: `Greater` continues into the left subtree,
	/// `Less` into the right one and `Equal` ends the search. This lets
	/// callers search by a part of the record without building a whole one.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// let mut tree = AvlTree::new();
	/// tree.insert((1, "one")).unwrap();
	/// tree.insert((2, "two")).unwrap();
	///
	/// let found = tree.find_by(|(k, _)| k.cmp(&2));
	/// assert_eq!(found, Some(&(2, "two")));
	/// ```
	pub fn find_by<F>(&self, f: F) -> Option<&T>
	where
		F: FnMut(&T) -> Ordering,
	{
		self.locate(f).map(|id| &self.node(id).value)
	}

	/// Returns the smallest record in the tree.
	pub fn first(&self) -> Option<&T> {
		self.root.map(|root| &self.node(self.leftmost(root)).value)
	}

	/// Returns the largest record in the tree.
	pub fn last(&self) -> Option<&T> {
		self.root.map(|root| &self.node(self.rightmost(root)).value)
	}

	/// Returns `true` if `pred` holds for at least one record.
	///
	/// Records are visited in order and the walk stops at the first match.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// let mut tree = AvlTree::new();
	/// for i in 0..25 {
	///     tree.insert(i).unwrap();
	/// }
	///
	/// assert!(tree.some_matches(|v| *v == 24));
	/// assert!(!tree.some_matches(|v| *v > 24));
	/// ```
	pub fn some_matches<F>(&self, pred: F) -> bool
	where
		F: FnMut(&T) -> bool,
	{
		self.iter().any(pred)
	}

	/// Returns `true` if `pred` holds for every record.
	///
	/// Records are visited in order and the walk stops at the first miss. An
	/// empty tree satisfies any predicate.
	pub fn all_match<F>(&self, pred: F) -> bool
	where
		F: FnMut(&T) -> bool,
	{
		self.iter().all(pred)
	}

	/// Returns an in-order iterator over the records.
	pub fn iter(&self) -> iter::Iter<'_, T> {
		iter::Iter::new(&self.slots, self.root, self.len)
	}

	// -----------------------------------------------------------------------
	// Public API: Write Operations
	// -----------------------------------------------------------------------

	/// Removes the record matched by a probe function and returns it.
	///
	/// `f` follows the same convention as [`find_by`](Self::find_by). Nothing
	/// happens if no record matches.
	pub fn remove_by<F>(&mut self, f: F) -> Option<T>
	where
		F: FnMut(&T) -> Ordering,
	{
		let target = self.locate(f)?;
		Some(self.unlink(target))
	}

	/// Removes every record from the tree.
	///
	/// The arena keeps its capacity, so refilling the tree does not allocate
	/// until it grows past its previous size.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// let mut tree = AvlTree::new();
	/// tree.insert(1).unwrap();
	/// tree.insert(2).unwrap();
	///
	/// tree.clear();
	/// assert!(tree.is_empty());
	/// assert_eq!(tree.height(), 0);
	/// ```
	pub fn clear(&mut self) {
		debug!(records = self.len, "clearing tree");
		self.slots.clear();
		self.free = None;
		self.root = None;
		self.len = 0;
	}

	// -----------------------------------------------------------------------
	// Crate-Internal Access
	// -----------------------------------------------------------------------

	/// Mutable access to the record matched by `f`, which is handed the
	/// tree's comparator along with each stored record.
	///
	/// Kept inside the crate: changing the ordered part of a record through
	/// this reference would break the search order.
	pub(crate) fn find_mut_with<F>(&mut self, mut f: F) -> Option<&mut T>
	where
		F: FnMut(&C, &T) -> Ordering,
	{
		let id = self.locate(|stored| f(&self.compare, stored))?;
		Some(&mut self.node_mut(id).value)
	}

	/// Like [`remove_by`](Self::remove_by), with the comparator handed to `f`.
	pub(crate) fn remove_with<F>(&mut self, mut f: F) -> Option<T>
	where
		F: FnMut(&C, &T) -> Ordering,
	{
		let target = self.locate(|stored| f(&self.compare, stored))?;
		Some(self.unlink(target))
	}

	// -----------------------------------------------------------------------
	// Node Access
	// -----------------------------------------------------------------------

	#[inline]
	fn node(&self, id: NodeId) -> &Node<T> {
		self.slots[id].node()
	}

	#[inline]
	fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
		self.slots[id].node_mut()
	}

	#[inline]
	fn height_of(&self, id: Option<NodeId>) -> u32 {
		id.map_or(0, |id| self.node(id).height)
	}

	fn leftmost(&self, mut id: NodeId) -> NodeId {
		while let Some(left) = self.node(id).left {
			id = left;
		}
		id
	}

	fn rightmost(&self, mut id: NodeId) -> NodeId {
		while let Some(right) = self.node(id).right {
			id = right;
		}
		id
	}

	/// Walks down from the root following `f` and returns the matching node.
	fn locate<F>(&self, mut f: F) -> Option<NodeId>
	where
		F: FnMut(&T) -> Ordering,
	{
		let mut cursor = self.root;
		while let Some(id) = cursor {
			let node = self.node(id);
			cursor = match f(&node.value) {
				Ordering::Greater => node.left,
				Ordering::Less => node.right,
				Ordering::Equal => return Some(id),
			};
		}
		None
	}

	// -----------------------------------------------------------------------
	// Node Lifecycle
	// -----------------------------------------------------------------------

	/// Makes sure the next call to [`allocate`](Self::allocate) cannot fail.
	fn reserve_slot(&mut self) -> Result<()> {
		if self.free.is_none() && self.slots.len() == self.slots.capacity() {
			self.slots.try_reserve(1)?;
			trace!(capacity = self.slots.capacity(), "grew node arena");
		}
		Ok(())
	}

	/// Stores `node` in a vacant slot, growing the arena if there is none.
	///
	/// Call [`reserve_slot`](Self::reserve_slot) first when the caller needs
	/// to report allocation failure instead of aborting.
	fn allocate(&mut self, node: Node<T>) -> NodeId {
		match self.free {
			Some(id) => {
				match mem::replace(&mut self.slots[id], Slot::Occupied(node)) {
					Slot::Vacant {
						next_free,
					} => self.free = next_free,
					Slot::Occupied(_) => unreachable!("free list points at a live node"),
				}
				id
			}
			None => {
				self.slots.push(Slot::Occupied(node));
				self.slots.len() - 1
			}
		}
	}

	/// Vacates the slot of an already unlinked node and returns its record.
	fn release(&mut self, id: NodeId) -> T {
		let vacant = Slot::Vacant {
			next_free: self.free,
		};
		self.free = Some(id);
		match mem::replace(&mut self.slots[id], vacant) {
			Slot::Occupied(node) => node.value,
			Slot::Vacant {
				..
			} => unreachable!("released a vacant slot"),
		}
	}

	// -----------------------------------------------------------------------
	// Removal
	// -----------------------------------------------------------------------

	/// Unlinks `target` from the tree, rebalances, and returns its record.
	fn unlink(&mut self, target: NodeId) -> T {
		let node = self.node(target);
		let removed = match (node.left, node.right) {
			(Some(_), Some(right)) => {
				// The in-order successor has no left child, so it can be spliced
				// out with the simple rule. Its record takes the target's place.
				let successor = self.leftmost(right);
				let from = self.splice_out(successor);
				let promoted = self.release(successor);
				let removed = mem::replace(&mut self.node_mut(target).value, promoted);
				self.rebalance(from);
				removed
			}
			_ => {
				let from = self.splice_out(target);
				let removed = self.release(target);
				self.rebalance(from);
				removed
			}
		};
		self.len -= 1;
		removed
	}

	/// Replaces a node that has at most one child with that child.
	///
	/// Returns the node's former parent, where rebalancing has to start.
	fn splice_out(&mut self, id: NodeId) -> Option<NodeId> {
		let node = self.node(id);
		debug_assert!(node.left.is_none() || node.right.is_none());
		let child = node.left.or(node.right);
		let parent = node.parent;
		if let Some(child) = child {
			self.node_mut(child).parent = parent;
		}
		self.replace_child(parent, id, child);
		parent
	}

	/// Points the link that referred to `old` at `new` instead.
	///
	/// With no parent, `old` was the root and `new` becomes the root.
	fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
		match parent {
			None => self.root = new,
			Some(parent) => {
				let parent = self.node_mut(parent);
				if parent.left == Some(old) {
					parent.left = new;
				} else {
					parent.right = new;
				}
			}
		}
	}

	// -----------------------------------------------------------------------
	// Rebalancing
	// -----------------------------------------------------------------------

	#[inline]
	fn update_height(&mut self, id: NodeId) {
		let node = self.node(id);
		let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
		self.node_mut(id).height = height;
	}

	/// Restores heights and balance from `from` up to the root.
	///
	/// Every ancestor is checked, not only the lowest unbalanced one. The walk
	/// costs O(log n) and performs at most one rotation (single or double) per
	/// level.
	fn rebalance(&mut self, from: Option<NodeId>) {
		let mut cursor = from;
		while let Some(id) = cursor {
			let node = self.node(id);
			let (left, right) = (node.left, node.right);
			let top = match Lean::of(self.height_of(left), self.height_of(right)) {
				Lean::Left => {
					let Some(child) = left else {
						unreachable!("left-heavy node {} has no left child", id)
					};
					let inner = self.node(child);
					if self.height_of(inner.right) > self.height_of(inner.left) {
						self.rotate_left(child);
					}
					self.rotate_right(id)
				}
				Lean::Right => {
					let Some(child) = right else {
						unreachable!("right-heavy node {} has no right child", id)
					};
					let inner = self.node(child);
					if self.height_of(inner.left) > self.height_of(inner.right) {
						self.rotate_right(child);
					}
					self.rotate_left(id)
				}
				Lean::Balanced => {
					self.update_height(id);
					id
				}
			};
			cursor = self.node(top).parent;
		}
	}

	/// Rotates `id` down to the right and promotes its left child.
	///
	/// ```text
	///        id                pivot
	///       /  \               /   \
	///    pivot  c    ──►      a     id
	///    /   \                     /  \
	///   a   inner               inner  c
	/// ```
	///
	/// Returns the node now at the top of the rotated subtree.
	fn rotate_right(&mut self, id: NodeId) -> NodeId {
		let Some(pivot) = self.node(id).left else {
			unreachable!("rotating right around node {} without a left child", id)
		};
		trace!(node = id, pivot, "rotate right");
		let inner = self.node(pivot).right;
		let parent = self.node(id).parent;

		self.node_mut(id).left = inner;
		if let Some(inner) = inner {
			self.node_mut(inner).parent = Some(id);
		}
		self.node_mut(pivot).right = Some(id);
		self.node_mut(pivot).parent = parent;
		self.node_mut(id).parent = Some(pivot);
		self.replace_child(parent, id, Some(pivot));

		self.update_height(id);
		self.update_height(pivot);
		pivot
	}

	/// Mirror image of [`rotate_right`](Self::rotate_right).
	fn rotate_left(&mut self, id: NodeId) -> NodeId {
		let Some(pivot) = self.node(id).right else {
			unreachable!("rotating left around node {} without a right child", id)
		};
		trace!(node = id, pivot, "rotate left");
		let inner = self.node(pivot).left;
		let parent = self.node(id).parent;

		self.node_mut(id).right = inner;
		if let Some(inner) = inner {
			self.node_mut(inner).parent = Some(id);
		}
		self.node_mut(pivot).left = Some(id);
		self.node_mut(pivot).parent = parent;
		self.node_mut(id).parent = Some(pivot);
		self.replace_child(parent, id, Some(pivot));

		self.update_height(id);
		self.update_height(pivot);
		pivot
	}
}

impl<T, C: Compare<T>> AvlTree<T, C> {
	/// Returns the stored record that compares equal to `probe`.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// let mut tree = AvlTree::new();
	/// tree.insert(10).unwrap();
	///
	/// assert_eq!(tree.find(&10), Some(&10));
	/// assert_eq!(tree.find(&11), None);
	/// ```
	pub fn find(&self, probe: &T) -> Option<&T> {
		self.find_by(|stored| self.compare.compare(stored, probe))
	}

	/// Returns `true` if a record equal to `probe` is stored.
	pub fn contains(&self, probe: &T) -> bool {
		self.find(probe).is_some()
	}

	/// Inserts `value`, or replaces the stored record that compares equal.
	///
	/// Returns the replaced record, or `None` if `value` was new. Replacing a
	/// record changes neither the shape of the tree nor its length.
	///
	/// # Errors
	///
	/// Returns [`Error::OutOfMemory`] if a new node cannot be allocated. The
	/// tree is unchanged and `value` is dropped.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// let mut tree = AvlTree::with_comparator(|a: &(i32, &str), b: &(i32, &str)| a.0.cmp(&b.0));
	///
	/// assert_eq!(tree.insert((1, "one")).unwrap(), None);
	/// assert_eq!(tree.insert((1, "uno")).unwrap(), Some((1, "one")));
	/// assert_eq!(tree.len(), 1);
	/// ```
	pub fn insert(&mut self, value: T) -> Result<Option<T>> {
		let Some(mut cursor) = self.root else {
			self.reserve_slot()?;
			self.root = Some(self.allocate(Node::leaf(value, None)));
			self.len += 1;
			return Ok(None);
		};

		let goes_left = loop {
			let node = self.node(cursor);
			match self.compare.compare(&node.value, &value) {
				Ordering::Greater => match node.left {
					Some(next) => cursor = next,
					None => break true,
				},
				Ordering::Less => match node.right {
					Some(next) => cursor = next,
					None => break false,
				},
				Ordering::Equal => {
					let replaced = mem::replace(&mut self.node_mut(cursor).value, value);
					return Ok(Some(replaced));
				}
			}
		};

		// The slot is secured before any link changes, so failure leaves the
		// tree untouched.
		self.reserve_slot()?;
		let leaf = self.allocate(Node::leaf(value, Some(cursor)));
		if goes_left {
			self.node_mut(cursor).left = Some(leaf);
		} else {
			self.node_mut(cursor).right = Some(leaf);
		}
		self.len += 1;
		self.rebalance(Some(cursor));
		Ok(None)
	}

	/// Removes the record that compares equal to `probe` and returns it.
	///
	/// Removing a record that is not stored does nothing.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlTree;
	///
	/// let mut tree = AvlTree::new();
	/// tree.insert(1).unwrap();
	///
	/// assert_eq!(tree.remove(&1), Some(1));
	/// assert_eq!(tree.remove(&1), None);
	/// ```
	pub fn remove(&mut self, probe: &T) -> Option<T> {
		let target = self.locate(|stored| self.compare.compare(stored, probe))?;
		Some(self.unlink(target))
	}
}

impl<T: fmt::Debug, C> fmt::Debug for AvlTree<T, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

impl<T: Clone, C: Clone> Clone for AvlTree<T, C> {
	fn clone(&self) -> Self {
		let slots = self
			.slots
			.iter()
			.map(|slot| match slot {
				Slot::Occupied(node) => Slot::Occupied(Node {
					value: node.value.clone(),
					height: node.height,
					parent: node.parent,
					left: node.left,
					right: node.right,
				}),
				Slot::Vacant {
					next_free,
				} => Slot::Vacant {
					next_free: *next_free,
				},
			})
			.collect();
		AvlTree {
			slots,
			free: self.free,
			root: self.root,
			len: self.len,
			compare: self.compare.clone(),
		}
	}
}

impl<'t, T, C> IntoIterator for &'t AvlTree<T, C> {
	type Item = &'t T;
	type IntoIter = iter::Iter<'t, T>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

// ===========================================================================
// Test-Only Validation Module
// ===========================================================================

/// Invariant validation for testing.
#[cfg(any(test, feature = "test-utils"))]
impl<T: fmt::Debug, C: Compare<T>> AvlTree<T, C> {
	/// Validates all tree invariants. Panics with diagnostic info if any
	/// invariant is violated.
	///
	/// # Invariants Checked
	///
	/// 1. Root has no parent; every child points back at its parent
	/// 2. Height bookkeeping: `height = 1 + max(left, right)`
	/// 3. Balance: sibling subtree heights differ by at most one
	/// 4. Order: an in-order walk is strictly increasing
	/// 5. Length: `len` equals the number of reachable nodes
	/// 6. Arena: every slot is either reachable or on the free list
	pub fn assert_invariants(&self) {
		let Some(root) = self.root else {
			assert_eq!(self.len, 0, "Empty tree reports len {}", self.len);
			// Slots vacated by removals stay on the free list until `clear`.
			self.assert_free_list(self.slots.len());
			return;
		};

		// Invariant 1: Root has no parent
		assert_eq!(self.node(root).parent, None, "Root {} has a parent", root);

		let mut reachable = 0usize;
		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			reachable += 1;
			let node = self.node(id);

			for child in [node.left, node.right].into_iter().flatten() {
				// Invariant 1: Parent links
				assert_eq!(
					self.node(child).parent,
					Some(id),
					"Node {} ({:?}) does not point back at parent {}",
					child,
					self.node(child).value,
					id
				);
				stack.push(child);
			}

			let (left, right) = (self.height_of(node.left), self.height_of(node.right));

			// Invariant 2: Height bookkeeping
			assert_eq!(
				node.height,
				1 + left.max(right),
				"Node {:?} has height {} but children have {} and {}",
				node.value,
				node.height,
				left,
				right
			);

			// Invariant 3: Balance
			assert!(
				left.abs_diff(right) <= 1,
				"Node {:?} is unbalanced: left height {}, right height {}",
				node.value,
				left,
				right
			);
		}

		// Invariant 5: Length consistency
		assert_eq!(reachable, self.len, "Reachable nodes {} != len {}", reachable, self.len);

		// Invariant 4: Key ordering
		let mut iter = self.iter();
		if let Some(mut prev) = iter.next() {
			for next in iter {
				assert_eq!(
					self.compare.compare(prev, next),
					Ordering::Less,
					"Records not in order: {:?} then {:?}",
					prev,
					next
				);
				prev = next;
			}
		}

		// Invariant 6: Arena accounting
		self.assert_free_list(self.slots.len() - self.len);
	}

	fn assert_free_list(&self, expected: usize) {
		let mut vacant = 0usize;
		let mut cursor = self.free;
		while let Some(id) = cursor {
			vacant += 1;
			assert!(vacant <= self.slots.len(), "Free list has a cycle");
			cursor = match &self.slots[id] {
				Slot::Vacant {
					next_free,
				} => *next_free,
				Slot::Occupied(node) => {
					panic!("Free list points at live node {} ({:?})", id, node.value)
				}
			};
		}
		assert_eq!(vacant, expected, "Free list has {} slots, expected {}", vacant, expected);
	}

	/// Returns the records level by level, root first.
	///
	/// Useful for checking the exact shape a sequence of rotations produced,
	/// or for printing a tree when an assertion fails.
	pub fn levels(&self) -> Vec<Vec<&T>> {
		use std::collections::VecDeque;

		let mut levels = Vec::new();
		let mut queue: VecDeque<(NodeId, usize)> = self.root.map(|root| (root, 0)).into_iter().collect();
		while let Some((id, depth)) = queue.pop_front() {
			if levels.len() == depth {
				levels.push(Vec::new());
			}
			let node = self.node(id);
			levels[depth].push(&node.value);
			for child in [node.left, node.right].into_iter().flatten() {
				queue.push_back((child, depth + 1));
			}
		}
		levels
	}
}
