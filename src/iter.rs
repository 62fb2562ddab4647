//! Iterators for the `AvlTree` data structure
use crate::{NodeId, Slot};
use smallvec::SmallVec;
use std::iter::FusedIterator;

/// Inline capacity of a traversal stack. An AVL tree of height 64 holds at
/// least `fib(66)` records, far more than fit in an address space, so the
/// stacks never spill to the heap.
const STACK_DEPTH: usize = 64;

type Stack = SmallVec<[NodeId; STACK_DEPTH]>;

/// In-order iterator over the records of a tree.
///
/// Walks the tree with two explicit stacks, one per end, instead of
/// recursing. Stack depth is bounded by the tree height.
pub struct Iter<'t, T> {
	slots: &'t [Slot<T>],
	/// Left spine still to visit from the front.
	front: Stack,
	/// Right spine still to visit from the back.
	back: Stack,
	/// Records not yet yielded from either end. Stops the two ends from
	/// crossing.
	remaining: usize,
}

impl<'t, T> Iter<'t, T> {
	pub(crate) fn new(slots: &'t [Slot<T>], root: Option<NodeId>, len: usize) -> Iter<'t, T> {
		let mut iter = Iter {
			slots,
			front: SmallVec::new(),
			back: SmallVec::new(),
			remaining: len,
		};
		iter.push_left_spine(root);
		iter.push_right_spine(root);
		iter
	}

	#[inline]
	fn push_left_spine(&mut self, mut cursor: Option<NodeId>) {
		while let Some(id) = cursor {
			self.front.push(id);
			cursor = self.slots[id].node().left;
		}
	}

	#[inline]
	fn push_right_spine(&mut self, mut cursor: Option<NodeId>) {
		while let Some(id) = cursor {
			self.back.push(id);
			cursor = self.slots[id].node().right;
		}
	}
}

impl<'t, T> Iterator for Iter<'t, T> {
	type Item = &'t T;

	fn next(&mut self) -> Option<&'t T> {
		if self.remaining == 0 {
			return None;
		}
		let id = self.front.pop()?;
		let node = self.slots[id].node();
		self.push_left_spine(node.right);
		self.remaining -= 1;
		Some(&node.value)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<'t, T> DoubleEndedIterator for Iter<'t, T> {
	fn next_back(&mut self) -> Option<&'t T> {
		if self.remaining == 0 {
			return None;
		}
		let id = self.back.pop()?;
		let node = self.slots[id].node();
		self.push_right_spine(node.left);
		self.remaining -= 1;
		Some(&node.value)
	}
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
	fn clone(&self) -> Self {
		Iter {
			slots: self.slots,
			front: self.front.clone(),
			back: self.back.clone(),
			remaining: self.remaining,
		}
	}
}
