//! Comparators used to order records.
//!
//! A comparator must describe a strict total order that stays the same for
//! the whole life of the container it was handed to.

use std::cmp::Ordering;

/// A three-way comparison over `T`.
///
/// Any `Fn(&T, &T) -> Ordering` closure is a comparator, so most callers never
/// name this trait:
///
/// ```
/// use arbor::AvlTree;
///
/// let mut tree = AvlTree::with_comparator(|a: &i32, b: &i32| b.cmp(a));
/// tree.insert(1).unwrap();
/// tree.insert(3).unwrap();
/// tree.insert(2).unwrap();
///
/// let order: Vec<_> = tree.iter().copied().collect();
/// assert_eq!(order, vec![3, 2, 1]);
/// ```
pub trait Compare<T: ?Sized> {
	/// Returns the ordering of `a` relative to `b`.
	fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T: ?Sized, F> Compare<T> for F
where
	F: Fn(&T, &T) -> Ordering,
{
	#[inline]
	fn compare(&self, a: &T, b: &T) -> Ordering {
		self(a, b)
	}
}

/// Orders records by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<T: Ord + ?Sized> Compare<T> for Natural {
	#[inline]
	fn compare(&self, a: &T, b: &T) -> Ordering {
		a.cmp(b)
	}
}

/// Full-length lexicographic comparison of byte blocks.
///
/// Every byte takes part, embedded zeros included, so this is the right
/// choice for binary keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bytewise;

impl Compare<[u8]> for Bytewise {
	#[inline]
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		a.cmp(b)
	}
}

/// C-string comparison bounded by the block length.
///
/// Bytes are compared until they differ, a zero byte is reached in both
/// blocks, or the shorter block ends. Anything after the first zero byte is
/// ignored, so `b"ab\0x"` and `b"ab\0y"` compare equal.
///
/// Only use this for keys that really are zero-terminated text. Multi-byte
/// integers in particular do not sort numerically under it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NulTerminated;

impl Compare<[u8]> for NulTerminated {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		for (x, y) in a.iter().zip(b) {
			match x.cmp(y) {
				Ordering::Equal if *x == 0 => return Ordering::Equal,
				Ordering::Equal => continue,
				unequal => return unequal,
			}
		}
		// One block ran out; a terminator in the longer one still ends the string.
		let rest = |s: &[u8], from: usize| s.get(from).map_or(true, |b| *b == 0);
		let common = a.len().min(b.len());
		match (rest(a, common), rest(b, common)) {
			(true, true) => Ordering::Equal,
			(true, false) => Ordering::Less,
			(false, true) => Ordering::Greater,
			(false, false) => unreachable!("one of the blocks ends at the common length"),
		}
	}
}
