//! # Fixed-Size Byte Map
//!
//! [`BlobMap`] stores keys and values as opaque byte blocks whose sizes are
//! fixed when the map is created. Every block handed to [`BlobMap::set`] is
//! deep-copied into memory the map owns, so callers may reuse their buffers
//! as soon as the call returns.
//!
//! Blocks of the wrong length are rejected with
//! [`Error::InvalidArgument`](crate::Error::InvalidArgument) before anything
//! is copied or linked.

use std::cmp::Ordering;
use std::fmt;

use tracing::debug;

use crate::compare::Compare;
use crate::error::{Argument, Error, Field, Result};
use crate::map::{self, AvlMap};

/// Lets one byte comparator order both stored boxes and borrowed probes.
#[derive(Clone)]
struct BlobOrder<C>(C);

impl<C: Compare<[u8]>> Compare<[u8]> for BlobOrder<C> {
	#[inline]
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		self.0.compare(a, b)
	}
}

impl<C: Compare<[u8]>> Compare<Box<[u8]>> for BlobOrder<C> {
	#[inline]
	fn compare(&self, a: &Box<[u8]>, b: &Box<[u8]>) -> Ordering {
		self.0.compare(&a[..], &b[..])
	}
}

/// An ordered map from fixed-size byte keys to fixed-size byte values.
///
/// # Example
///
/// ```
/// use arbor::{BlobMap, Bytewise};
///
/// let mut map = BlobMap::new(4, 2, Bytewise).unwrap();
/// map.set(&7u32.to_be_bytes(), b"hi").unwrap();
///
/// assert_eq!(map.get(&7u32.to_be_bytes()).unwrap(), Some(&b"hi"[..]));
/// assert!(map.set(b"short", b"hi").is_err());
/// ```
pub struct BlobMap<C> {
	key_size: usize,
	value_size: usize,
	inner: AvlMap<Box<[u8]>, Box<[u8]>, BlobOrder<C>>,
}

impl<C: Compare<[u8]>> BlobMap<C> {
	/// Creates an empty map for keys of `key_size` bytes and values of
	/// `value_size` bytes, ordered by `compare`.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidArgument`] if either size is zero.
	pub fn new(key_size: usize, value_size: usize, compare: C) -> Result<Self> {
		if key_size == 0 {
			return Err(reject(Argument::ZeroSize {
				field: Field::Key,
			}));
		}
		if value_size == 0 {
			return Err(reject(Argument::ZeroSize {
				field: Field::Value,
			}));
		}
		Ok(BlobMap {
			key_size,
			value_size,
			inner: AvlMap::with_comparator(BlobOrder(compare)),
		})
	}

	/// Copies `key` and `value` into the map.
	///
	/// If an equal key is already stored its pair is replaced and the old
	/// value block is returned.
	///
	/// # Errors
	///
	/// - [`Error::InvalidArgument`] if either block has the wrong length.
	/// - [`Error::OutOfMemory`] if a copy or a node cannot be allocated.
	///
	/// In both cases the map is left as it was.
	pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<Option<Box<[u8]>>> {
		self.check(Field::Key, key)?;
		self.check(Field::Value, value)?;
		let key = copy_block(key)?;
		let value = copy_block(value)?;
		self.inner.set(key, value)
	}

	/// Returns the value stored under `key`.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidArgument`] if `key` has the wrong length.
	pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
		self.check(Field::Key, key)?;
		Ok(self.inner.get(key).map(|value| &**value))
	}

	/// Returns `true` if a value is stored under `key`.
	pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
		Ok(self.get(key)?.is_some())
	}

	/// Removes the pair stored under `key` and returns its value block.
	///
	/// Removing a key that is not stored does nothing.
	pub fn remove(&mut self, key: &[u8]) -> Result<Option<Box<[u8]>>> {
		self.check(Field::Key, key)?;
		Ok(self.inner.remove(key))
	}

	/// Checks that `block` has the length declared for `field`.
	fn check(&self, field: Field, block: &[u8]) -> Result<()> {
		let expected = match field {
			Field::Key => self.key_size,
			Field::Value => self.value_size,
		};
		if block.len() == expected {
			return Ok(());
		}
		Err(reject(Argument::SizeMismatch {
			field,
			expected,
			actual: block.len(),
		}))
	}
}

impl<C> BlobMap<C> {
	#[inline]
	pub fn key_size(&self) -> usize {
		self.key_size
	}

	#[inline]
	pub fn value_size(&self) -> usize {
		self.value_size
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Returns `true` if `pred` holds for at least one pair, visiting pairs
	/// in key order.
	pub fn some_matches<F>(&self, mut pred: F) -> bool
	where
		F: FnMut(&[u8], &[u8]) -> bool,
	{
		self.inner.some_matches(|k, v| pred(k, v))
	}

	/// Returns `true` if `pred` holds for every pair, visiting pairs in key
	/// order.
	pub fn all_match<F>(&self, mut pred: F) -> bool
	where
		F: FnMut(&[u8], &[u8]) -> bool,
	{
		self.inner.all_match(|k, v| pred(k, v))
	}

	/// Returns an iterator over the pairs in key order.
	pub fn iter(&self) -> Iter<'_> {
		Iter {
			inner: self.inner.iter(),
		}
	}

	/// Drops every stored pair along with its copied blocks.
	pub fn clear(&mut self) {
		self.inner.clear();
	}
}

impl<C> fmt::Debug for BlobMap<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BlobMap")
			.field("key_size", &self.key_size)
			.field("value_size", &self.value_size)
			.field("len", &self.len())
			.finish()
	}
}

impl<'m, C> IntoIterator for &'m BlobMap<C> {
	type Item = (&'m [u8], &'m [u8]);
	type IntoIter = Iter<'m>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// In-order iterator over the pairs of a [`BlobMap`].
pub struct Iter<'m> {
	inner: map::Iter<'m, Box<[u8]>, Box<[u8]>>,
}

impl<'m> Iterator for Iter<'m> {
	type Item = (&'m [u8], &'m [u8]);

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|(k, v)| (&**k, &**v))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.inner.size_hint()
	}
}

impl DoubleEndedIterator for Iter<'_> {
	fn next_back(&mut self) -> Option<Self::Item> {
		self.inner.next_back().map(|(k, v)| (&**k, &**v))
	}
}

impl ExactSizeIterator for Iter<'_> {}

fn reject(argument: Argument) -> Error {
	debug!(%argument, "rejected blob map argument");
	Error::InvalidArgument(argument)
}

/// Copies `block` into a fresh allocation, reporting failure instead of
/// aborting.
fn copy_block(block: &[u8]) -> Result<Box<[u8]>> {
	let mut buf = Vec::new();
	buf.try_reserve_exact(block.len())?;
	buf.extend_from_slice(block);
	Ok(buf.into_boxed_slice())
}

#[cfg(any(test, feature = "test-utils"))]
impl<C: Compare<[u8]>> BlobMap<C> {
	/// Validates the tree and checks every stored block against the declared
	/// sizes. Panics with diagnostic info on the first violation.
	pub fn assert_invariants(&self) {
		self.inner.assert_invariants();
		for (key, value) in self.iter() {
			assert_eq!(key.len(), self.key_size, "stored key {:?} has the wrong size", key);
			assert_eq!(value.len(), self.value_size, "value under key {:?} has the wrong size", key);
		}
	}
}
