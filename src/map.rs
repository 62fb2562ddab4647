//! # Ordered Key-Value Map
//!
//! [`AvlMap`] stores each entry as a [`Pair`] record inside an
//! [`AvlTree`](crate::AvlTree). The tree is handed a comparator that looks at
//! the key half of a pair only, so the engine never learns about the key/value
//! split. Lookups and removals search with a key-only probe; nothing is
//! allocated to answer them.
//!
//! ```text
//!   get(k) ──► probe |pair| cmp(pair.key, k) ──► AvlTree::find_by
//!   set(k, v) ──► Pair { k, v } ──────────────► AvlTree::insert
//!   remove(k) ──► probe |pair| cmp(pair.key, k) ► AvlTree::remove_by
//! ```

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use crate::compare::{Compare, Natural};
use crate::error::Result;
use crate::{iter, AvlTree};

/// One entry of the map, as stored in the tree.
#[derive(Clone)]
pub(crate) struct Pair<K, V> {
	pub(crate) key: K,
	pub(crate) value: V,
}

/// Orders pairs by their keys alone.
#[derive(Clone)]
pub(crate) struct KeyOrder<C>(C);

impl<K, V, C: Compare<K>> Compare<Pair<K, V>> for KeyOrder<C> {
	#[inline]
	fn compare(&self, a: &Pair<K, V>, b: &Pair<K, V>) -> Ordering {
		self.0.compare(&a.key, &b.key)
	}
}

/// An ordered map backed by an AVL tree.
///
/// # Example
///
/// ```
/// use arbor::AvlMap;
///
/// let mut map = AvlMap::new();
/// map.set(3, "three").unwrap();
/// map.set(1, "one").unwrap();
/// map.set(2, "two").unwrap();
///
/// assert_eq!(map.get(&2), Some(&"two"));
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
///
/// assert_eq!(map.remove(&2), Some("two"));
/// assert_eq!(map.get(&2), None);
/// ```
pub struct AvlMap<K, V, C = Natural> {
	tree: AvlTree<Pair<K, V>, KeyOrder<C>>,
}

impl<K: Ord, V> AvlMap<K, V, Natural> {
	/// Creates an empty map ordered by `K`'s [`Ord`] implementation.
	pub fn new() -> Self {
		Self::with_comparator(Natural)
	}
}

impl<K: Ord, V> Default for AvlMap<K, V, Natural> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V, C> AvlMap<K, V, C> {
	/// Creates an empty map whose keys are ordered by `compare`.
	pub fn with_comparator(compare: C) -> Self {
		AvlMap {
			tree: AvlTree::with_comparator(KeyOrder(compare)),
		}
	}

	/// Creates an empty map with room for `capacity` entries.
	pub fn with_capacity_and_comparator(capacity: usize, compare: C) -> Self {
		AvlMap {
			tree: AvlTree::with_capacity_and_comparator(capacity, KeyOrder(compare)),
		}
	}

	/// Returns the number of entries. Always equal to the underlying tree's
	/// record count.
	#[inline]
	pub fn len(&self) -> usize {
		self.tree.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.tree.is_empty()
	}

	/// Returns the height of the underlying tree.
	pub fn height(&self) -> usize {
		self.tree.height()
	}

	/// Reserves room for at least `additional` more entries.
	pub fn reserve(&mut self, additional: usize) -> Result<()> {
		self.tree.reserve(additional)
	}

	/// Returns `true` if `pred` holds for at least one entry, visiting entries
	/// in key order and stopping at the first match.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlMap;
	///
	/// let mut map = AvlMap::new();
	/// for i in 0..25 {
	///     map.set(i, i * 2).unwrap();
	/// }
	///
	/// assert!(map.some_matches(|_, v| *v == 48));
	/// assert!(!map.all_match(|_, v| *v > 0));
	/// ```
	pub fn some_matches<F>(&self, mut pred: F) -> bool
	where
		F: FnMut(&K, &V) -> bool,
	{
		self.tree.some_matches(|pair| pred(&pair.key, &pair.value))
	}

	/// Returns `true` if `pred` holds for every entry, visiting entries in key
	/// order and stopping at the first miss.
	pub fn all_match<F>(&self, mut pred: F) -> bool
	where
		F: FnMut(&K, &V) -> bool,
	{
		self.tree.all_match(|pair| pred(&pair.key, &pair.value))
	}

	/// Returns the entry with the smallest key.
	pub fn first_key_value(&self) -> Option<(&K, &V)> {
		self.tree.first().map(|pair| (&pair.key, &pair.value))
	}

	/// Returns the entry with the largest key.
	pub fn last_key_value(&self) -> Option<(&K, &V)> {
		self.tree.last().map(|pair| (&pair.key, &pair.value))
	}

	/// Returns an iterator over the entries in key order.
	pub fn iter(&self) -> Iter<'_, K, V> {
		Iter {
			inner: self.tree.iter(),
		}
	}

	/// Returns an iterator over the keys in order.
	pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
		self.iter().map(|(k, _)| k)
	}

	/// Returns an iterator over the values in key order.
	pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
		self.iter().map(|(_, v)| v)
	}

	/// Removes every entry.
	pub fn clear(&mut self) {
		self.tree.clear();
	}
}

impl<K, V, C: Compare<K>> AvlMap<K, V, C> {
	/// Returns the value stored under `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<&V>
	where
		K: Borrow<Q>,
		Q: ?Sized,
		C: Compare<Q>,
	{
		self.get_key_value(key).map(|(_, v)| v)
	}

	/// Returns the stored key and value for `key`.
	pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
	where
		K: Borrow<Q>,
		Q: ?Sized,
		C: Compare<Q>,
	{
		let order = &self.tree.comparator().0;
		self.tree
			.find_by(|pair| Compare::<Q>::compare(order, pair.key.borrow(), key))
			.map(|pair| (&pair.key, &pair.value))
	}

	/// Returns a mutable reference to the value stored under `key`.
	pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
	where
		K: Borrow<Q>,
		Q: ?Sized,
		C: Compare<Q>,
	{
		self.tree
			.find_mut_with(|order, pair| Compare::<Q>::compare(&order.0, pair.key.borrow(), key))
			.map(|pair| &mut pair.value)
	}

	/// Returns `true` if the map holds an entry for `key`.
	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: ?Sized,
		C: Compare<Q>,
	{
		self.get_key_value(key).is_some()
	}

	/// Stores `value` under `key`.
	///
	/// If an equal key is already present the whole entry is replaced, key
	/// included, and the previous value is returned. The number of entries
	/// only changes when the key is new.
	///
	/// # Errors
	///
	/// Returns [`Error::OutOfMemory`](crate::Error::OutOfMemory) if a new node
	/// cannot be allocated. The map is unchanged.
	///
	/// # Example
	///
	/// ```
	/// use arbor::AvlMap;
	///
	/// let mut map = AvlMap::new();
	/// assert_eq!(map.set("k", 1).unwrap(), None);
	/// assert_eq!(map.set("k", 2).unwrap(), Some(1));
	/// assert_eq!(map.len(), 1);
	/// assert_eq!(map.get("k"), Some(&2));
	/// ```
	pub fn set(&mut self, key: K, value: V) -> Result<Option<V>> {
		let replaced = self.tree.insert(Pair {
			key,
			value,
		})?;
		Ok(replaced.map(|pair| pair.value))
	}

	/// Removes the entry for `key` and returns its value.
	///
	/// Removing a key that is not present does nothing.
	pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized,
		C: Compare<Q>,
	{
		self.remove_entry(key).map(|(_, v)| v)
	}

	/// Removes the entry for `key` and returns the stored key and value.
	pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
	where
		K: Borrow<Q>,
		Q: ?Sized,
		C: Compare<Q>,
	{
		self.tree
			.remove_with(|order, pair| Compare::<Q>::compare(&order.0, pair.key.borrow(), key))
			.map(|pair| (pair.key, pair.value))
	}
}

impl<K: Clone, V: Clone, C: Clone> Clone for AvlMap<K, V, C> {
	fn clone(&self) -> Self {
		AvlMap {
			tree: self.tree.clone(),
		}
	}
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for AvlMap<K, V, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

impl<'m, K, V, C> IntoIterator for &'m AvlMap<K, V, C> {
	type Item = (&'m K, &'m V);
	type IntoIter = Iter<'m, K, V>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// In-order iterator over the entries of an [`AvlMap`].
pub struct Iter<'m, K, V> {
	inner: iter::Iter<'m, Pair<K, V>>,
}

impl<'m, K, V> Iterator for Iter<'m, K, V> {
	type Item = (&'m K, &'m V);

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(|pair| (&pair.key, &pair.value))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.inner.size_hint()
	}
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
	fn next_back(&mut self) -> Option<Self::Item> {
		self.inner.next_back().map(|pair| (&pair.key, &pair.value))
	}
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Invariant validation for testing.
#[cfg(any(test, feature = "test-utils"))]
impl<K: fmt::Debug, V, C: Compare<K>> AvlMap<K, V, C> {
	/// Validates the underlying tree. Panics with diagnostic info if any
	/// invariant is violated.
	pub fn assert_invariants(&self) {
		self.tree.assert_invariants();
	}
}

#[cfg(any(test, feature = "test-utils"))]
impl<K: fmt::Debug, V> fmt::Debug for Pair<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Values are left out so maps over opaque values can still be checked.
		f.debug_tuple("Pair").field(&self.key).finish()
	}
}
