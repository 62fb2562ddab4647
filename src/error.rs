//! # Error Types for the AVL Containers
//!
//! Only two things can go wrong in this crate: a caller hands a container an
//! argument that breaks its record shape contract, or the allocator refuses
//! to hand out memory for a new node or a copied byte block.
//!
//! A key that is not present is never an error. Lookups and removals report
//! it as `None`, and removing a missing key is a no-op.
//!
//! ## Error Flow
//!
//! ```text
//! set(key, value)
//!      │
//!      ▼
//! Validate sizes ──────────► Err(InvalidArgument) ───► Caller fixes input
//!      │
//!      ▼
//! Reserve node / copy bytes ► Err(OutOfMemory) ──────► Container unchanged
//!      │
//!      ▼ (Ok)
//! Link and rebalance
//! ```
//!
//! Nothing is retried internally. Every error reaches the immediate caller
//! before any link in the tree has been touched.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Errors returned by the containers in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// The call broke the container's record shape contract.
	///
	/// Raised by [`BlobMap`](crate::blob::BlobMap) when it is constructed with
	/// a zero-sized key or value, or handed a block of the wrong length.
	#[error("invalid argument: {0}")]
	InvalidArgument(Argument),

	/// Memory for a node or a deep-copied block could not be reserved.
	///
	/// The container is left exactly as it was before the call.
	#[error("allocation failed: {0}")]
	OutOfMemory(#[from] TryReserveError),
}

/// Describes which part of a call was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
	/// A record part was declared with a size of zero bytes.
	#[error("{field} size must be non-zero")]
	ZeroSize {
		field: Field,
	},

	/// A block did not match the size declared at construction.
	#[error("{field} must be {expected} bytes, got {actual}")]
	SizeMismatch {
		field: Field,
		expected: usize,
		actual: usize,
	},
}

/// The two halves of a stored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
	Key,
	Value,
}

impl fmt::Display for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Field::Key => f.write_str("key"),
			Field::Value => f.write_str("value"),
		}
	}
}

impl From<Argument> for Error {
	fn from(argument: Argument) -> Self {
		Error::InvalidArgument(argument)
	}
}

/// A Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;
