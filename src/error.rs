//! Error type shared by every fallible operation.
use thiserror::Error;
use crate::alloc::AllocError;

/// Errors returned by [`PolicyVec`](crate::PolicyVec) operations.
///
/// A failed operation never modifies the length, capacity or contents
/// of the vector, with one exception: a removal whose shrinking
/// reallocation fails still removes the records and reports the allocator error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
	/// The caller passed an argument outside the operation's domain.
	#[error("invalid argument: {reason}")]
	InvalidArgument {
		/// What was wrong with the argument.
		reason: &'static str
	},

	/// An index or index range is outside the live records.
	#[error("index {index} out of range for length {len}")]
	OutOfRange {
		/// Offending index (or end of the offending range).
		index: usize,
		/// Length of the vector at the time of the call.
		len: usize
	},

	/// A borrowed buffer is too small to satisfy a capacity request.
	#[error("insufficient buffer size: requested {requested} records, buffer holds {capacity}")]
	InsufficientBufferSize {
		/// Requested capacity, in records.
		requested: usize,
		/// Fixed capacity of the buffer, in records.
		capacity: usize
	},

	/// The allocator failed.
	#[error(transparent)]
	Alloc(#[from] AllocError)
}

impl Error {
	#[inline]
	pub(crate) fn invalid(reason: &'static str) -> Self {
		Error::InvalidArgument { reason }
	}
}
