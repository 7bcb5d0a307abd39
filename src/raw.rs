//! Raw record storage.
//!
//! [`RawRecords`] owns (or borrows) a block of record slots and knows nothing
//! about which of them are initialized. It is responsible for reallocation
//! and for moving blocks of records around inside the buffer.
use core::{
	alloc::Layout,
	marker::PhantomData,
	mem::MaybeUninit,
	ptr::{
		self,
		NonNull
	}
};
use crate::{
	alloc::Allocator,
	policy::MIN_CAPACITY,
	Error
};

/// Where the record slots come from.
pub(crate) enum Storage<'a, T, A> {
	/// Obtained from the allocator, which is responsible for resizing and releasing it.
	Owned(A),

	/// Caller-supplied buffer. Never resized nor freed.
	Borrowed(PhantomData<&'a mut [MaybeUninit<T>]>)
}

/// A low-level buffer of `T` slots.
///
/// Dropping a `RawRecords` releases owned storage but never drops the slots content.
pub(crate) struct RawRecords<'a, T, A: Allocator> {
	ptr: NonNull<T>,
	capacity: usize,
	storage: Storage<'a, T, A>
}

// SAFETY: the buffer is either owned or uniquely borrowed.
unsafe impl<'a, T: Send, A: Allocator + Send> Send for RawRecords<'a, T, A> {}
unsafe impl<'a, T: Sync, A: Allocator + Sync> Sync for RawRecords<'a, T, A> {}

impl<'a, T, A: Allocator> RawRecords<'a, T, A> {
	/// Allocates `max(1, capacity)` slots with `alloc`.
	pub fn allocate_in(capacity: usize, alloc: A) -> Result<Self, Error> {
		let capacity = MIN_CAPACITY.max(capacity);
		let ptr = alloc.allocate(Layout::new::<T>(), capacity)?;
		tracing::trace!(capacity, record_size = core::mem::size_of::<T>(), "allocated record buffer");

		Ok(RawRecords {
			ptr: ptr.cast(),
			capacity,
			storage: Storage::Owned(alloc)
		})
	}

	/// Uses the given buffer as storage.
	///
	/// The buffer must not be empty.
	pub fn borrowed(buffer: &'a mut [MaybeUninit<T>]) -> Self {
		debug_assert!(!buffer.is_empty());
		let capacity = buffer.len();

		RawRecords {
			// A slice pointer is never null.
			ptr: NonNull::from(buffer).cast(),
			capacity,
			storage: Storage::Borrowed(PhantomData)
		}
	}

	#[inline]
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	#[inline]
	pub fn as_ptr(&self) -> *const T {
		self.ptr.as_ptr()
	}

	#[inline]
	pub fn as_mut_ptr(&mut self) -> *mut T {
		self.ptr.as_ptr()
	}

	#[inline]
	pub fn is_borrowed(&self) -> bool {
		matches!(self.storage, Storage::Borrowed(_))
	}

	/// Returns the allocator, if the storage is owned.
	#[inline]
	pub fn allocator(&self) -> Option<&A> {
		match &self.storage {
			Storage::Owned(alloc) => Some(alloc),
			Storage::Borrowed(_) => None
		}
	}

	/// Changes the number of slots to `capacity`.
	///
	/// The first `min(capacity, self.capacity())` slots are preserved.
	///
	/// - Borrowed storage never moves: the request succeeds without effect if the
	///   buffer is large enough and fails with [`Error::InsufficientBufferSize`] otherwise.
	/// - Owned storage never goes below [`MIN_CAPACITY`]: a smaller request is clamped
	///   to the floor if the current capacity is above it, and ignored otherwise.
	///
	/// On failure, the buffer is left untouched.
	pub fn reallocate(&mut self, capacity: usize) -> Result<(), Error> {
		let alloc = match &self.storage {
			Storage::Borrowed(_) => {
				if self.capacity < capacity {
					tracing::warn!(requested = capacity, capacity = self.capacity, "fixed buffer too small");
					return Err(Error::InsufficientBufferSize {
						requested: capacity,
						capacity: self.capacity
					})
				}

				return Ok(())
			},
			Storage::Owned(alloc) => alloc
		};

		let capacity = if capacity < MIN_CAPACITY {
			if self.capacity > MIN_CAPACITY {
				MIN_CAPACITY
			} else {
				return Ok(())
			}
		} else {
			capacity
		};

		if capacity == self.capacity {
			return Ok(())
		}

		// SAFETY: `self.ptr` was allocated by `alloc` with the current capacity.
		let ptr = unsafe {
			alloc.reallocate(self.ptr.cast(), Layout::new::<T>(), self.capacity, capacity)?
		};

		tracing::trace!(
			old_capacity = self.capacity,
			new_capacity = capacity,
			record_size = core::mem::size_of::<T>(),
			"reallocated record buffer"
		);

		self.ptr = ptr.cast();
		self.capacity = capacity;
		Ok(())
	}

	/// Moves the slots `[index + count, len)` down to `index`, closing a gap of `count` slots.
	///
	/// # Panics
	///
	/// Panics if `index + count > len` or `len > capacity`.
	pub fn shift_left(&mut self, len: usize, index: usize, count: usize) {
		let end = index.checked_add(count).expect("shift range overflow");
		assert!(end <= len && len <= self.capacity, "shift out of bounds");

		let base = self.as_mut_ptr();
		// SAFETY: both ranges are inside the buffer. `ptr::copy` allows overlap.
		unsafe {
			ptr::copy(base.add(end), base.add(index), len - end);
		}
	}

	/// Moves the slots `[index, len)` up to `index + count`, opening a gap of `count` slots.
	///
	/// The caller must have made room for the shifted slots beforehand.
	///
	/// # Panics
	///
	/// Panics if `index > len` or `len + count > capacity`.
	pub fn shift_right(&mut self, len: usize, index: usize, count: usize) {
		let new_len = len.checked_add(count).expect("shift range overflow");
		assert!(index <= len && new_len <= self.capacity, "shift out of bounds");

		let base = self.as_mut_ptr();
		// SAFETY: both ranges are inside the buffer. `ptr::copy` allows overlap.
		unsafe {
			ptr::copy(base.add(index), base.add(index + count), len - index);
		}
	}

	/// Releases owned storage.
	///
	/// Afterwards the capacity is zero and releasing again is a no-op.
	/// Borrowed storage is left alone.
	pub fn release(&mut self) -> Result<(), Error> {
		if let Storage::Owned(alloc) = &self.storage {
			let capacity = core::mem::replace(&mut self.capacity, 0);
			if capacity != 0 {
				// SAFETY: `self.ptr` was allocated by `alloc` with this capacity.
				unsafe {
					alloc.deallocate(self.ptr.cast(), Layout::new::<T>(), capacity)?;
				}

				tracing::trace!(capacity, "released record buffer");
			}
		}

		Ok(())
	}
}

impl<'a, T, A: Allocator> Drop for RawRecords<'a, T, A> {
	fn drop(&mut self) {
		if let Err(e) = self.release() {
			tracing::warn!(error = %e, "failed to release record buffer");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alloc::Global;

	fn filled(len: usize, capacity: usize) -> RawRecords<'static, u32, Global> {
		let mut raw = RawRecords::<u32, Global>::allocate_in(capacity, Global).unwrap();
		for i in 0..len {
			unsafe { raw.as_mut_ptr().add(i).write(i as u32) }
		}
		raw
	}

	fn read(raw: &RawRecords<u32, Global>, len: usize) -> Vec<u32> {
		(0..len).map(|i| unsafe { raw.as_ptr().add(i).read() }).collect()
	}

	#[test]
	fn allocation_applies_capacity_floor() {
		let raw = RawRecords::<u32, _>::allocate_in(0, Global).unwrap();
		assert_eq!(raw.capacity(), 1);
		assert!(!raw.is_borrowed());
	}

	#[test]
	fn shift_left_overlapping() {
		let mut raw = filled(6, 6);
		raw.shift_left(6, 1, 2);
		assert_eq!(&read(&raw, 4), &[0, 3, 4, 5]);
	}

	#[test]
	fn shift_right_overlapping() {
		let mut raw = filled(5, 8);
		raw.shift_right(5, 1, 2);
		assert_eq!(&read(&raw, 7)[3..], &[1, 2, 3, 4]);
		assert_eq!(read(&raw, 1), vec![0]);
	}

	#[test]
	fn shift_right_at_end_moves_nothing() {
		let mut raw = filled(3, 4);
		raw.shift_right(3, 3, 1);
		assert_eq!(read(&raw, 3), vec![0, 1, 2]);
	}

	#[test]
	#[should_panic]
	fn shift_right_past_capacity_panics() {
		let mut raw = filled(4, 4);
		raw.shift_right(4, 0, 1);
	}

	#[test]
	fn reallocate_preserves_prefix() {
		let mut raw = filled(4, 4);
		raw.reallocate(32).unwrap();
		assert_eq!(raw.capacity(), 32);
		assert_eq!(read(&raw, 4), vec![0, 1, 2, 3]);
		raw.reallocate(2).unwrap();
		assert_eq!(read(&raw, 2), vec![0, 1]);
	}

	#[test]
	fn reallocate_below_floor_clamps_or_ignores() {
		let mut raw = filled(0, 8);
		raw.reallocate(0).unwrap();
		assert_eq!(raw.capacity(), 1);
		raw.reallocate(0).unwrap();
		assert_eq!(raw.capacity(), 1);
	}

	#[test]
	fn borrowed_never_reallocates() {
		let mut buffer = [MaybeUninit::<u32>::uninit(); 4];
		let mut raw = RawRecords::<u32, Global>::borrowed(&mut buffer);
		assert!(raw.is_borrowed());
		assert!(raw.allocator().is_none());
		raw.reallocate(2).unwrap();
		assert_eq!(raw.capacity(), 4);
		assert_eq!(
			raw.reallocate(5),
			Err(Error::InsufficientBufferSize { requested: 5, capacity: 4 })
		);
		assert_eq!(raw.capacity(), 4);
	}

	#[test]
	fn release_is_idempotent() {
		let mut raw = filled(2, 2);
		raw.release().unwrap();
		assert_eq!(raw.capacity(), 0);
		raw.release().unwrap();
	}
}
