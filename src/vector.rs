use core::{
	fmt,
	mem::{
		self,
		MaybeUninit
	},
	ops::{
		Index,
		IndexMut
	},
	ptr
};
use crate::{
	alloc::{
		AllocError,
		Allocator,
		Global
	},
	raw::RawRecords,
	Error,
	GrowthPolicy
};

/// Contiguous growable array of `Copy` records with a tunable reallocation policy.
///
/// The vector either owns its storage, obtained from an [`Allocator`], or works
/// inside a fixed buffer provided by the caller.
///
/// In the first case, the storage grows when an insertion needs more room
/// and shrinks when removals leave it sparse, as decided by a [`GrowthPolicy`].
/// In the second case, the capacity is the length of the buffer and never changes:
/// any operation that would need more room fails with [`Error::InsufficientBufferSize`].
///
/// Every fallible operation leaves the vector untouched when it fails,
/// with one exception: a removal whose shrinking reallocation fails
/// still removes the records and reports the allocator error.
///
/// # Examples
///
/// ```
/// # use policy_vec::PolicyVec;
/// let mut vec: PolicyVec<'_, u32> = PolicyVec::new()?;
/// vec.push(1)?;
/// vec.push(2)?;
/// vec.insert(1, 3)?;
/// assert_eq!(*vec.get(1)?, 3);
/// assert_eq!(vec.len(), 3);
/// assert_eq!(vec.capacity(), 4);
/// # Ok::<(), policy_vec::Error>(())
/// ```
///
/// Using a fixed buffer:
///
/// ```
/// # use policy_vec::{PolicyVec, Error};
/// # use core::mem::MaybeUninit;
/// let mut buffer = [MaybeUninit::<u8>::uninit(); 2];
/// let mut vec = PolicyVec::from_buffer(&mut buffer)?;
/// vec.push(1)?;
/// vec.push(2)?;
/// assert!(matches!(vec.push(3), Err(Error::InsufficientBufferSize { .. })));
/// # Ok::<(), policy_vec::Error>(())
/// ```
pub struct PolicyVec<'a, T: Copy, A: Allocator = Global> {
	raw: RawRecords<'a, T, A>,
	len: usize,
	policy: GrowthPolicy
}

impl<'a, T: Copy> PolicyVec<'a, T, Global> {
	/// Creates an empty vector with the default allocator and policy.
	///
	/// A single slot is allocated.
	#[inline]
	pub fn new() -> Result<Self, Error> {
		Self::with_capacity(0)
	}

	/// Creates an empty vector with room for `max(1, capacity)` records,
	/// using the default allocator and policy
	/// (growth factor `2.0`, shrink threshold `0.25`).
	#[inline]
	pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
		Self::with_capacity_in(capacity, Global)
	}

	/// Creates an empty vector working inside the given buffer.
	///
	/// The capacity is the length of the buffer and never changes.
	/// The vector never shrinks and never over-allocates.
	///
	/// Returns [`Error::InvalidArgument`] if the buffer is empty
	/// or `T` is zero-sized.
	pub fn from_buffer(buffer: &'a mut [MaybeUninit<T>]) -> Result<Self, Error> {
		check_record_size::<T>()?;
		if buffer.is_empty() {
			return Err(Error::invalid("buffer is empty"))
		}

		Ok(PolicyVec {
			raw: RawRecords::borrowed(buffer),
			len: 0,
			policy: GrowthPolicy::fixed()
		})
	}
}

impl<'a, T: Copy, A: Allocator> PolicyVec<'a, T, A> {
	/// Creates an empty vector allocating with `alloc`, using the default policy.
	#[inline]
	pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, Error> {
		Self::with_policy_in(capacity, alloc, GrowthPolicy::default())
	}

	/// Creates an empty vector with room for `max(1, capacity)` records,
	/// allocating with `alloc` and reallocating according to `policy`.
	///
	/// Returns [`Error::InvalidArgument`] if `T` is zero-sized,
	/// or the allocator error if the initial allocation fails.
	///
	/// # Example
	///
	/// ```
	/// # use policy_vec::{PolicyVec, GrowthPolicy, Global};
	/// let policy = GrowthPolicy::new(1.0, 0.0)?; // exact fit, never shrink.
	/// let mut vec: PolicyVec<'_, u64> = PolicyVec::with_policy_in(0, Global, policy)?;
	/// vec.push(1)?;
	/// vec.push(2)?;
	/// assert_eq!(vec.capacity(), 2);
	/// # Ok::<(), policy_vec::Error>(())
	/// ```
	pub fn with_policy_in(capacity: usize, alloc: A, policy: GrowthPolicy) -> Result<Self, Error> {
		check_record_size::<T>()?;

		Ok(PolicyVec {
			raw: RawRecords::allocate_in(capacity, alloc)?,
			len: 0,
			policy
		})
	}

	/// Tears down the vector, releasing owned storage through its allocator.
	///
	/// Dropping the vector does the same, but has no way to report
	/// a deallocation failure.
	pub fn destroy(mut self) -> Result<(), Error> {
		self.raw.release()
	}

	/// Returns the number of records in the vector.
	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the number of record slots backing the vector.
	#[inline]
	pub fn capacity(&self) -> usize {
		self.raw.capacity()
	}

	/// Size of a single record, in bytes.
	#[inline]
	pub fn record_size(&self) -> usize {
		mem::size_of::<T>()
	}

	#[inline]
	pub fn policy(&self) -> &GrowthPolicy {
		&self.policy
	}

	/// Returns true if the storage was obtained from an allocator.
	#[inline]
	pub fn is_owned(&self) -> bool {
		!self.raw.is_borrowed()
	}

	/// Returns true if the vector works inside a caller-supplied buffer.
	#[inline]
	pub fn is_borrowed(&self) -> bool {
		self.raw.is_borrowed()
	}

	/// Returns the allocator, or `None` if the storage is borrowed.
	#[inline]
	pub fn allocator(&self) -> Option<&A> {
		self.raw.allocator()
	}

	#[inline]
	fn check_index(&self, index: usize) -> Result<(), Error> {
		if index >= self.len {
			Err(Error::OutOfRange { index, len: self.len })
		} else {
			Ok(())
		}
	}

	/// Returns a reference to the record at `index`.
	///
	/// Returns [`Error::OutOfRange`] if `index >= len`.
	#[inline]
	pub fn get(&self, index: usize) -> Result<&T, Error> {
		self.check_index(index)?;
		// SAFETY: slots below `len` are initialized.
		unsafe { Ok(&*self.raw.as_ptr().add(index)) }
	}

	/// Returns a mutable reference to the record at `index`.
	///
	/// Returns [`Error::OutOfRange`] if `index >= len`.
	#[inline]
	pub fn get_mut(&mut self, index: usize) -> Result<&mut T, Error> {
		self.check_index(index)?;
		// SAFETY: slots below `len` are initialized.
		unsafe { Ok(&mut *self.raw.as_mut_ptr().add(index)) }
	}

	/// Overwrites the record at `index`.
	///
	/// Returns [`Error::OutOfRange`] if `index >= len`.
	#[inline]
	pub fn assign(&mut self, index: usize, value: T) -> Result<(), Error> {
		*self.get_mut(index)? = value;
		Ok(())
	}

	/// Makes sure `new_len` records fit, growing to `policy.target(new_len)` if needed.
	fn grow_for(&mut self, new_len: usize) -> Result<(), Error> {
		let capacity = self.raw.capacity();
		if self.policy.should_grow(new_len, capacity) {
			let target = self.policy.target(new_len);
			tracing::debug!(len = self.len, new_len, capacity, target, "growing");
			self.raw.reallocate(target)?;
		}

		Ok(())
	}

	/// Reallocates to `target` slots once the policy decided to shrink.
	///
	/// With a large growth factor, `target` may exceed the current capacity.
	fn shrink_to_target(&mut self, target: usize) -> Result<(), Error> {
		tracing::debug!(len = self.len, capacity = self.raw.capacity(), target, "shrinking");
		self.raw.reallocate(target)
	}

	/// Shrinks the storage after a removal, if the policy says it is sparse enough.
	fn shrink_if_sparse(&mut self) -> Result<(), Error> {
		if self.policy.should_shrink(self.len, self.raw.capacity()) {
			self.shrink_to_target(self.policy.target(self.len))
		} else {
			Ok(())
		}
	}

	/// Appends a record at the end of the vector.
	///
	/// If the vector is full, the storage first grows to
	/// `max(1, ceil((len + 1) * growth_factor))` slots.
	pub fn push(&mut self, value: T) -> Result<(), Error> {
		let len = self.len;
		self.grow_for(len + 1)?;

		// SAFETY: `len < capacity` after growing.
		unsafe {
			self.raw.as_mut_ptr().add(len).write(value);
		}

		self.len = len + 1;
		Ok(())
	}

	/// Inserts a record at position `index`, shifting all records after it to the right.
	///
	/// Returns [`Error::OutOfRange`] if `index > len`.
	#[inline]
	pub fn insert(&mut self, index: usize, value: T) -> Result<(), Error> {
		self.insert_many(index, core::slice::from_ref(&value))
	}

	/// Inserts the given records at position `index`,
	/// shifting all records after it to the right.
	///
	/// If the records do not fit, the storage first grows to
	/// `max(1, ceil((len + values.len()) * growth_factor))` slots.
	///
	/// Returns [`Error::InvalidArgument`] if `values` is empty
	/// and [`Error::OutOfRange`] if `index > len`.
	///
	/// # Example
	///
	/// ```
	/// # use policy_vec::PolicyVec;
	/// let mut vec: PolicyVec<'_, char> = PolicyVec::with_capacity(4)?;
	/// vec.insert_many(0, &['a', 'd'])?;
	/// vec.insert_many(1, &['b', 'c'])?;
	/// assert_eq!(*vec.get(2)?, 'c');
	/// assert_eq!(*vec.get(3)?, 'd');
	/// # Ok::<(), policy_vec::Error>(())
	/// ```
	pub fn insert_many(&mut self, index: usize, values: &[T]) -> Result<(), Error> {
		let count = values.len();
		if count == 0 {
			return Err(Error::invalid("nothing to insert"))
		}

		let len = self.len;
		if index > len {
			return Err(Error::OutOfRange { index, len })
		}

		let new_len = len.checked_add(count).ok_or(AllocError::CapacityOverflow)?;
		self.grow_for(new_len)?;

		if index < len {
			self.raw.shift_right(len, index, count);
		}

		// SAFETY: `[index, index + count)` is inside the buffer after growing.
		// `values` cannot alias the buffer since we hold it mutably.
		unsafe {
			ptr::copy_nonoverlapping(values.as_ptr(), self.raw.as_mut_ptr().add(index), count);
		}

		self.len = new_len;
		Ok(())
	}

	/// Removes and returns the record at `index`, shifting all records after it to the left.
	///
	/// Returns [`Error::OutOfRange`] if `index >= len`.
	pub fn remove(&mut self, index: usize) -> Result<T, Error> {
		let value = *self.get(index)?;
		self.remove_many(index, 1)?;
		Ok(value)
	}

	/// Removes the `count` records starting at `index`,
	/// shifting all records after them to the left.
	///
	/// The storage then shrinks if the policy deems it too sparse.
	///
	/// Returns [`Error::InvalidArgument`] if `count` is zero
	/// and [`Error::OutOfRange`] if the range `[index, index + count)`
	/// is not inside the vector.
	pub fn remove_many(&mut self, index: usize, count: usize) -> Result<(), Error> {
		if count == 0 {
			return Err(Error::invalid("nothing to remove"))
		}

		let len = self.len;
		self.check_index(index)?;
		let end = match index.checked_add(count) {
			Some(end) if end <= len => end,
			_ => return Err(Error::OutOfRange { index: index.saturating_add(count), len })
		};

		if end < len {
			self.raw.shift_left(len, index, count);
		}

		self.len = len - count;
		self.shrink_if_sparse()
	}

	/// Removes and returns the last record.
	///
	/// Returns [`Error::OutOfRange`] if the vector is empty.
	pub fn pop(&mut self) -> Result<T, Error> {
		if self.len == 0 {
			return Err(Error::OutOfRange { index: 0, len: 0 })
		}

		let value = *self.get(self.len - 1)?;
		self.len -= 1;
		self.shrink_if_sparse()?;
		Ok(value)
	}

	/// Removes every record. Same as resizing to `0`.
	#[inline]
	pub fn clear(&mut self) -> Result<(), Error> {
		self.fit_storage(0)?;
		self.len = 0;
		Ok(())
	}

	/// Grows or shrinks the storage to `ceil(len * growth_factor)` slots
	/// if the policy requires it for a vector of length `len`.
	fn fit_storage(&mut self, len: usize) -> Result<(), Error> {
		let capacity = self.raw.capacity();
		if self.policy.should_grow(len, capacity) {
			let target = self.policy.scaled(len);
			tracing::debug!(len = self.len, new_len = len, capacity, target, "growing");
			self.raw.reallocate(target)
		} else if self.policy.should_shrink(len, capacity) {
			self.shrink_to_target(self.policy.scaled(len))
		} else {
			Ok(())
		}
	}

	/// Sets the length of the vector to `len`, reallocating as the policy requires.
	///
	/// Records exposed by a longer length are set to `value`.
	///
	/// Unlike insertions, which leave room for `len + count` records scaled
	/// by the growth factor, this scales the requested length directly.
	///
	/// # Example
	///
	/// ```
	/// # use policy_vec::PolicyVec;
	/// let mut vec: PolicyVec<'_, i32> = PolicyVec::new()?;
	/// vec.resize(3, -1)?;
	/// assert_eq!(vec.len(), 3);
	/// assert_eq!(vec.capacity(), 6);
	/// assert_eq!(*vec.get(2)?, -1);
	/// # Ok::<(), policy_vec::Error>(())
	/// ```
	pub fn resize(&mut self, len: usize, value: T) -> Result<(), Error> {
		self.fit_storage(len)?;

		let base = self.raw.as_mut_ptr();
		for i in self.len..len {
			// SAFETY: `len <= capacity` after fitting the storage.
			unsafe { base.add(i).write(value) }
		}

		self.len = len;
		Ok(())
	}

	/// Same as [`resize`](Self::resize), without initializing the exposed records.
	///
	/// ## Safety
	///
	/// The caller must [`assign`](Self::assign) every record in `[old_len, len)`
	/// before reading it.
	pub unsafe fn resize_uninit(&mut self, len: usize) -> Result<(), Error> {
		self.fit_storage(len)?;
		self.len = len;
		Ok(())
	}

	/// Makes sure the storage can hold at least `capacity` records.
	///
	/// Reallocates to exactly `capacity` slots if needed.
	/// Never shrinks.
	pub fn reserve(&mut self, capacity: usize) -> Result<(), Error> {
		if capacity > self.raw.capacity() {
			self.raw.reallocate(capacity)?;
		}

		Ok(())
	}

	/// Reallocates the storage to exactly `len` slots (and at least one).
	///
	/// This has no effect on borrowed storage.
	#[inline]
	pub fn shrink_to_fit(&mut self) -> Result<(), Error> {
		self.raw.reallocate(self.len)
	}

	/// Records as a slice.
	#[inline]
	pub(crate) fn as_slice(&self) -> &[T] {
		// SAFETY: slots below `len` are initialized.
		unsafe { core::slice::from_raw_parts(self.raw.as_ptr(), self.len) }
	}
}

/// Checks that `T` has a non-zero size.
fn check_record_size<T>() -> Result<(), Error> {
	if mem::size_of::<T>() == 0 {
		Err(Error::invalid("record size must not be zero"))
	} else {
		Ok(())
	}
}

impl<'a, T: Copy, A: Allocator> Index<usize> for PolicyVec<'a, T, A> {
	type Output = T;

	#[inline]
	fn index(&self, index: usize) -> &T {
		&self.as_slice()[index]
	}
}

impl<'a, T: Copy, A: Allocator> IndexMut<usize> for PolicyVec<'a, T, A> {
	#[inline]
	fn index_mut(&mut self, index: usize) -> &mut T {
		let len = self.len;
		match self.get_mut(index) {
			Ok(value) => value,
			Err(_) => panic!("index out of bounds: the len is {} but the index is {}", len, index)
		}
	}
}

impl<'a, T: Copy + fmt::Debug, A: Allocator> fmt::Debug for PolicyVec<'a, T, A> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_list().entries(self.as_slice()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_allocates_one_slot() {
		let vec = PolicyVec::<u32>::new().unwrap();
		assert_eq!(vec.len(), 0);
		assert_eq!(vec.capacity(), 1);
		assert!(vec.is_owned());
		assert_eq!(vec.record_size(), 4);
	}

	#[test]
	fn zero_sized_records_are_rejected() {
		assert!(matches!(PolicyVec::<()>::new(), Err(Error::InvalidArgument { .. })));
		let mut buffer = [MaybeUninit::<()>::uninit(); 4];
		assert!(matches!(PolicyVec::from_buffer(&mut buffer), Err(Error::InvalidArgument { .. })));
	}

	#[test]
	fn empty_buffer_is_rejected() {
		let mut buffer: [MaybeUninit<u8>; 0] = [];
		assert!(matches!(PolicyVec::from_buffer(&mut buffer), Err(Error::InvalidArgument { .. })));
	}

	#[test]
	fn get_out_of_range() {
		let mut vec = PolicyVec::<u8>::with_capacity(4).unwrap();
		vec.push(7).unwrap();
		assert_eq!(vec.get(1), Err(Error::OutOfRange { index: 1, len: 1 }));
		assert_eq!(vec.assign(1, 0), Err(Error::OutOfRange { index: 1, len: 1 }));
		assert_eq!(vec.get(0), Ok(&7));
	}

	#[test]
	fn insert_many_rejects_empty_and_past_end() {
		let mut vec = PolicyVec::<u8>::with_capacity(4).unwrap();
		assert!(matches!(vec.insert_many(0, &[]), Err(Error::InvalidArgument { .. })));
		assert_eq!(vec.insert(1, 0), Err(Error::OutOfRange { index: 1, len: 0 }));
		assert_eq!(vec.len(), 0);
	}

	#[test]
	fn remove_many_rejects_bad_ranges() {
		let mut vec = PolicyVec::<u8>::with_capacity(4).unwrap();
		vec.insert_many(0, &[1, 2, 3]).unwrap();
		assert!(matches!(vec.remove_many(0, 0), Err(Error::InvalidArgument { .. })));
		assert_eq!(vec.remove_many(3, 1), Err(Error::OutOfRange { index: 3, len: 3 }));
		assert_eq!(vec.remove_many(2, 2), Err(Error::OutOfRange { index: 4, len: 3 }));
		assert_eq!(vec.remove_many(1, usize::MAX), Err(Error::OutOfRange { index: usize::MAX, len: 3 }));
		assert_eq!(vec.as_slice(), &[1, 2, 3]);
	}

	#[test]
	fn pop_empty_is_out_of_range() {
		let mut vec = PolicyVec::<u16>::new().unwrap();
		assert_eq!(vec.pop(), Err(Error::OutOfRange { index: 0, len: 0 }));
	}

	#[test]
	fn remove_returns_value() {
		let mut vec = PolicyVec::<u16>::new().unwrap();
		vec.insert_many(0, &[10, 20, 30]).unwrap();
		assert_eq!(vec.remove(1), Ok(20));
		assert_eq!(vec.as_slice(), &[10, 30]);
		assert_eq!(vec.pop(), Ok(30));
		assert_eq!(vec.as_slice(), &[10]);
	}

	#[test]
	fn shrink_reallocates_to_scaled_target() {
		// With a large factor the shrink target exceeds the current capacity.
		let policy = GrowthPolicy::new(10.0, 0.5).unwrap();
		let mut vec = PolicyVec::<u8>::with_policy_in(10, Global, policy).unwrap();
		vec.insert_many(0, &[1, 2, 3, 4, 5]).unwrap();
		assert_eq!(vec.capacity(), 10);
		vec.pop().unwrap();
		assert_eq!(vec.capacity(), 40);
		assert_eq!(vec.as_slice(), &[1, 2, 3, 4]);
	}

	#[test]
	fn resize_shrink_uses_scaled_length() {
		let policy = GrowthPolicy::new(4.0, 0.5).unwrap();
		let mut vec = PolicyVec::<u8>::with_policy_in(10, Global, policy).unwrap();
		vec.resize(4, 0).unwrap();
		assert_eq!(vec.len(), 4);
		assert_eq!(vec.capacity(), 16);
	}

	#[test]
	fn clear_shrinks_to_floor() {
		let mut vec = PolicyVec::<u32>::with_capacity(16).unwrap();
		vec.insert_many(0, &[1, 2, 3]).unwrap();
		vec.clear().unwrap();
		assert_eq!(vec.len(), 0);
		assert_eq!(vec.capacity(), 1);
	}

	#[test]
	fn resize_fills_and_truncates() {
		let mut vec = PolicyVec::<u32>::new().unwrap();
		vec.resize(5, 9).unwrap();
		assert_eq!(vec.as_slice(), &[9; 5]);
		assert_eq!(vec.capacity(), 10);
		vec.resize(4, 0).unwrap();
		assert_eq!(vec.as_slice(), &[9; 4]);
		assert_eq!(vec.capacity(), 10);
		vec.resize(2, 0).unwrap();
		assert_eq!(vec.capacity(), 4);
	}

	#[test]
	fn resize_uninit_then_assign() {
		let mut vec = PolicyVec::<u32>::new().unwrap();
		unsafe { vec.resize_uninit(3).unwrap() };
		for i in 0..3 {
			vec.assign(i, i as u32).unwrap();
		}
		assert_eq!(vec.as_slice(), &[0, 1, 2]);
	}

	#[test]
	fn reserve_never_shrinks() {
		let mut vec = PolicyVec::<u32>::with_capacity(8).unwrap();
		vec.reserve(4).unwrap();
		assert_eq!(vec.capacity(), 8);
		vec.reserve(20).unwrap();
		assert_eq!(vec.capacity(), 20);
	}

	#[test]
	fn shrink_to_fit_keeps_floor() {
		let mut vec = PolicyVec::<u32>::with_capacity(8).unwrap();
		vec.push(1).unwrap();
		vec.push(2).unwrap();
		vec.shrink_to_fit().unwrap();
		assert_eq!(vec.capacity(), 2);
		vec.clear().unwrap();
		vec.shrink_to_fit().unwrap();
		assert_eq!(vec.capacity(), 1);
	}

	#[test]
	fn index_operators() {
		let mut vec = PolicyVec::<u32>::new().unwrap();
		vec.insert_many(0, &[1, 2]).unwrap();
		vec[1] = 5;
		assert_eq!(vec[0], 1);
		assert_eq!(vec[1], 5);
		assert_eq!(format!("{:?}", vec), "[1, 5]");
	}

	#[test]
	#[should_panic]
	fn index_out_of_bounds_panics() {
		let vec = PolicyVec::<u32>::new().unwrap();
		let _ = vec[0];
	}

	#[test]
	fn destroy_releases_storage() {
		let mut vec = PolicyVec::<u32>::with_capacity(8).unwrap();
		vec.push(1).unwrap();
		vec.destroy().unwrap();
	}
}
