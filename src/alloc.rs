//! Allocation strategies.
//!
//! A [`PolicyVec`](crate::PolicyVec) never talks to the global allocator directly.
//! Every allocation goes through an [`Allocator`] given at construction,
//! which receives the layout of a single record and a record count rather than
//! a byte size. [`Global`] forwards to [`std::alloc`].
use core::{
	alloc::Layout,
	ptr::NonNull
};
use std::alloc;
use thiserror::Error;

/// Error returned by an [`Allocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
	/// The byte size of the requested block does not fit in `isize`.
	#[error("capacity overflow")]
	CapacityOverflow,

	/// The allocator could not provide a block with the given layout.
	#[error("memory allocation of {} bytes failed", .layout.size())]
	OutOfMemory {
		/// Layout of the whole block that was requested.
		layout: Layout
	}
}

/// Computes the layout of a block holding `capacity` records of layout `record`.
///
/// Returns [`AllocError::CapacityOverflow`] if the size overflows.
#[inline]
pub fn array_layout(record: Layout, capacity: usize) -> Result<Layout, AllocError> {
	let size = record.size().checked_mul(capacity).ok_or(AllocError::CapacityOverflow)?;
	Layout::from_size_align(size, record.align()).map_err(|_| AllocError::CapacityOverflow)
}

/// A memory allocation strategy for record buffers.
///
/// ## Safety
///
/// Blocks returned by `allocate` and `reallocate` must be valid for reads and
/// writes of `record.size() * capacity` bytes, aligned to `record.align()`,
/// and must remain valid until passed to `reallocate` or `deallocate`.
pub unsafe trait Allocator {
	/// Allocates a block able to hold `capacity` records.
	fn allocate(&self, record: Layout, capacity: usize) -> Result<NonNull<u8>, AllocError>;

	/// Resizes a block from `old_capacity` to `new_capacity` records.
	///
	/// The first `min(old_capacity, new_capacity)` records are preserved.
	/// On failure the old block is left untouched and still owned by the caller.
	///
	/// ## Safety
	///
	/// `ptr` must denote a block currently allocated by this allocator
	/// with `record` and `old_capacity`.
	unsafe fn reallocate(
		&self,
		ptr: NonNull<u8>,
		record: Layout,
		old_capacity: usize,
		new_capacity: usize
	) -> Result<NonNull<u8>, AllocError>;

	/// Releases a block.
	///
	/// ## Safety
	///
	/// `ptr` must denote a block currently allocated by this allocator
	/// with `record` and `capacity`.
	unsafe fn deallocate(&self, ptr: NonNull<u8>, record: Layout, capacity: usize) -> Result<(), AllocError>;
}

unsafe impl<'r, A: Allocator + ?Sized> Allocator for &'r A {
	#[inline]
	fn allocate(&self, record: Layout, capacity: usize) -> Result<NonNull<u8>, AllocError> {
		(**self).allocate(record, capacity)
	}

	#[inline]
	unsafe fn reallocate(
		&self,
		ptr: NonNull<u8>,
		record: Layout,
		old_capacity: usize,
		new_capacity: usize
	) -> Result<NonNull<u8>, AllocError> {
		(**self).reallocate(ptr, record, old_capacity, new_capacity)
	}

	#[inline]
	unsafe fn deallocate(&self, ptr: NonNull<u8>, record: Layout, capacity: usize) -> Result<(), AllocError> {
		(**self).deallocate(ptr, record, capacity)
	}
}

/// The default allocator, backed by [`std::alloc`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

/// Dangling but well aligned pointer used for zero-sized blocks.
#[inline]
fn dangling(layout: Layout) -> NonNull<u8> {
	// `align` is never zero.
	unsafe { NonNull::new_unchecked(layout.align() as *mut u8) }
}

unsafe impl Allocator for Global {
	fn allocate(&self, record: Layout, capacity: usize) -> Result<NonNull<u8>, AllocError> {
		let layout = array_layout(record, capacity)?;
		if layout.size() == 0 {
			return Ok(dangling(layout))
		}

		// SAFETY: `layout` has a non-zero size.
		let ptr = unsafe { alloc::alloc(layout) };
		NonNull::new(ptr).ok_or(AllocError::OutOfMemory { layout })
	}

	unsafe fn reallocate(
		&self,
		ptr: NonNull<u8>,
		record: Layout,
		old_capacity: usize,
		new_capacity: usize
	) -> Result<NonNull<u8>, AllocError> {
		let old_layout = array_layout(record, old_capacity)?;
		let new_layout = array_layout(record, new_capacity)?;

		if old_layout.size() == 0 {
			return self.allocate(record, new_capacity)
		}

		if new_layout.size() == 0 {
			alloc::dealloc(ptr.as_ptr(), old_layout);
			return Ok(dangling(new_layout))
		}

		let new_ptr = alloc::realloc(ptr.as_ptr(), old_layout, new_layout.size());
		NonNull::new(new_ptr).ok_or(AllocError::OutOfMemory { layout: new_layout })
	}

	unsafe fn deallocate(&self, ptr: NonNull<u8>, record: Layout, capacity: usize) -> Result<(), AllocError> {
		let layout = array_layout(record, capacity)?;
		if layout.size() != 0 {
			alloc::dealloc(ptr.as_ptr(), layout)
		}

		Ok(())
	}
}
