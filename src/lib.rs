//! This crate provides the [`PolicyVec`] data structure,
//! a contiguous growable array whose memory management is entirely
//! in the hands of the user.
//!
//! - Memory is obtained from a user-provided [`Allocator`]
//!   (by default [`Global`], which wraps [`std::alloc`]),
//!   or from a fixed buffer lent by the caller.
//! - When and how much the buffer grows or shrinks is decided by a [`GrowthPolicy`]:
//!   a growth factor applied to the needed capacity,
//!   and a shrink threshold under which the buffer is considered too sparse.
//! - Nothing panics or aborts on allocation failure: every operation returns a [`Result`].
//!
//! ## Basic usage
//!
//! ```rust
//! use policy_vec::PolicyVec;
//!
//! let mut vec: PolicyVec<'_, u32> = PolicyVec::with_capacity(0)?; // capacity is at least 1.
//! for i in 0..4 {
//! 	vec.push(i)?;
//! }
//! assert_eq!(vec.capacity(), 4); // grown to `ceil(2 * 2.0)` on the second push.
//!
//! vec.remove_many(1, 2)?;
//! assert_eq!(*vec.get(1)?, 3);
//! # Ok::<(), policy_vec::Error>(())
//! ```
//!
//! ## Fixed buffers
//!
//! Where no allocator is available, a vector can work inside a buffer
//! owned by the caller. Its capacity is then fixed:
//! ```rust
//! # use policy_vec::{PolicyVec, Error};
//! # use core::mem::MaybeUninit;
//! let mut buffer = [MaybeUninit::<u16>::uninit(); 3];
//! let mut vec = PolicyVec::from_buffer(&mut buffer)?;
//! vec.insert_many(0, &[1, 2, 3])?;
//! assert_eq!(
//! 	vec.push(4),
//! 	Err(Error::InsufficientBufferSize { requested: 4, capacity: 3 })
//! );
//! # Ok::<(), policy_vec::Error>(())
//! ```
pub mod alloc;
mod error;
pub mod policy;
mod raw;
mod vector;

pub use crate::alloc::{
	AllocError,
	Allocator,
	Global
};
pub use crate::error::Error;
pub use crate::policy::GrowthPolicy;
pub use crate::vector::PolicyVec;
