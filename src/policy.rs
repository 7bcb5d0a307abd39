//! Growth and shrink policy.
use crate::Error;

/// Smallest capacity an allocated buffer may have.
pub const MIN_CAPACITY: usize = 1;

/// Parameters deciding when and how much a vector reallocates.
///
/// The same target formula is used for growing and shrinking:
/// `max(1, ceil(desired * growth_factor))`.
/// Shrinking to a target with headroom (rather than to an exact fit)
/// keeps a push/pop sequence around the threshold from reallocating
/// on every call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowthPolicy {
	growth_factor: f32,
	shrink_threshold: f32
}

impl GrowthPolicy {
	/// Default growth factor.
	pub const DEFAULT_GROWTH_FACTOR: f32 = 2.0;

	/// Default shrink threshold.
	pub const DEFAULT_SHRINK_THRESHOLD: f32 = 0.25;

	/// Creates a new policy.
	///
	/// A growth factor of `1.0` disables over-allocation and a shrink threshold of
	/// `0.0` disables shrinking.
	///
	/// Returns [`Error::InvalidArgument`] if `growth_factor` is smaller than `1.0` (or is not finite),
	/// or if `shrink_threshold` is not in `[0.0, 1.0]`.
	///
	/// # Example
	/// ```
	/// # use policy_vec::GrowthPolicy;
	/// assert!(GrowthPolicy::new(1.5, 0.1).is_ok());
	/// assert!(GrowthPolicy::new(0.5, 0.1).is_err());
	/// assert!(GrowthPolicy::new(1.5, 1.1).is_err());
	/// ```
	pub fn new(growth_factor: f32, shrink_threshold: f32) -> Result<Self, Error> {
		if !growth_factor.is_finite() || growth_factor < 1.0 {
			return Err(Error::invalid("growth factor must be a finite number >= 1.0"))
		}

		if !(0.0..=1.0).contains(&shrink_threshold) {
			return Err(Error::invalid("shrink threshold must be within [0.0, 1.0]"))
		}

		Ok(GrowthPolicy {
			growth_factor,
			shrink_threshold
		})
	}

	/// Policy of fixed buffers: exact fit, never shrink.
	#[inline]
	pub const fn fixed() -> Self {
		GrowthPolicy {
			growth_factor: 1.0,
			shrink_threshold: 0.0
		}
	}

	#[inline]
	pub fn growth_factor(&self) -> f32 {
		self.growth_factor
	}

	#[inline]
	pub fn shrink_threshold(&self) -> f32 {
		self.shrink_threshold
	}

	/// Checks if a buffer of `capacity` records must grow to hold `desired` records.
	#[inline]
	pub fn should_grow(&self, desired: usize, capacity: usize) -> bool {
		desired > capacity
	}

	/// Checks if a buffer of `capacity` records is eligible to shrink
	/// once it holds `desired` records.
	#[inline]
	pub fn should_shrink(&self, desired: usize, capacity: usize) -> bool {
		self.shrink_threshold > 0.0 && (desired as f64) < capacity as f64 * self.shrink_threshold as f64
	}

	/// Capacity to reallocate to when `desired` records must fit.
	///
	/// Saturates at `usize::MAX`, leaving overflow detection to the allocator.
	#[inline]
	pub fn target(&self, desired: usize) -> usize {
		MIN_CAPACITY.max(self.scaled(desired))
	}

	/// `ceil(desired * growth_factor)` without the capacity floor.
	///
	/// Never less than `desired`, even where `f64` loses precision.
	#[inline]
	pub(crate) fn scaled(&self, desired: usize) -> usize {
		// float to int `as` casts saturate.
		let scaled = (desired as f64 * self.growth_factor as f64).ceil() as usize;
		scaled.max(desired)
	}
}

impl Default for GrowthPolicy {
	fn default() -> Self {
		GrowthPolicy {
			growth_factor: Self::DEFAULT_GROWTH_FACTOR,
			shrink_threshold: Self::DEFAULT_SHRINK_THRESHOLD
		}
	}
}
