//! # nativio-vect
//!
//! `f64` vector reductions dispatched, once per process, to the widest
//! instruction set the CPU supports.
//!
//! Each registered kernel has five implementations (vanilla, SSE2, SSE4.1,
//! AVX2, AVX-512) behind one atomic function-pointer slot. The first call
//! through the slot runs a trampoline that detects the CPU tier and rewires
//! the slot; later calls jump straight to the chosen implementation.
//!
//! ```
//! let values = [1.0, 2.0, f64::NAN, 4.0];
//! assert_eq!(nativio_vect::SUM_DOUBLE.call(&values), 7.0);
//! assert_eq!(nativio_vect::MAX_DOUBLE.call(&values), 4.0);
//! ```
//!
//! ## Nulls
//!
//! NaN marks a null. Reductions skip nulls; a slice with no non-null value
//! (including the empty slice) reduces to NaN.
//!
//! ## Floating point
//!
//! Implementations keep a different number of partial sums, so the summing
//! kernels group additions differently per tier. Results agree within
//! rounding, not bit for bit. `MIN_DOUBLE` and `MAX_DOUBLE` are exact on
//! every tier.

#[macro_use]
mod kernel;
mod reduce;
mod tier;
mod tiers;

pub use kernel::{Kernel, KernelFn, Variants};
pub use tier::InstructionSet;

dispatched! {
  /// Sum of the non-null values.
  pub static SUM_DOUBLE = tiers::variants!(sum);
}

dispatched! {
  /// Kahan-compensated sum of the non-null values.
  pub static SUM_DOUBLE_KAHAN = tiers::variants!(sum_kahan);
}

dispatched! {
  /// Neumaier-compensated sum of the non-null values.
  pub static SUM_DOUBLE_NEUMAIER = tiers::variants!(sum_neumaier);
}

dispatched! {
  /// Mean of the non-null values.
  pub static AVG_DOUBLE = tiers::variants!(avg);
}

dispatched! {
  /// Smallest non-null value.
  pub static MIN_DOUBLE = tiers::variants!(min);
}

dispatched! {
  /// Largest non-null value.
  pub static MAX_DOUBLE = tiers::variants!(max);
}

static KERNELS: [&Kernel; 6] = [
  &SUM_DOUBLE,
  &SUM_DOUBLE_KAHAN,
  &SUM_DOUBLE_NEUMAIER,
  &AVG_DOUBLE,
  &MIN_DOUBLE,
  &MAX_DOUBLE,
];

/// Every registered kernel.
pub fn kernels() -> &'static [&'static Kernel] {
  &KERNELS
}

/// Binds every registered kernel up front and returns the tier used.
///
/// Optional: kernels bind themselves on first use. Calling this at startup
/// moves the detection cost out of the first query.
pub fn bind_all() -> InstructionSet {
  let tier = InstructionSet::detect();
  for kernel in kernels() {
    if kernel.bound().is_none() {
      kernel.rebind(tier);
    }
  }
  tracing::info!(tier = %tier, kernels = KERNELS.len(), "vector kernels bound");
  tier
}
