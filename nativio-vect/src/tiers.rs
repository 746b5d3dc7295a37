//! Per-tier instantiations of the reduction bodies.
//!
//! Each tier gets the lane-wise body compiled with `#[target_feature]`, and
//! a safe wrapper with the plain [`KernelFn`](crate::KernelFn) signature.
//! The wrappers assume the CPU supports the tier; only [`Kernel`] hands them
//! out, and it clamps every request to the detected tier.
//!
//! Lane counts are two registers' worth per tier: SSE2 and SSE4.1 use two
//! and four `f64` lanes, AVX2 eight, AVX-512 sixteen.

macro_rules! tiered {
  ($($kernel:ident => $body:ident),* $(,)?) => {
    $(
      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      pastey::paste! {
        #[target_feature(enable = "sse2")]
        unsafe fn [<$kernel _sse2_impl>](values: &[f64]) -> f64 {
          crate::reduce::$body::<2>(values)
        }

        #[target_feature(enable = "sse4.1")]
        unsafe fn [<$kernel _sse41_impl>](values: &[f64]) -> f64 {
          crate::reduce::$body::<4>(values)
        }

        #[target_feature(enable = "avx2")]
        unsafe fn [<$kernel _avx2_impl>](values: &[f64]) -> f64 {
          crate::reduce::$body::<8>(values)
        }

        #[target_feature(enable = "avx512f,avx512dq,avx512bw,avx512vl")]
        unsafe fn [<$kernel _avx512_impl>](values: &[f64]) -> f64 {
          crate::reduce::$body::<16>(values)
        }

        pub(crate) fn [<$kernel _sse2>](values: &[f64]) -> f64 {
          // SAFETY: installed only when SSE2 was detected.
          unsafe { [<$kernel _sse2_impl>](values) }
        }

        pub(crate) fn [<$kernel _sse41>](values: &[f64]) -> f64 {
          // SAFETY: installed only when SSE4.1 was detected.
          unsafe { [<$kernel _sse41_impl>](values) }
        }

        pub(crate) fn [<$kernel _avx2>](values: &[f64]) -> f64 {
          // SAFETY: installed only when AVX2 was detected.
          unsafe { [<$kernel _avx2_impl>](values) }
        }

        pub(crate) fn [<$kernel _avx512>](values: &[f64]) -> f64 {
          // SAFETY: installed only when AVX-512 was detected.
          unsafe { [<$kernel _avx512_impl>](values) }
        }
      }

      #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
      pastey::paste! {
        pub(crate) use crate::reduce::[<vanilla_ $kernel>] as [<$kernel _sse2>];
        pub(crate) use crate::reduce::[<vanilla_ $kernel>] as [<$kernel _sse41>];
        pub(crate) use crate::reduce::[<vanilla_ $kernel>] as [<$kernel _avx2>];
        pub(crate) use crate::reduce::[<vanilla_ $kernel>] as [<$kernel _avx512>];
      }
    )*
  };
}

tiered! {
  sum => lanes_sum,
  sum_kahan => lanes_sum_kahan,
  sum_neumaier => lanes_sum_neumaier,
  avg => lanes_avg,
  min => lanes_min,
  max => lanes_max,
}

/// Builds the [`Variants`](crate::Variants) table for one reduction.
macro_rules! variants {
  ($kernel:ident) => {
    pastey::paste! {
      $crate::Variants {
        vanilla: $crate::reduce::[<vanilla_ $kernel>],
        sse2: $crate::tiers::[<$kernel _sse2>],
        sse41: $crate::tiers::[<$kernel _sse41>],
        avx2: $crate::tiers::[<$kernel _avx2>],
        avx512: $crate::tiers::[<$kernel _avx512>],
      }
    }
  };
}

pub(crate) use variants;
