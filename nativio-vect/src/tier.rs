//! Instruction-set tiers and the process-wide detection cache.

use std::{
  fmt,
  sync::atomic::{AtomicU8, Ordering},
};

/// Ordered classification of the vector instructions a CPU supports.
///
/// The ordering is meaningful: a CPU that supports a tier supports every
/// lower tier as well, so `detected >= wanted` is the compatibility check.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstructionSet {
  /// Plain scalar code.
  Vanilla = 0,
  Sse2 = 1,
  Sse41 = 2,
  Avx2 = 3,
  /// AVX-512 F, DQ, BW and VL.
  Avx512 = 4,
}

const UNKNOWN: u8 = u8::MAX;

static DETECTED: AtomicU8 = AtomicU8::new(UNKNOWN);

impl InstructionSet {
  /// Every tier, lowest first.
  pub const ALL: [InstructionSet; 5] = [
    InstructionSet::Vanilla,
    InstructionSet::Sse2,
    InstructionSet::Sse41,
    InstructionSet::Avx2,
    InstructionSet::Avx512,
  ];

  /// Returns the highest tier supported by the running CPU.
  ///
  /// The first call probes the CPU and publishes the result; later calls
  /// are a single atomic load. Two threads racing on the first call both
  /// probe, and both store the same value.
  pub fn detect() -> InstructionSet {
    match Self::from_u8(DETECTED.load(Ordering::Acquire)) {
      Some(tier) => tier,
      None => {
        let tier = Self::probe();
        DETECTED.store(tier as u8, Ordering::Release);
        tracing::debug!(tier = %tier, "instruction set detected");
        tier
      }
    }
  }

  /// Probes the CPU without consulting the cache.
  #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
  pub fn probe() -> InstructionSet {
    if is_x86_feature_detected!("avx512f")
      && is_x86_feature_detected!("avx512dq")
      && is_x86_feature_detected!("avx512bw")
      && is_x86_feature_detected!("avx512vl")
    {
      InstructionSet::Avx512
    } else if is_x86_feature_detected!("avx2") {
      InstructionSet::Avx2
    } else if is_x86_feature_detected!("sse4.1") {
      InstructionSet::Sse41
    } else if is_x86_feature_detected!("sse2") {
      InstructionSet::Sse2
    } else {
      InstructionSet::Vanilla
    }
  }

  /// Probes the CPU without consulting the cache.
  ///
  /// Non-x86 targets only have the vanilla kernels.
  #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
  pub fn probe() -> InstructionSet {
    InstructionSet::Vanilla
  }

  /// Whether code compiled for `self` may run on this CPU.
  pub fn is_supported(self) -> bool {
    self <= Self::detect()
  }

  pub const fn from_u8(value: u8) -> Option<InstructionSet> {
    match value {
      0 => Some(InstructionSet::Vanilla),
      1 => Some(InstructionSet::Sse2),
      2 => Some(InstructionSet::Sse41),
      3 => Some(InstructionSet::Avx2),
      4 => Some(InstructionSet::Avx512),
      _ => None,
    }
  }

  pub const fn name(self) -> &'static str {
    match self {
      InstructionSet::Vanilla => "vanilla",
      InstructionSet::Sse2 => "sse2",
      InstructionSet::Sse41 => "sse4.1",
      InstructionSet::Avx2 => "avx2",
      InstructionSet::Avx512 => "avx512",
    }
  }
}

impl fmt::Display for InstructionSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
