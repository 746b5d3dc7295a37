//! Rebindable kernel slots.
//!
//! Every [`Kernel`] owns one function-pointer slot. The slot starts out
//! pointing at the kernel's trampoline; the first call through it detects
//! the instruction set, stores the best variant into the slot and forwards
//! the call. From then on [`Kernel::call`] is one atomic load and one
//! indirect call.
//!
//! No lock guards the first call. Threads racing on it each detect the same
//! tier and store the same pointer, so whichever store lands last changes
//! nothing. The slot is an [`AtomicPtr`], so a reader never sees half of a
//! pointer.

use std::{
  fmt, mem,
  sync::atomic::{AtomicPtr, AtomicU32, AtomicU8, Ordering},
};

use crate::InstructionSet;

/// Signature shared by every dispatched reduction.
pub type KernelFn = fn(&[f64]) -> f64;

/// The five interchangeable implementations of one kernel.
#[derive(Clone, Copy)]
pub struct Variants {
  pub vanilla: KernelFn,
  pub sse2: KernelFn,
  pub sse41: KernelFn,
  pub avx2: KernelFn,
  pub avx512: KernelFn,
}

impl Variants {
  /// Picks the implementation compiled for `tier`.
  ///
  /// The caller is responsible for `tier` being supported by the CPU.
  pub const fn for_tier(&self, tier: InstructionSet) -> KernelFn {
    match tier {
      InstructionSet::Vanilla => self.vanilla,
      InstructionSet::Sse2 => self.sse2,
      InstructionSet::Sse41 => self.sse41,
      InstructionSet::Avx2 => self.avx2,
      InstructionSet::Avx512 => self.avx512,
    }
  }
}

const UNBOUND: u8 = u8::MAX;

/// A dispatched reduction kernel.
///
/// Declare one with [`dispatched!`](crate::dispatched).
pub struct Kernel {
  name: &'static str,
  variants: Variants,
  trampoline: KernelFn,
  slot: AtomicPtr<()>,
  bound: AtomicU8,
  binds: AtomicU32,
}

impl Kernel {
  #[doc(hidden)]
  pub const fn new(
    name: &'static str,
    variants: Variants,
    trampoline: KernelFn,
  ) -> Kernel {
    Kernel {
      name,
      variants,
      trampoline,
      slot: AtomicPtr::new(trampoline as *mut ()),
      bound: AtomicU8::new(UNBOUND),
      binds: AtomicU32::new(0),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Runs the kernel through its slot.
  #[inline]
  pub fn call(&self, values: &[f64]) -> f64 {
    let ptr = self.slot.load(Ordering::Acquire);
    // SAFETY: the slot only ever holds `KernelFn` values cast to `*mut ()`,
    // either the trampoline or one of `variants`.
    let f = unsafe { mem::transmute::<*mut (), KernelFn>(ptr) };
    f(values)
  }

  /// Runs the implementation for `tier` directly, leaving the slot alone.
  ///
  /// Tiers above the detected one are clamped down to it.
  pub fn call_with(&self, tier: InstructionSet, values: &[f64]) -> f64 {
    let tier = tier.min(InstructionSet::detect());
    (self.variants.for_tier(tier))(values)
  }

  /// The trampoline body: detect, publish, forward.
  #[doc(hidden)]
  pub fn bind_and_call(&self, values: &[f64]) -> f64 {
    let f = self.publish(InstructionSet::detect());
    f(values)
  }

  /// Points the slot at the implementation for `tier`, clamped to what the
  /// CPU supports, and returns the tier that was installed.
  pub fn rebind(&self, tier: InstructionSet) -> InstructionSet {
    let tier = tier.min(InstructionSet::detect());
    self.publish(tier);
    tier
  }

  /// Re-arms the trampoline so the next call detects and binds again.
  pub fn reset(&self) {
    self.bound.store(UNBOUND, Ordering::Release);
    self.slot.store(self.trampoline as *mut (), Ordering::Release);
  }

  /// The tier currently installed, or `None` while the trampoline is armed.
  pub fn bound(&self) -> Option<InstructionSet> {
    InstructionSet::from_u8(self.bound.load(Ordering::Acquire))
  }

  /// How many times the slot has been written by binding.
  pub fn bind_count(&self) -> u32 {
    self.binds.load(Ordering::Relaxed)
  }

  fn publish(&self, tier: InstructionSet) -> KernelFn {
    let f = self.variants.for_tier(tier);
    self.bound.store(tier as u8, Ordering::Release);
    self.slot.store(f as *mut (), Ordering::Release);
    self.binds.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(kernel = self.name, tier = %tier, "kernel bound");
    f
  }
}

impl fmt::Debug for Kernel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Kernel")
      .field("name", &self.name)
      .field("bound", &self.bound())
      .finish()
  }
}

/// Declares a [`Kernel`] static together with its trampoline.
///
/// ```
/// use nativio_vect::{dispatched, InstructionSet, Variants};
///
/// fn total(values: &[f64]) -> f64 {
///   values.iter().sum()
/// }
///
/// dispatched! {
///   /// Plain total, same body on every tier.
///   static TOTAL = Variants {
///     vanilla: total,
///     sse2: total,
///     sse41: total,
///     avx2: total,
///     avx512: total,
///   };
/// }
///
/// assert_eq!(TOTAL.bound(), None);
/// assert_eq!(TOTAL.call(&[1.0, 2.0]), 3.0);
/// assert_eq!(TOTAL.bound(), Some(InstructionSet::detect()));
/// ```
#[macro_export]
macro_rules! dispatched {
  ($(#[$meta:meta])* $vis:vis static $name:ident = $variants:expr;) => {
    $(#[$meta])*
    $vis static $name: $crate::Kernel = {
      fn trampoline(values: &[f64]) -> f64 {
        $name.bind_and_call(values)
      }
      $crate::Kernel::new(stringify!($name), $variants, trampoline)
    };
  };
}
