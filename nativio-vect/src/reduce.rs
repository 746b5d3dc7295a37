//! Reduction bodies.
//!
//! NaN is the null marker of the engine: every reduction skips it, and a
//! slice without a single non-NaN value reduces to NaN.
//!
//! The `vanilla_*` functions walk the slice once, left to right. The
//! `lanes_*` functions keep `L` independent accumulators so the compiler can
//! keep them in vector registers; they are instantiated per tier with the
//! lane count of that tier's registers. Different lane counts group the
//! additions differently, which is why tiers agree only within rounding.

#[inline(always)]
fn non_null(x: f64) -> (f64, u64) {
  if x.is_nan() { (0.0, 0) } else { (x, 1) }
}

#[inline(always)]
fn or_nan(value: f64, count: u64) -> f64 {
  if count == 0 { f64::NAN } else { value }
}

pub(crate) fn vanilla_sum(values: &[f64]) -> f64 {
  let mut sum = 0.0;
  let mut count = 0;
  for &x in values {
    let (x, seen) = non_null(x);
    sum += x;
    count += seen;
  }
  or_nan(sum, count)
}

pub(crate) fn vanilla_sum_kahan(values: &[f64]) -> f64 {
  let mut sum = 0.0;
  let mut c = 0.0;
  let mut count = 0;
  for &x in values {
    if x.is_nan() {
      continue;
    }
    let y = x - c;
    let t = sum + y;
    c = (t - sum) - y;
    sum = t;
    count += 1;
  }
  or_nan(sum, count)
}

pub(crate) fn vanilla_sum_neumaier(values: &[f64]) -> f64 {
  let mut sum = 0.0;
  let mut c = 0.0;
  let mut count = 0;
  for &x in values {
    if x.is_nan() {
      continue;
    }
    let t = sum + x;
    if f64::abs(sum) >= f64::abs(x) {
      c += (sum - t) + x;
    } else {
      c += (x - t) + sum;
    }
    sum = t;
    count += 1;
  }
  or_nan(sum + c, count)
}

pub(crate) fn vanilla_avg(values: &[f64]) -> f64 {
  let mut sum = 0.0;
  let mut count = 0u64;
  for &x in values {
    let (x, seen) = non_null(x);
    sum += x;
    count += seen;
  }
  or_nan(sum / count as f64, count)
}

pub(crate) fn vanilla_min(values: &[f64]) -> f64 {
  let mut min = f64::INFINITY;
  let mut count = 0;
  for &x in values {
    if x.is_nan() {
      continue;
    }
    if x < min {
      min = x;
    }
    count += 1;
  }
  or_nan(min, count)
}

pub(crate) fn vanilla_max(values: &[f64]) -> f64 {
  let mut max = f64::NEG_INFINITY;
  let mut count = 0;
  for &x in values {
    if x.is_nan() {
      continue;
    }
    if x > max {
      max = x;
    }
    count += 1;
  }
  or_nan(max, count)
}

/// Lane-wise sum. Returns the raw total and the non-null count.
#[inline(always)]
fn lanes_total<const L: usize>(values: &[f64]) -> (f64, u64) {
  let mut acc = [0.0f64; L];
  let mut seen = [0u64; L];

  let mut chunks = values.chunks_exact(L);
  for chunk in &mut chunks {
    for lane in 0..L {
      let (x, s) = non_null(chunk[lane]);
      acc[lane] += x;
      seen[lane] += s;
    }
  }

  let mut total = 0.0;
  let mut count = 0;
  for lane in 0..L {
    total += acc[lane];
    count += seen[lane];
  }
  for &x in chunks.remainder() {
    let (x, s) = non_null(x);
    total += x;
    count += s;
  }
  (total, count)
}

#[inline(always)]
pub(crate) fn lanes_sum<const L: usize>(values: &[f64]) -> f64 {
  let (total, count) = lanes_total::<L>(values);
  or_nan(total, count)
}

#[inline(always)]
pub(crate) fn lanes_avg<const L: usize>(values: &[f64]) -> f64 {
  let (total, count) = lanes_total::<L>(values);
  or_nan(total / count as f64, count)
}

#[inline(always)]
pub(crate) fn lanes_sum_kahan<const L: usize>(values: &[f64]) -> f64 {
  let mut sum = [0.0f64; L];
  let mut c = [0.0f64; L];
  let mut seen = [0u64; L];

  let mut chunks = values.chunks_exact(L);
  for chunk in &mut chunks {
    for lane in 0..L {
      let (x, s) = non_null(chunk[lane]);
      let y = x - c[lane];
      let t = sum[lane] + y;
      c[lane] = (t - sum[lane]) - y;
      sum[lane] = t;
      seen[lane] += s;
    }
  }

  // Fold the lanes with the same compensation so the lane split does not
  // throw the correction away.
  let mut total = 0.0;
  let mut comp = 0.0;
  let mut count = 0;
  let mut add = |x: f64| {
    let y = x - comp;
    let t = total + y;
    comp = (t - total) - y;
    total = t;
  };
  for lane in 0..L {
    add(sum[lane]);
    add(-c[lane]);
    count += seen[lane];
  }
  for &x in chunks.remainder() {
    let (x, s) = non_null(x);
    add(x);
    count += s;
  }
  or_nan(total, count)
}

#[inline(always)]
pub(crate) fn lanes_sum_neumaier<const L: usize>(values: &[f64]) -> f64 {
  #[inline(always)]
  fn step(sum: &mut f64, c: &mut f64, x: f64) {
    let t = *sum + x;
    if f64::abs(*sum) >= f64::abs(x) {
      *c += (*sum - t) + x;
    } else {
      *c += (x - t) + *sum;
    }
    *sum = t;
  }

  let mut sum = [0.0f64; L];
  let mut c = [0.0f64; L];
  let mut seen = [0u64; L];

  let mut chunks = values.chunks_exact(L);
  for chunk in &mut chunks {
    for lane in 0..L {
      let (x, s) = non_null(chunk[lane]);
      step(&mut sum[lane], &mut c[lane], x);
      seen[lane] += s;
    }
  }

  let mut total = 0.0;
  let mut comp = 0.0;
  let mut count = 0;
  for lane in 0..L {
    step(&mut total, &mut comp, sum[lane]);
    comp += c[lane];
    count += seen[lane];
  }
  for &x in chunks.remainder() {
    let (x, s) = non_null(x);
    step(&mut total, &mut comp, x);
    count += s;
  }
  or_nan(total + comp, count)
}

#[inline(always)]
pub(crate) fn lanes_min<const L: usize>(values: &[f64]) -> f64 {
  let mut acc = [f64::INFINITY; L];
  let mut seen = [0u64; L];

  let mut chunks = values.chunks_exact(L);
  for chunk in &mut chunks {
    for lane in 0..L {
      let x = chunk[lane];
      // NaN compares false and is skipped.
      if x < acc[lane] {
        acc[lane] = x;
      }
      seen[lane] += !x.is_nan() as u64;
    }
  }

  let mut min = f64::INFINITY;
  let mut count = 0;
  for lane in 0..L {
    if acc[lane] < min {
      min = acc[lane];
    }
    count += seen[lane];
  }
  for &x in chunks.remainder() {
    if x < min {
      min = x;
    }
    count += !x.is_nan() as u64;
  }
  or_nan(min, count)
}

#[inline(always)]
pub(crate) fn lanes_max<const L: usize>(values: &[f64]) -> f64 {
  let mut acc = [f64::NEG_INFINITY; L];
  let mut seen = [0u64; L];

  let mut chunks = values.chunks_exact(L);
  for chunk in &mut chunks {
    for lane in 0..L {
      let x = chunk[lane];
      if x > acc[lane] {
        acc[lane] = x;
      }
      seen[lane] += !x.is_nan() as u64;
    }
  }

  let mut max = f64::NEG_INFINITY;
  let mut count = 0;
  for lane in 0..L {
    if acc[lane] > max {
      max = acc[lane];
    }
    count += seen[lane];
  }
  for &x in chunks.remainder() {
    if x > max {
      max = x;
    }
    count += !x.is_nan() as u64;
  }
  or_nan(max, count)
}
