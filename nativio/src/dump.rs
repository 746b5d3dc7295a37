//! Hex dumps of raw traffic.

use std::fmt::Write;

const WIDTH: usize = 16;

/// Classic offset / hex / ASCII dump, sixteen bytes per line.
pub fn hexdump(bytes: &[u8]) -> String {
  let mut out = String::with_capacity(bytes.len().div_ceil(WIDTH) * 78);
  for (line, chunk) in bytes.chunks(WIDTH).enumerate() {
    let _ = write!(out, "{:08x} ", line * WIDTH);
    for i in 0..WIDTH {
      if i == WIDTH / 2 {
        out.push(' ');
      }
      match chunk.get(i) {
        Some(byte) => {
          let _ = write!(out, " {byte:02x}");
        }
        None => out.push_str("   "),
      }
    }
    out.push_str("  |");
    out.extend(chunk.iter().map(|&b| {
      if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' }
    }));
    out.push_str("|\n");
  }
  out
}

/// Emits `bytes` as a hex dump at trace level.
pub fn trace(label: &str, bytes: &[u8]) {
  if tracing::enabled!(tracing::Level::TRACE) {
    tracing::trace!(len = bytes.len(), "{label}\n{}", hexdump(bytes));
  }
}
