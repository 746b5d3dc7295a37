/// Calls a libc function and turns the `-1` failure convention into
/// `io::Result`, reading `errno` right away.
macro_rules! syscall {
  ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
      #[allow(unused_unsafe)]
      let res = unsafe { libc::$fn($($arg, )*) };
      if res == -1 {
          Err(std::io::Error::last_os_error())
      } else {
          Ok(res)
      }
  }};
}

/// `setsockopt` for a plain value, sized from its type.
macro_rules! setsockopt {
  ($fd:expr, $level:expr, $name:expr, $value:expr $(,)?) => {{
    let value = $value;
    syscall!(setsockopt(
      $fd,
      $level,
      $name,
      std::ptr::from_ref(&value).cast::<libc::c_void>(),
      std::mem::size_of_val(&value) as libc::socklen_t
    ))
    .map(|_| ())
  }};
}

/// `getsockopt` into a zeroed value of type `$ty`.
macro_rules! getsockopt {
  ($fd:expr, $level:expr, $name:expr, $ty:ty $(,)?) => {{
    // SAFETY: only used with plain C integer and struct option types.
    let mut value: $ty = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<$ty>() as libc::socklen_t;
    syscall!(getsockopt(
      $fd,
      $level,
      $name,
      (&mut value as *mut $ty).cast::<libc::c_void>(),
      &mut len
    ))
    .map(|_| value)
  }};
}
