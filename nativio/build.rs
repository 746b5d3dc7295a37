fn main() {
  cfg_aliases::cfg_aliases! {
      linux: { target_os = "linux" },
      apple: { target_vendor = "apple" },
      bsd: { any(target_os = "freebsd", target_os = "netbsd", target_os = "openbsd", target_os = "dragonfly") },
      mmsg: { any(target_os = "linux", target_os = "android") },
      nosignal: { any(target_os = "linux", target_os = "android") },
      cloexec: { any(target_os = "android", target_os = "dragonfly", target_os = "freebsd", target_os = "illumos", target_os = "linux", target_os = "netbsd", target_os = "openbsd") },
      nosigpipe: { any(target_vendor = "apple", target_os = "freebsd", target_os = "netbsd", target_os = "dragonfly") },
  }

  #[cfg(feature = "cheader")]
  {
    let bindings = cbindgen::generate(".").expect("cbindgen failed");

    std::fs::create_dir_all("./include").expect("cannot create include/");
    bindings.write_to_file("./include/nativio.h");
  }
}
