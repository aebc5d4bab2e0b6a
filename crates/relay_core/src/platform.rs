/// Single-character platform tag carried in the packet suffix.
pub fn os_code() -> char {
    os_code_for(std::env::consts::OS)
}

pub fn os_code_for(os: &str) -> char {
    match os {
        "macos" | "ios" => 'm',
        "linux" | "android" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" | "solaris"
        | "illumos" | "aix" | "haiku" => 'x',
        "windows" => 'w',
        _ => '?',
    }
}
