//! Read configuration.

/// Environment variable that overrides [`ReadOptions::use_mmap`].
pub const MMAP_ENV_VAR: &str = "SCENECACHE_MMAP";

/// Options used when opening a file for reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Memory-map the file instead of using buffered reads.
    pub use_mmap: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_mmap: true }
    }
}

impl ReadOptions {
    /// Defaults, overridden by `SCENECACHE_MMAP` (`0`, `false`, `off` or `no`
    /// disable memory mapping).
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(value) = std::env::var(MMAP_ENV_VAR) {
            options.use_mmap = parse_flag(&value).unwrap_or(options.use_mmap);
        }
        options
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
