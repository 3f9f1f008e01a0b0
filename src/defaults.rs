//! Default values for commonrepo configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// The configuration file name written by `commonrepo` and looked up first.
pub const DEFAULT_CONFIG_FILENAME: &str = ".commonrepo.yaml";

/// Every accepted configuration file name, in lookup order.
pub const CONFIG_FILENAMES: [&str; 2] = [DEFAULT_CONFIG_FILENAME, ".commonrepo.yml"];

/// Glob matching any configuration file name at the repository root.
pub const CONFIG_FILE_GLOB: &str = ".commonrepo.{yaml,yml}";

/// Returns the default cache root directory for shallow clones of remote
/// upstreams.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/commonrepo` (XDG Base Directory)
/// - macOS: `~/Library/Caches/commonrepo`
/// - Windows: `{FOLDERID_LocalAppData}\commonrepo`
///
/// Falls back to `.commonrepo-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--cache-root` CLI flag or the
/// `COMMONREPO_CACHE` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".commonrepo-cache")).join("commonrepo")
}
