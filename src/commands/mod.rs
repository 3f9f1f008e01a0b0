//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `commonrepo` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `commonrepo` library.
//!
//! The repository, configuration and cache flags are shared through
//! [`RepoArgs`].

pub mod apply;
pub mod completions;
pub mod ls;
pub mod upstreams;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use commonrepo::config::{self, Config};
use commonrepo::defaults::{default_cache_root, DEFAULT_CONFIG_FILENAME};
use commonrepo::git::GitSource;
use commonrepo::suggestions;
use commonrepo::upstream::{self_locator, ChainResolver, Upstream};

/// Where the repository, its configuration and the clone cache live.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Path to the configuration file.
    ///
    /// Defaults to `.commonrepo.yaml` (or `.commonrepo.yml`) at the
    /// repository root. Can also be set with the `COMMONREPO_CONFIG`
    /// environment variable.
    #[arg(short, long, value_name = "FILE", env = "COMMONREPO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the repository working copy.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo: PathBuf,

    /// The root directory for shallow clones of remote upstreams.
    ///
    /// Defaults to the system cache directory (`~/.cache/commonrepo` on Linux,
    /// `~/Library/Caches/commonrepo` on macOS).
    /// Can also be set with the `COMMONREPO_CACHE` environment variable.
    #[arg(long, value_name = "DIR", env = "COMMONREPO_CACHE")]
    pub cache_root: Option<PathBuf>,
}

impl RepoArgs {
    pub fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(path) => path.clone(),
            None => config::find_in(&self.repo)
                .unwrap_or_else(|| self.repo.join(DEFAULT_CONFIG_FILENAME)),
        }
    }

    /// Load and validate the repository's configuration.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        if !path.is_file() {
            return Err(suggestions::config_not_found(&path));
        }
        let config = config::from_file(&path).map_err(suggestions::explain)?;
        config.validate().map_err(suggestions::explain)?;
        Ok(config)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_root.clone().unwrap_or_else(default_cache_root)
    }

    pub fn source(&self) -> GitSource {
        GitSource::new(&self.repo, self.cache_root())
    }

    /// Resolve the upstream chain rooted at this repository.
    pub fn chain(&self, source: &GitSource, config: &Config) -> Result<Vec<Upstream>> {
        ChainResolver::new(source)
            .resolve(&self_locator(&self.repo), config)
            .map_err(suggestions::explain)
    }
}

/// Format file permissions in Unix-style (e.g., "rw-r--r--")
pub fn format_permissions(mode: u32) -> String {
    const BITS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    BITS.iter().map(|&(bit, c)| if mode & bit != 0 { c } else { '-' }).collect()
}

/// Format file size in human-readable format
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.1}G", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.1}M", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1}K", size as f64 / KB as f64)
    } else {
        format!("{}B", size)
    }
}
