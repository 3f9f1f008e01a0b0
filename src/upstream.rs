//! # Upstream Chain Resolution
//!
//! Turns a root configuration into the ordered, version-pinned list of
//! configuration sources the pipeline runs against.
//!
//! ## Process
//!
//! 1.  **Self first**: position 0 is always the resolving repository, with
//!     its own locator (`./` for the current directory) and the ref it has
//!     checked out. A working copy with no commits yields an empty ref.
//!
//! 2.  **Declared upstreams**: each entry of the root configuration's
//!     `upstream` list follows, in declaration order. A pinned `ref` is used
//!     as is; otherwise the upstream source is asked for its default
//!     version.
//!
//! 3.  **Depth-first descent**: when an upstream's own configuration is
//!     readable, its declared upstreams are resolved immediately after it,
//!     before the next sibling.
//!
//! 4.  **Cycle detection**: every locator admitted to the chain is recorded
//!     by identity; meeting one again fails with `CyclicUpstream`. The
//!     record spans the whole chain, not just the current path, so a
//!     diamond (two upstreams sharing an upstream of their own) is reported
//!     the same way. The error shows the path that revisited the locator.
//!
//! Resolution goes through the [`UpstreamSource`] trait so the chain logic
//! can be exercised without git. [`crate::git::GitSource`] is the real
//! implementation and [`MemorySource`] the in-memory one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::config::{self, Config, RenameSpec};
use crate::error::{Error, Result};
use crate::git::GitSource;
use crate::view::{FileView, MemoryView};

/// One resolved entry of the upstream chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upstream {
    /// Local path or remote URL, as declared.
    pub locator: String,
    /// Concrete version; empty means the repository default.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Index in the chain, 0 being the resolving repository.
    pub position: usize,
    /// Nesting level: 0 for self, 1 for upstreams declared by the root
    /// configuration, and so on.
    pub depth: usize,
    /// Rename rules the declaring configuration attached to this upstream.
    #[serde(skip)]
    pub rename: Vec<RenameSpec>,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.locator, self.reference)
    }
}

/// Capability the chain resolver and the composer need from the git layer.
pub trait UpstreamSource: Send + Sync {
    /// A key that is equal for two locators naming the same source.
    fn identity(&self, locator: &str) -> String;

    /// The ref a local repository currently has checked out.
    fn current_ref(&self, locator: &str) -> Result<String>;

    /// The version to use for an upstream declared without a pin.
    fn default_ref(&self, locator: &str) -> Result<String>;

    /// The upstream's own configuration, if it has one.
    fn load_config(&self, locator: &str, reference: &str) -> Result<Option<Config>>;

    /// A file view over the upstream's files at `reference`.
    fn open_view(&self, locator: &str, reference: &str) -> Result<Box<dyn FileView>>;
}

/// Resolves upstream chains against an [`UpstreamSource`].
pub struct ChainResolver<'a, S: UpstreamSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: UpstreamSource + ?Sized> ChainResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolve the chain rooted at the repository `self_locator`, whose
    /// configuration is `config`.
    pub fn resolve(&self, self_locator: &str, config: &Config) -> Result<Vec<Upstream>> {
        let reference = self.source.current_ref(self_locator)?;
        let root = Upstream {
            locator: self_locator.to_string(),
            reference,
            position: 0,
            depth: 0,
            rename: Vec::new(),
        };
        debug!("chain root {}", root);

        let mut seen = HashSet::new();
        seen.insert(self.source.identity(self_locator));
        let mut ancestors = vec![self_locator.to_string()];
        let mut chain = vec![root];

        self.descend(config, 1, &mut chain, &mut seen, &mut ancestors)?;
        Ok(chain)
    }

    fn descend(
        &self,
        config: &Config,
        depth: usize,
        chain: &mut Vec<Upstream>,
        seen: &mut HashSet<String>,
        ancestors: &mut Vec<String>,
    ) -> Result<()> {
        for spec in &config.upstream {
            let identity = self.source.identity(&spec.url);
            if !seen.insert(identity) {
                let mut cycle = ancestors.clone();
                cycle.push(spec.url.clone());
                return Err(Error::CyclicUpstream {
                    cycle: cycle.join(" -> "),
                });
            }

            let reference = match &spec.reference {
                Some(pinned) => pinned.clone(),
                None => self.source.default_ref(&spec.url)?,
            };

            let upstream = Upstream {
                locator: spec.url.clone(),
                reference,
                position: chain.len(),
                depth,
                rename: spec.rename.clone(),
            };
            debug!("chain[{}] {} (depth {})", upstream.position, upstream, depth);

            let nested = self.source.load_config(&upstream.locator, &upstream.reference)?;
            chain.push(upstream);

            if let Some(nested) = nested {
                ancestors.push(spec.url.clone());
                self.descend(&nested, depth + 1, chain, seen, ancestors)?;
                ancestors.pop();
            }
        }
        Ok(())
    }
}

/// The locator a repository root is known by in its own chain: the path
/// with a trailing `/`, so `.` becomes `./`.
pub fn self_locator(root: &Path) -> String {
    let display = root.display().to_string();
    let trimmed = display.trim_end_matches('/');
    format!("{}/", trimmed)
}

/// Resolve the upstream chain for the repository at `repo_root`, configured
/// by the file at `config_path`, using git and the cache at `cache_root`.
pub fn upstreams(repo_root: &Path, config_path: &Path, cache_root: &Path) -> Result<Vec<Upstream>> {
    let config = config::from_file(config_path)?;
    let source = GitSource::new(repo_root, cache_root);
    ChainResolver::new(&source).resolve(&self_locator(repo_root), &config)
}

#[derive(Debug, Clone)]
struct MemoryRepo {
    reference: String,
    config: Option<Config>,
    view: MemoryView,
}

/// In-memory [`UpstreamSource`]: a fixed table of repositories keyed by
/// locator.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    repos: HashMap<String, MemoryRepo>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository. `reference` is what it reports as both its
    /// current and its default ref.
    pub fn with_repo(
        mut self,
        locator: &str,
        reference: &str,
        config: Option<Config>,
        view: MemoryView,
    ) -> Self {
        let key = self.identity(locator);
        self.repos.insert(
            key,
            MemoryRepo {
                reference: reference.to_string(),
                config,
                view,
            },
        );
        self
    }

    fn repo(&self, locator: &str) -> Result<&MemoryRepo> {
        self.repos
            .get(&self.identity(locator))
            .ok_or_else(|| Error::UpstreamNotFound {
                locator: locator.to_string(),
                message: "repository not found".to_string(),
            })
    }
}

impl UpstreamSource for MemorySource {
    fn identity(&self, locator: &str) -> String {
        let trimmed = locator.trim_end_matches('/');
        trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
    }

    fn current_ref(&self, locator: &str) -> Result<String> {
        Ok(self.repo(locator)?.reference.clone())
    }

    fn default_ref(&self, locator: &str) -> Result<String> {
        self.current_ref(locator)
    }

    fn load_config(&self, locator: &str, _reference: &str) -> Result<Option<Config>> {
        Ok(self.repo(locator)?.config.clone())
    }

    fn open_view(&self, locator: &str, _reference: &str) -> Result<Box<dyn FileView>> {
        Ok(Box::new(self.repo(locator)?.view.clone()))
    }
}
