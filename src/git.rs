//! Git plumbing for the resolution engine.
//!
//! Everything here shells out to the system `git`, which automatically
//! picks up SSH keys, credential helpers, personal access tokens and any
//! other authentication configured in `~/.gitconfig`.
//!
//! - [`GitWorkTree`]: a [`FileView`] over the tracked files of a working copy.
//! - [`GitSource`]: the [`UpstreamSource`] used by the CLI. Local locators
//!   are read from their working copy; remote locators are shallow-cloned
//!   into the cache root on first use.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};
use semver::Version;
use url::Url;

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::upstream::UpstreamSource;
use crate::view::{read_on_disk, stat_on_disk, DirectoryView, FileStat, FileView};

/// Tracked files of a git working copy.
#[derive(Debug, Clone)]
pub struct GitWorkTree {
    root: PathBuf,
}

impl GitWorkTree {
    /// Open the working copy rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(".git").exists() {
            return Err(Error::not_found(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileView for GitWorkTree {
    fn list_paths(&self) -> Result<Vec<String>> {
        let locator = self.root.display().to_string();
        let stdout = run_git(Some(&self.root), &["ls-files", "-z"], &locator)?;
        Ok(stdout
            .split('\0')
            .filter(|p| !p.is_empty())
            // deleted-but-tracked files are not part of the view
            .filter(|p| self.root.join(p).is_file())
            .map(str::to_string)
            .collect())
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        stat_on_disk(&self.root, path)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        read_on_disk(&self.root, path)
    }
}

/// Open the best available view of a local directory: tracked files when it
/// is a git working copy, every file otherwise.
pub fn open_view(root: &Path) -> Box<dyn FileView> {
    match GitWorkTree::open(root) {
        Ok(tree) => Box::new(tree),
        Err(_) => Box::new(DirectoryView::new(root)),
    }
}

/// The commit checked out in `dir`, or an empty string when `dir` is not the
/// root of a working copy or has no commits yet.
pub fn current_ref(dir: &Path) -> String {
    let locator = dir.display().to_string();
    // never report the commit of an enclosing repository
    if !dir.join(".git").exists() {
        debug!("{} is not a working copy root", locator);
        return String::new();
    }
    match run_git(Some(dir), &["rev-parse", "HEAD"], &locator) {
        Ok(stdout) => stdout.trim().to_string(),
        Err(e) => {
            debug!("no checked-out ref for {}: {}", locator, e);
            String::new()
        }
    }
}

/// Whether `locator` names a repository to clone rather than a local path.
///
/// Any URL (`file://` included) and scp-style `user@host:path` locators
/// are cloned; everything else is a path.
pub fn is_remote(locator: &str) -> bool {
    if let Ok(url) = Url::parse(locator) {
        // Windows drive letters parse as one-letter schemes
        return url.scheme().len() > 1;
    }
    match locator.split_once(':') {
        Some((host, _)) => host.contains('@') && !host.contains('/'),
        None => false,
    }
}

/// The branch the remote's `HEAD` points at.
pub fn remote_head_branch(url: &str) -> Result<Option<String>> {
    let stdout = run_git(None, &["ls-remote", "--symref", url, "HEAD"], url)?;
    Ok(stdout.lines().find_map(|line| {
        // ref: refs/heads/main\tHEAD
        line.strip_prefix("ref: ")
            .and_then(|rest| rest.split('\t').next())
            .and_then(|r| r.strip_prefix("refs/heads/"))
            .map(str::to_string)
    }))
}

/// List all tags from a remote repository
pub fn list_tags(url: &str) -> Result<Vec<String>> {
    let stdout = run_git(None, &["ls-remote", "--tags", url], url)?;
    Ok(stdout
        .lines()
        .filter_map(|line| {
            // Git ls-remote output format: <hash>\t<ref>
            let (_, ref_name) = line.split_once('\t')?;
            let tag = ref_name.strip_prefix("refs/tags/")?;
            // Skip peeled annotated-tag entries
            if tag.ends_with("^{}") {
                None
            } else {
                Some(tag.to_string())
            }
        })
        .collect())
}

/// Parse a tag string into a semantic version
pub fn parse_semver_tag(tag: &str) -> Option<Version> {
    // Common tag formats: v1.0.0, 1.0.0
    let version_str = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(version_str).ok()
}

/// The tag with the highest semantic version, pre-releases included.
pub fn latest_semver_tag(tags: &[String]) -> Option<String> {
    tags.iter()
        .filter_map(|tag| parse_semver_tag(tag).map(|v| (v, tag)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag.clone())
}

/// Clone a repository at a specific ref using shallow clone
///
/// An empty `ref_name` clones the remote's default branch.
pub fn clone_shallow(url: &str, ref_name: &str, target_dir: &Path) -> Result<()> {
    // git won't clone into an existing non-empty dir
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let target = target_dir.to_string_lossy();
    let mut args = vec!["clone", "--depth=1"];
    if !ref_name.is_empty() {
        args.extend(["--branch", ref_name]);
    }
    args.push(url);
    args.push(&target);

    run_git(None, &args, url).map(|_| ())
}

/// Convert URL and ref to cache path
pub fn url_to_cache_path(cache_root: &Path, url: &str, ref_name: &str) -> PathBuf {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let url_hash = format!("{:x}", hasher.finish());

    let safe_ref = if ref_name.is_empty() {
        "default".to_string()
    } else {
        ref_name.replace('/', "-")
    };

    cache_root.join(format!("{}-{}", url_hash, safe_ref))
}

fn run_git(dir: Option<&Path>, args: &[&str], locator: &str) -> Result<String> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.arg("-C").arg(dir);
    }
    let output = command.args(args).output().map_err(|e| Error::GitCommand {
        command: args.join(" "),
        locator: locator.to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            format!(
                "{}\nMake sure you have access to the repository (ssh-agent key, \
                 credential helper or personal access token).",
                stderr.trim()
            )
        } else {
            stderr.trim().to_string()
        };
        return Err(Error::GitCommand {
            command: args.join(" "),
            locator: locator.to_string(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Where a local locator's files and config live.
struct LocalLocation {
    root: PathBuf,
    config: Option<PathBuf>,
}

/// [`UpstreamSource`] backed by the filesystem and the system `git`.
#[derive(Debug, Clone)]
pub struct GitSource {
    base_dir: PathBuf,
    cache_root: PathBuf,
}

impl GitSource {
    /// Local locators resolve against `base_dir` (the resolving repository's
    /// root); remote clones go under `cache_root`.
    pub fn new(base_dir: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache_root: cache_root.into(),
        }
    }

    fn unreachable(locator: &str, message: impl Into<String>) -> Error {
        Error::UpstreamNotFound {
            locator: locator.to_string(),
            message: message.into(),
        }
    }

    /// Local locators are relative to `base_dir`, except the resolving
    /// repository's own locator (see [`crate::upstream::self_locator`]),
    /// which names `base_dir` itself even when `base_dir` is relative.
    fn local_path(&self, locator: &str) -> PathBuf {
        if Path::new(locator) == self.base_dir {
            return self.base_dir.clone();
        }
        self.base_dir.join(locator)
    }

    fn local(&self, locator: &str) -> Result<LocalLocation> {
        let path = self.local_path(locator);
        if path.is_file() {
            let root = path
                .ancestors()
                .skip(1)
                .find(|dir| dir.join(".git").exists())
                .or_else(|| path.parent())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.base_dir.clone());
            Ok(LocalLocation {
                root,
                config: Some(path),
            })
        } else if path.is_dir() {
            let config = config::find_in(&path);
            Ok(LocalLocation { root: path, config })
        } else {
            Err(Self::unreachable(locator, "no such file or directory"))
        }
    }

    /// Clone `locator` at `reference` into the cache unless already there.
    fn checkout(&self, locator: &str, reference: &str) -> Result<PathBuf> {
        let cache_path = url_to_cache_path(&self.cache_root, locator, reference);
        if cache_path.is_dir() {
            debug!("cache hit for {}@{}", locator, reference);
            return Ok(cache_path);
        }
        debug!("cloning {}@{} into {}", locator, reference, cache_path.display());
        clone_shallow(locator, reference, &cache_path)
            .map_err(|e| Self::unreachable(locator, e.to_string()))?;
        Ok(cache_path)
    }
}

impl UpstreamSource for GitSource {
    fn identity(&self, locator: &str) -> String {
        if is_remote(locator) {
            return locator.trim_end_matches('/').trim_end_matches(".git").to_string();
        }
        let path = self.local_path(locator);
        fs::canonicalize(&path).unwrap_or(path).display().to_string()
    }

    fn current_ref(&self, locator: &str) -> Result<String> {
        let location = self.local(locator)?;
        Ok(current_ref(&location.root))
    }

    fn default_ref(&self, locator: &str) -> Result<String> {
        if !is_remote(locator) {
            return self.current_ref(locator);
        }
        let tags = list_tags(locator).map_err(|e| Self::unreachable(locator, e.to_string()))?;
        if let Some(tag) = latest_semver_tag(&tags) {
            return Ok(tag);
        }
        let branch =
            remote_head_branch(locator).map_err(|e| Self::unreachable(locator, e.to_string()))?;
        Ok(branch.unwrap_or_default())
    }

    fn load_config(&self, locator: &str, reference: &str) -> Result<Option<Config>> {
        let config_path = if is_remote(locator) {
            config::find_in(&self.checkout(locator, reference)?)
        } else {
            self.local(locator)?.config
        };

        match config_path {
            Some(path) => config::from_file(&path).map(Some),
            None => {
                warn!("{}@{} has no configuration file", locator, reference);
                Ok(None)
            }
        }
    }

    fn open_view(&self, locator: &str, reference: &str) -> Result<Box<dyn FileView>> {
        if is_remote(locator) {
            // the cached clone is not a working copy we track files of
            Ok(Box::new(DirectoryView::new(self.checkout(locator, reference)?)))
        } else {
            Ok(open_view(&self.local(locator)?.root))
        }
    }
}
