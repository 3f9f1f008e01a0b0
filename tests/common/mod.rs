//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::README_ONLY);
//!     fixture.command().arg("ls").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Publish every tracked file.
    pub const EVERYTHING: &str = "include: ['**']\n";

    /// Publish the README only.
    pub const README_ONLY: &str = "include: [README.md]\n";

    /// The fixtures selection used throughout the resolution tests.
    pub const FIXTURES: &str = r#"
include:
  - "testdata/fixtures/local/*d*.yaml"
exclude:
  - "testdata/fixtures/local/deep.yaml"
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "include: [unclosed\n";

    /// Empty configuration (comments only).
    pub const EMPTY: &str = "# commonrepo configuration\n";
}

/// A temporary directory laid out as a repository: a `.commonrepo.yaml`
/// plus whatever files a test adds.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.commonrepo.yaml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(".commonrepo.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// The files of the resolution scenarios: a few top-level files and
    /// the `testdata/fixtures` tree.
    #[allow(dead_code)]
    pub fn with_fixture_tree(self) -> Self {
        self.with_file("LICENSE", "license text")
            .with_file("README.md", "# Project\n")
            .with_file("go.mod", "module example\n")
            .with_file("testdata/fixtures/schema.yaml", "schema: {}\n")
            .with_file("testdata/fixtures/single_source.yaml", "include: [LICENSE]\n")
            .with_file("testdata/fixtures/local/append.yaml", "a: 1\n")
            .with_file("testdata/fixtures/local/deep.yaml", "d: {{ templated }}\n")
            .with_file("testdata/fixtures/local/single.yml", "include: ['*.md']\n")
    }

    /// Turn the directory into a git repository with every file committed.
    #[allow(dead_code)]
    pub fn committed(self) -> Self {
        let root = self.path().to_path_buf();
        git(&root, &["init", "-q"]);
        git(&root, &["config", "user.email", "test@example.com"]);
        git(&root, &["config", "user.name", "Test"]);
        git(&root, &["add", "-A"]);
        git(&root, &["commit", "-q", "-m", "fixture"]);
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    #[allow(dead_code)]
    pub fn config_path(&self) -> PathBuf {
        self.path().join(".commonrepo.yaml")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory, with
    /// the clone cache kept inside the fixture.
    pub fn command(&self) -> assert_cmd::Command {
        self.command_in(self.path())
    }

    /// Like [`TestFixture::command`], run from a subdirectory.
    #[allow(dead_code)]
    pub fn command_in(&self, dir: &Path) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("commonrepo");
        cmd.current_dir(dir)
            .env("COMMONREPO_CACHE", self.path().join(".cache"))
            .env_remove("COMMONREPO_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed", args);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::README_ONLY);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [configs::EVERYTHING, configs::README_ONLY, configs::FIXTURES] {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
        assert!(serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML).is_err());
    }
}
