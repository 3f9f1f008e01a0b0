//! # commonrepo Library
//!
//! This library propagates a shared set of files (licenses, CI configs,
//! boilerplate) from upstream git repositories into a target repository,
//! under a declarative `.commonrepo.yaml` that selects, renames, templates
//! and version-pins the propagated content. It backs the `commonrepo`
//! command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use commonrepo::targets::TargetSet;
//! use commonrepo::view::MemoryView;
//!
//! let view = MemoryView::new()
//!     .with_file("README.md", "# Project")
//!     .with_file("testdata/fixtures/local/append.yaml", "a: 1")
//!     .with_file("testdata/fixtures/local/deep.yaml", "d: 1");
//!
//! let mut set = TargetSet::new(view);
//! let targets = set
//!     .apply_includes(&["testdata/fixtures/local/*d*.yaml"])
//!     .unwrap();
//! let keys: Vec<&str> = targets.keys().collect();
//! assert_eq!(
//!     keys,
//!     ["testdata/fixtures/local/append.yaml", "testdata/fixtures/local/deep.yaml"]
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Glob Matcher (`glob`)**: pure pattern matching over explicit candidate
//!   lists, with `*` within a segment and `**` across segments.
//! - **Repository File View (`view`, `git`)**: read-only access to a
//!   repository's tracked files.
//! - **Target Set (`targets`)**: the output-key to source-path mapping,
//!   lazy until the first pipeline operation.
//! - **Pipeline (`pipeline`)**: Include, Exclude, Rename and Template
//!   applied in that order, and the layering of several upstreams.
//! - **Upstream Chain (`upstream`)**: self first, then every declared
//!   upstream, depth-first, each pinned to a ref.
//!
//! ## Execution Flow
//!
//! 1.  **Chain**: [`upstream::upstreams`] resolves the ordered upstream list.
//! 2.  **Resolve**: [`pipeline::Composer`] runs each upstream's pipeline on
//!     its own target set.
//! 3.  **Layer**: later upstreams overwrite earlier ones key by key.
//! 4.  **Write**: [`render::write_plan`] renders templates and writes files.

pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod glob;
pub mod output;
pub mod pipeline;
pub mod rename;
pub mod render;
pub mod suggestions;
pub mod targets;
pub mod upstream;
pub mod view;

#[cfg(test)]
mod glob_proptest;

pub use error::{Error, Result};
