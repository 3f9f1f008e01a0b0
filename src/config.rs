//! # Configuration Schema and Parsing
//!
//! This module defines the typed record behind a `.commonrepo.yaml` file and
//! the logic for loading it. A configuration describes two things:
//!
//! 1.  What this repository publishes: `include`, `exclude`, `rename` and
//!     `template` (with `template-vars`) drive the target resolution pipeline
//!     run against the repository's own files.
//! 2.  Where it pulls from: `upstream` lists the repositories whose published
//!     files are layered into this one, each optionally pinned to a ref and
//!     with extra rename rules applied to its contribution.
//!
//! ## Example
//!
//! ```yaml
//! include:
//!   - ".github/**"
//!   - LICENSE
//! exclude:
//!   - ".github/CODEOWNERS"
//! rename:
//!   - "^docs/(CONTRIBUTING\\.md)$": "%[1]s"
//! template:
//!   - ".github/workflows/*.yml"
//! template-vars:
//!   project: example
//! upstream:
//!   - url: git@github.com:example/shared.git
//!     ref: v1.2.0
//!     rename:
//!       - "^ci/(.*)$": ".github/workflows/$1"
//! ```
//!
//! Parsing only checks shape. Glob and regular-expression validity is
//! checked by [`Config::validate`], and again when the pipeline compiles
//! them.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::defaults::CONFIG_FILENAMES;
use crate::error::{Error, Result};
use crate::glob::Glob;
use crate::rename::RenameRule;

/// Template variables: name to arbitrary YAML value.
pub type TemplateVars = BTreeMap<String, serde_json::Value>;

/// A parsed `.commonrepo.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Glob patterns selecting repository paths to publish.
    #[serde(default)]
    pub include: Vec<String>,
    /// Glob patterns removing entries from the target set by key.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Glob patterns selecting repository paths to publish as templates.
    #[serde(default)]
    pub template: Vec<String>,
    /// Variables attached to every templated target.
    #[serde(default)]
    pub template_vars: TemplateVars,
    /// Ordered rename rules; the first matching rule wins.
    #[serde(default)]
    pub rename: Vec<RenameSpec>,
    /// Upstream repositories, in layering order.
    #[serde(default)]
    pub upstream: Vec<UpstreamSpec>,
}

/// One declared upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamSpec {
    /// Local path or remote URL.
    pub url: String,
    /// Pinned ref. When absent the upstream's default version is used.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Rename rules applied to this upstream's contribution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rename: Vec<RenameSpec>,
}

/// An uncompiled rename rule, written in YAML as a single-entry mapping
/// `"<regex>": "<replacement>"`. The long form `{from: .., to: ..}` is also
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSpec {
    /// Regular expression matched against target keys (not anchored).
    pub from: String,
    /// Replacement template referencing captures positionally.
    pub to: String,
}

impl RenameSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Serialize for RenameSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.from, &self.to)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for RenameSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RenameVisitor;

        impl<'de> Visitor<'de> for RenameVisitor {
            type Value = RenameSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-entry mapping of \"<regex>\": \"<replacement>\"")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<RenameSpec, A::Error> {
                let mut entries: Vec<(String, String)> = Vec::new();
                while let Some(entry) = access.next_entry::<String, String>()? {
                    entries.push(entry);
                }

                match entries.as_slice() {
                    [(from, to)] => Ok(RenameSpec::new(from.as_str(), to.as_str())),
                    [(k1, v1), (k2, v2)] if k1 == "from" && k2 == "to" => {
                        Ok(RenameSpec::new(v1.as_str(), v2.as_str()))
                    }
                    [(k1, v1), (k2, v2)] if k1 == "to" && k2 == "from" => {
                        Ok(RenameSpec::new(v2.as_str(), v1.as_str()))
                    }
                    _ => Err(de::Error::invalid_length(entries.len(), &self)),
                }
            }
        }

        deserializer.deserialize_map(RenameVisitor)
    }
}

impl Config {
    /// Compile every glob and rename expression, failing on the first
    /// invalid one.
    pub fn validate(&self) -> Result<()> {
        for pattern in self.include.iter().chain(&self.exclude).chain(&self.template) {
            Glob::new(pattern)?;
        }
        RenameRule::compile_all(&self.rename)?;
        for upstream in &self.upstream {
            if upstream.url.trim().is_empty() {
                return Err(Error::ConfigParse {
                    message: "upstream entry has an empty url".to_string(),
                    hint: Some("Set 'url:' to a local path or a git URL".to_string()),
                });
            }
            RenameRule::compile_all(&upstream.rename)?;
        }
        Ok(())
    }
}

/// Parses a YAML string into a `Config`.
///
/// An empty document (or one holding only comments) is the empty
/// configuration.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let only_comments = yaml_content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
    if only_comments {
        return Ok(Config::default());
    }

    serde_yaml::from_str(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = hint_for(&message);
        Error::ConfigParse { message, hint }
    })
}

/// Load and parse a configuration file.
pub fn from_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })?;
    parse(&content)
}

/// Locate the configuration file at the root of `dir`, if any.
pub fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES.iter().map(|name| dir.join(name)).find(|candidate| candidate.is_file())
}

fn hint_for(message: &str) -> Option<String> {
    if message.contains("unknown field") {
        Some(
            "Valid top-level fields are: include, exclude, template, template-vars, rename, upstream"
                .to_string(),
        )
    } else if message.contains("single-entry mapping") {
        Some("Write each rename rule as - \"<regex>\": \"<replacement>\"".to_string())
    } else if message.contains("missing field `url`") {
        Some("Every upstream entry needs a 'url:'".to_string())
    } else {
        None
    }
}
