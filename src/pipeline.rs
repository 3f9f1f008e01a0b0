//! # Resolution Pipeline and Chain Composition
//!
//! [`run`] applies one configuration to one [`TargetSet`]: Include, then
//! Exclude, then Rename, then Template. Each stage sees exactly the key
//! space produced by the one before it.
//!
//! [`Composer`] runs that pipeline for every upstream of a resolved chain
//! and layers the results into a [`Plan`]:
//!
//! 1.  Each upstream gets its own view and its own target set, driven by its
//!     own configuration (all of its files when it has none). The rename
//!     rules its declaring configuration attached to it run last.
//! 2.  Upstreams are resolved in parallel; nothing is shared between them.
//! 3.  Layering is sequential, in chain order. When two upstreams publish
//!     the same key, the later one wins.
//!
//! Only the upstreams the root configuration declares (depth 1) are layered.
//! What an upstream publishes is decided by its own configuration over its
//! own files; anything it inherits from its own upstreams reaches the output
//! only once it has been applied into that upstream's tree. Deeper chain
//! entries still take part in chain resolution and cycle detection.
//!
//! The resolving repository (position 0) is not layered: its own files are
//! already where they belong.

use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;

use crate::config::Config;
use crate::error::Result;
use crate::rename::RenameRule;
use crate::targets::{Target, TargetMap, TargetSet};
use crate::upstream::{Upstream, UpstreamSource};
use crate::view::FileView;

/// Run the four stages of `config` against `set` and return the result.
///
/// Patterns and rules are compiled before the first stage runs, so a
/// malformed configuration leaves `set` untouched.
pub fn run<V: FileView>(set: &mut TargetSet<V>, config: &Config) -> Result<TargetMap> {
    config.validate()?;
    let rules = RenameRule::compile_all(&config.rename)?;

    set.apply_includes(&config.include)?;
    set.apply_excludes(&config.exclude)?;
    set.apply_renames(&rules)?;
    set.apply_templates(&config.template, &config.template_vars)?;
    set.targets()
}

/// One upstream's resolved contribution.
pub struct Layer {
    pub upstream: Upstream,
    pub targets: TargetMap,
    view: Box<dyn FileView>,
}

impl Layer {
    /// The files `targets` read their content from.
    pub fn view(&self) -> &dyn FileView {
        self.view.as_ref()
    }
}

/// A file selected for the output, with the layer it comes from.
#[derive(Clone, Copy)]
pub struct PlannedFile<'a> {
    pub key: &'a str,
    pub target: &'a Target,
    pub layer: &'a Layer,
}

/// The layered result of composing a chain.
pub struct Plan {
    layers: Vec<Layer>,
    winners: BTreeMap<String, usize>,
}

impl Plan {
    /// Layer `layers` in order; later layers overwrite earlier ones.
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        let mut winners = BTreeMap::new();
        for (index, layer) in layers.iter().enumerate() {
            for key in layer.targets.keys() {
                if let Some(previous) = winners.insert(key.to_string(), index) {
                    debug!(
                        "{} from {} overrides {}",
                        key, layer.upstream, layers[previous].upstream
                    );
                }
            }
        }
        Self { layers, winners }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Files in key order.
    pub fn files(&self) -> impl Iterator<Item = PlannedFile<'_>> {
        self.winners.iter().filter_map(move |(key, &index)| {
            let layer = &self.layers[index];
            layer.targets.get(key).map(|target| PlannedFile {
                key: key.as_str(),
                target,
                layer,
            })
        })
    }

    pub fn get(&self, key: &str) -> Option<PlannedFile<'_>> {
        let (key, &index) = self.winners.get_key_value(key)?;
        let layer = &self.layers[index];
        layer.targets.get(key).map(|target| PlannedFile {
            key: key.as_str(),
            target,
            layer,
        })
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }
}

/// Resolves and layers the upstreams of a chain.
pub struct Composer<'a, S: UpstreamSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: UpstreamSource + ?Sized> Composer<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolve one upstream on its own target set.
    pub fn resolve(&self, upstream: &Upstream) -> Result<Layer> {
        let rules = RenameRule::compile_all(&upstream.rename)?;
        let config = self
            .source
            .load_config(&upstream.locator, &upstream.reference)?
            .unwrap_or_default();
        let view = self.source.open_view(&upstream.locator, &upstream.reference)?;

        let mut set = TargetSet::new(view);
        run(&mut set, &config)?;
        let targets = set.apply_renames(&rules)?;
        debug!("{} contributes {} targets", upstream, targets.len());

        Ok(Layer {
            upstream: upstream.clone(),
            targets,
            view: set.into_view(),
        })
    }

    /// Resolve the directly declared upstreams of `chain` and layer them in
    /// chain order.
    pub fn compose(&self, chain: &[Upstream]) -> Result<Plan> {
        let layers = chain
            .par_iter()
            .filter(|upstream| upstream.depth == 1)
            .map(|upstream| self.resolve(upstream))
            .collect::<Result<Vec<_>>>()?;
        Ok(Plan::from_layers(layers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RenameSpec, UpstreamSpec};
    use crate::error::Error;
    use crate::upstream::{ChainResolver, MemorySource};
    use crate::view::MemoryView;
    use serde_json::json;

    fn fixture_view() -> MemoryView {
        MemoryView::new()
            .with_file("LICENSE", "license text")
            .with_file("README.md", "# Project")
            .with_file("testdata/fixtures/local/append.yaml", "a: 1")
            .with_file("testdata/fixtures/local/deep.yaml", "d: {{ templated }}")
            .with_file("testdata/fixtures/local/single.yml", "s: 1")
    }

    fn keys(map: &TargetMap) -> Vec<&str> {
        map.keys().collect()
    }

    #[test]
    fn test_run_applies_stages_in_order() {
        let config = Config {
            include: vec!["testdata/fixtures/local/*d*.yaml".to_string()],
            exclude: vec!["testdata/fixtures/local/deep.yaml".to_string()],
            rename: vec![RenameSpec::new(
                "^testdata/fixtures/local/(append.yaml)$",
                "%[1]s",
            )],
            ..Config::default()
        };
        let mut set = TargetSet::new(fixture_view());
        let targets = run(&mut set, &config).unwrap();
        assert_eq!(keys(&targets), vec!["append.yaml"]);
        assert_eq!(
            targets.lookup("append.yaml").name,
            "testdata/fixtures/local/append.yaml"
        );
    }

    #[test]
    fn test_run_templates_last() {
        let config = Config {
            exclude: vec!["**".to_string()],
            template: vec!["testdata/fixtures/local/deep.yaml".to_string()],
            template_vars: [("templated".to_string(), json!(true))].into(),
            ..Config::default()
        };
        let mut set = TargetSet::new(fixture_view());
        let targets = run(&mut set, &config).unwrap();
        assert_eq!(keys(&targets), vec!["testdata/fixtures/local/deep.yaml"]);
        assert_eq!(
            targets.lookup("testdata/fixtures/local/deep.yaml").vars,
            Some(config.template_vars.clone())
        );
    }

    #[test]
    fn test_run_empty_config_keeps_everything() {
        let mut set = TargetSet::new(fixture_view());
        let targets = run(&mut set, &Config::default()).unwrap();
        assert_eq!(targets.len(), 5);
        assert!(!set.is_explicit());
    }

    #[test]
    fn test_run_rejects_bad_rule_before_any_stage() {
        let config = Config {
            include: vec!["README.md".to_string()],
            rename: vec![RenameSpec::new("(unclosed", "x")],
            ..Config::default()
        };
        let mut set = TargetSet::new(fixture_view());
        let err = run(&mut set, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
        assert!(!set.is_explicit());
    }

    fn chain_source() -> (MemorySource, Config) {
        let root = Config {
            upstream: vec![
                UpstreamSpec {
                    url: "../base".to_string(),
                    reference: None,
                    rename: vec![],
                },
                UpstreamSpec {
                    url: "../overlay".to_string(),
                    reference: Some("v2".to_string()),
                    rename: vec![RenameSpec::new("^(CONTRIBUTING.md)$", "docs/%[1]s")],
                },
            ],
            ..Config::default()
        };
        let base_config = Config {
            include: vec!["LICENSE".to_string(), "README.md".to_string()],
            ..Config::default()
        };
        let source = MemorySource::new()
            .with_repo("./", "", None, MemoryView::new().with_file("own.txt", "mine"))
            .with_repo(
                "../base",
                "v1",
                Some(base_config),
                MemoryView::new()
                    .with_file("LICENSE", "base license")
                    .with_file("README.md", "base readme")
                    .with_file("internal.txt", "not published"),
            )
            .with_repo(
                "../overlay",
                "v2",
                None,
                MemoryView::new()
                    .with_file("README.md", "overlay readme")
                    .with_file("CONTRIBUTING.md", "be nice"),
            );
        (source, root)
    }

    #[test]
    fn test_compose_layers_later_upstreams_over_earlier() {
        let (source, root) = chain_source();
        let chain = ChainResolver::new(&source).resolve("./", &root).unwrap();
        let plan = Composer::new(&source).compose(&chain).unwrap();

        let files: Vec<(&str, String)> = plan
            .files()
            .map(|f| (f.key, f.layer.upstream.to_string()))
            .collect();
        assert_eq!(
            files,
            vec![
                ("LICENSE", "../base@v1".to_string()),
                ("README.md", "../overlay@v2".to_string()),
                ("docs/CONTRIBUTING.md", "../overlay@v2".to_string()),
            ]
        );

        let readme = plan.get("README.md").unwrap();
        assert_eq!(
            readme.layer.view().read_file(&readme.target.name).unwrap(),
            b"overlay readme"
        );
        assert_eq!(plan.layers().len(), 2);
    }

    #[test]
    fn test_compose_skips_resolving_repository() {
        let (source, root) = chain_source();
        let chain = ChainResolver::new(&source).resolve("./", &root).unwrap();
        let plan = Composer::new(&source).compose(&chain).unwrap();
        assert!(plan.get("own.txt").is_none());
        assert!(plan.get("internal.txt").is_none());
    }

    #[test]
    fn test_compose_layers_declared_upstreams_only() {
        let root = Config {
            upstream: vec![UpstreamSpec {
                url: "../a".to_string(),
                reference: None,
                rename: vec![],
            }],
            ..Config::default()
        };
        let a_config = Config {
            include: vec!["README.md".to_string()],
            upstream: vec![UpstreamSpec {
                url: "../b".to_string(),
                reference: None,
                rename: vec![],
            }],
            ..Config::default()
        };
        let source = MemorySource::new()
            .with_repo("./", "", None, MemoryView::new())
            .with_repo(
                "../a",
                "1",
                Some(a_config),
                MemoryView::new()
                    .with_file("README.md", "a readme")
                    .with_file("notes.txt", "a notes"),
            )
            .with_repo(
                "../b",
                "2",
                None,
                MemoryView::new()
                    .with_file("README.md", "b readme")
                    .with_file("secret.txt", "b internal"),
            );

        let chain = ChainResolver::new(&source).resolve("./", &root).unwrap();
        assert_eq!(chain.len(), 3);
        let plan = Composer::new(&source).compose(&chain).unwrap();

        let files: Vec<(&str, String)> = plan
            .files()
            .map(|f| (f.key, f.layer.upstream.to_string()))
            .collect();
        assert_eq!(files, vec![("README.md", "../a@1".to_string())]);
        let readme = plan.get("README.md").unwrap();
        assert_eq!(
            readme.layer.view().read_file(&readme.target.name).unwrap(),
            b"a readme"
        );
    }

    #[test]
    fn test_compose_without_upstreams_is_empty() {
        let (source, _) = chain_source();
        let chain = ChainResolver::new(&source).resolve("./", &Config::default()).unwrap();
        let plan = Composer::new(&source).compose(&chain).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
