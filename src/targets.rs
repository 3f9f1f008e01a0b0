//! # Targets and the Target Set
//!
//! A [`Target`] binds one output key (the relative path the file will be
//! written to) to the repository path its content is read from, plus the
//! template variables when the file is a template.
//!
//! A [`TargetSet`] is the mapping the resolution pipeline works on. It has
//! two states:
//!
//! - **Lazy**: no pipeline operation has run yet. Querying it synthesizes
//!   one target per path of the underlying [`FileView`], keyed by the path
//!   itself. Nothing is stored, so every query re-reads the view.
//! - **Explicit**: an operation has established an override map, which is
//!   returned verbatim until [`TargetSet::reset`] goes back to lazy.
//!
//! ## Operations
//!
//! | operation | matched against | effect |
//! |-----------|-----------------|--------|
//! | [`apply_includes`](TargetSet::apply_includes)   | repository paths | add `path -> path` |
//! | [`apply_excludes`](TargetSet::apply_excludes)   | target keys      | remove matches |
//! | [`apply_renames`](TargetSet::apply_renames)     | target keys      | move to a new key, first rule wins |
//! | [`apply_templates`](TargetSet::apply_templates) | repository paths | add or overwrite `path -> path + vars` |
//! | [`glob_targets`](TargetSet::glob_targets)       | target keys      | read-only subset |
//!
//! Every mutating operation builds the complete resulting map before
//! swapping it in. On error the set is left exactly as it was.
//!
//! An include on a lazy set starts from nothing: the lazy default stands for
//! "no selection made yet", so the first include selects rather than adds.
//! Excludes, renames and templates start from the current contents, lazy or
//! explicit. Empty pattern or rule lists return the current mapping without
//! leaving lazy mode.

use std::collections::btree_map::{self, BTreeMap};

use log::debug;
use serde::Serialize;

use crate::config::TemplateVars;
use crate::error::Result;
use crate::glob::Glob;
use crate::rename::RenameRule;
use crate::view::FileView;

/// One file destined for propagation.
///
/// The default value (empty `name`) is the "absent" target returned by
/// [`TargetMap::lookup`] for a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Target {
    /// Repository-relative path the content is read from.
    pub name: String,
    /// Present only for templated targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<TemplateVars>,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: None,
        }
    }

    pub fn templated(name: impl Into<String>, vars: TemplateVars) -> Self {
        Self {
            name: name.into(),
            vars: Some(vars),
        }
    }

    /// True for the zero-value target.
    pub fn is_absent(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_template(&self) -> bool {
        self.vars.is_some()
    }
}

/// Output key to target, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TargetMap(BTreeMap<String, Target>);

impl TargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The target under `key`, or the zero-value target when absent.
    pub fn lookup(&self, key: &str) -> Target {
        self.0.get(key).cloned().unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Target> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, target: Target) -> Option<Target> {
        self.0.insert(key.into(), target)
    }

    pub fn remove(&mut self, key: &str) -> Option<Target> {
        self.0.remove(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Target> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn entry(&mut self, key: String) -> btree_map::Entry<'_, String, Target> {
        self.0.entry(key)
    }
}

impl FromIterator<(String, Target)> for TargetMap {
    fn from_iter<I: IntoIterator<Item = (String, Target)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TargetMap {
    type Item = (String, Target);
    type IntoIter = btree_map::IntoIter<String, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TargetMap {
    type Item = (&'a String, &'a Target);
    type IntoIter = btree_map::Iter<'a, String, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone)]
enum State {
    Lazy,
    Explicit(TargetMap),
}

/// The mutable-by-replacement target mapping over a repository file view.
///
/// Not shared between threads: resolve concurrent chains with one set each.
#[derive(Debug)]
pub struct TargetSet<V: FileView> {
    view: V,
    state: State,
}

impl<V: FileView> TargetSet<V> {
    /// A lazy set over `view`.
    pub fn new(view: V) -> Self {
        Self {
            view,
            state: State::Lazy,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Whether an override map has been established.
    pub fn is_explicit(&self) -> bool {
        matches!(self.state, State::Explicit(_))
    }

    /// The current mapping.
    ///
    /// In lazy mode this re-reads the view on every call and stores nothing.
    pub fn targets(&self) -> Result<TargetMap> {
        match &self.state {
            State::Explicit(map) => Ok(map.clone()),
            State::Lazy => Ok(self
                .view
                .list_paths()?
                .into_iter()
                .map(|path| (path.clone(), Target::new(path)))
                .collect()),
        }
    }

    /// Discard any override and return to lazy mode.
    pub fn reset(&mut self) {
        debug!("target set reset to lazy");
        self.state = State::Lazy;
    }

    /// Insert one entry directly, entering explicit mode seeded from the
    /// current mapping.
    pub fn insert_target(&mut self, key: impl Into<String>, target: Target) -> Result<()> {
        let mut next = self.targets()?;
        next.insert(key, target);
        self.state = State::Explicit(next);
        Ok(())
    }

    /// Add every repository path matching any of `patterns`.
    ///
    /// Paths already present as keys keep their existing target.
    pub fn apply_includes<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<TargetMap> {
        if patterns.is_empty() {
            return self.targets();
        }

        let globs = compile(patterns)?;
        let paths = self.view.list_paths()?;
        let mut next = match &self.state {
            State::Explicit(map) => map.clone(),
            State::Lazy => TargetMap::new(),
        };

        for glob in &globs {
            for path in glob.filter(&paths) {
                next.entry(path.clone()).or_insert_with(|| Target::new(path));
            }
        }

        debug!("include {:?}: {} targets", patterns_of(&globs), next.len());
        Ok(self.swap(next))
    }

    /// Remove every entry whose key matches any of `patterns`.
    ///
    /// `["**"]` clears the set.
    pub fn apply_excludes<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<TargetMap> {
        if patterns.is_empty() {
            return self.targets();
        }

        let globs = compile(patterns)?;
        let mut next = self.targets()?;

        for glob in &globs {
            for key in glob.filter(next.keys()) {
                next.remove(&key);
            }
        }

        debug!("exclude {:?}: {} targets", patterns_of(&globs), next.len());
        Ok(self.swap(next))
    }

    /// Move entries to new keys.
    ///
    /// Entries are visited in key order and the first rule matching an
    /// entry's key decides its new key. Renamed entries keep their `name`
    /// and `vars`; their old keys disappear. When several entries land on
    /// the same key, the one visited last wins, and a renamed entry replaces
    /// any untouched entry already under that key.
    pub fn apply_renames(&mut self, rules: &[RenameRule]) -> Result<TargetMap> {
        if rules.is_empty() {
            return self.targets();
        }

        let current = self.targets()?;
        let mut moved: Vec<(String, Target)> = Vec::new();
        let mut vacated: Vec<&str> = Vec::new();

        for (key, target) in &current {
            let renamed = rules.iter().find_map(|rule| rule.apply(key));
            if let Some(new_key) = renamed {
                if new_key != *key {
                    vacated.push(key);
                    moved.push((new_key, target.clone()));
                }
            }
        }

        let mut next = current.clone();
        for key in vacated {
            next.remove(key);
        }
        let renamed = moved.len();
        for (key, target) in moved {
            next.insert(key, target);
        }

        debug!("rename: {} of {} targets moved", renamed, current.len());
        Ok(self.swap(next))
    }

    /// Add (or overwrite) every repository path matching any of `patterns`
    /// as a templated target carrying `vars`.
    ///
    /// This does not drop non-templated entries; clear the set with
    /// `apply_excludes(&["**"])` first for a templates-only set.
    pub fn apply_templates<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        vars: &TemplateVars,
    ) -> Result<()> {
        if patterns.is_empty() {
            return Ok(());
        }

        let globs = compile(patterns)?;
        let paths = self.view.list_paths()?;
        let mut next = self.targets()?;

        for glob in &globs {
            for path in glob.filter(&paths) {
                next.insert(path.clone(), Target::templated(path, vars.clone()));
            }
        }

        debug!("template {:?}: {} targets", patterns_of(&globs), next.len());
        self.swap(next);
        Ok(())
    }

    /// The entries whose keys (output locations) match `pattern`.
    pub fn glob_targets(&self, pattern: &str) -> Result<TargetMap> {
        let glob = Glob::new(pattern)?;
        let current = self.targets()?;
        Ok(current
            .into_iter()
            .filter(|(key, _)| glob.is_match(key))
            .collect())
    }

    fn swap(&mut self, next: TargetMap) -> TargetMap {
        self.state = State::Explicit(next.clone());
        next
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Glob>> {
    patterns.iter().map(|p| Glob::new(p.as_ref())).collect()
}

fn patterns_of(globs: &[Glob]) -> Vec<&str> {
    globs.iter().map(Glob::as_str).collect()
}
