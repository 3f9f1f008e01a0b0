//! # Rendering and Write-out
//!
//! The last, thin step after resolution: read each planned target from the
//! layer it came from, substitute variables into templated ones, and write
//! the result under an output directory.
//!
//! Placeholders are `{{ name }}` or `{{ .name }}`. Dotted names walk into
//! mapping values (`{{ .owner.email }}`). String values are inserted as is,
//! anything else as its JSON text. A placeholder naming an unknown variable
//! fails with `Error::Template`; there is no other template syntax.

use std::fs;
use std::path::{Component, Path};

use log::debug;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;

use crate::config::TemplateVars;
use crate::error::{Error, Result};
use crate::pipeline::{Plan, PlannedFile};
use crate::targets::Target;
use crate::view::FileView;

const PLACEHOLDER: &str = r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_-]*(?:\.[A-Za-z0-9_-]+)*)\s*\}\}";

/// Compiled placeholder syntax, built once and reused for every file.
#[derive(Debug, Clone)]
pub struct Renderer {
    placeholder: Regex,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let placeholder = Regex::new(PLACEHOLDER).map_err(|e| Error::Template {
            message: e.to_string(),
            variable: None,
        })?;
        Ok(Self { placeholder })
    }

    /// Substitute every placeholder in `content` from `vars`.
    pub fn render(&self, content: &str, vars: &TemplateVars) -> Result<String> {
        let mut missing = None;
        let rendered = self.placeholder.replace_all(content, |caps: &Captures<'_>| {
            let name = &caps[1];
            match lookup(vars, name) {
                Some(Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(variable) => Err(Error::Template {
                message: format!("undefined variable '{}'", variable),
                variable: Some(variable),
            }),
            None => Ok(rendered.into_owned()),
        }
    }

    /// The bytes to write for `target`: its content from `view`, rendered
    /// when the target is templated.
    pub fn render_target(&self, view: &dyn FileView, target: &Target) -> Result<Vec<u8>> {
        let content = view.read_file(&target.name)?;
        match &target.vars {
            None => Ok(content),
            Some(vars) => {
                let text = String::from_utf8(content).map_err(|_| Error::Template {
                    message: format!("'{}' is not valid UTF-8", target.name),
                    variable: None,
                })?;
                Ok(self.render(&text, vars)?.into_bytes())
            }
        }
    }
}

/// Substitute every placeholder in `content` from `vars`.
///
/// Compiles the placeholder syntax on each call; use a [`Renderer`] for
/// more than one file.
pub fn render(content: &str, vars: &TemplateVars) -> Result<String> {
    Renderer::new()?.render(content, vars)
}

fn lookup<'a>(vars: &'a TemplateVars, name: &str) -> Option<&'a Value> {
    let mut segments = name.split('.');
    let first = vars.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.get(segment))
}

/// One file written (or, on a dry run, that would be written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Output path relative to the output directory.
    pub key: String,
    /// `locator@ref` of the upstream the content came from.
    pub source: String,
    /// Path inside that upstream.
    pub name: String,
    pub size: usize,
    pub templated: bool,
}

/// Write every file of `plan` under `output`.
///
/// Everything is read and rendered before the first write, so a missing
/// source or an undefined variable leaves `output` untouched. With
/// `dry_run` nothing is written at all.
pub fn write_plan(plan: &Plan, output: &Path, dry_run: bool) -> Result<Vec<WrittenFile>> {
    let renderer = Renderer::new()?;
    let mut rendered = Vec::with_capacity(plan.len());
    for file in plan.files() {
        check_key(file.key)?;
        let content = renderer.render_target(file.layer.view(), file.target)?;
        let mode = file.layer.view().stat(&file.target.name)?.mode;
        rendered.push((file, content, mode));
    }

    let mut written = Vec::with_capacity(rendered.len());
    for (file, content, mode) in rendered {
        if !dry_run {
            write_file(&output.join(file.key), &content, mode)?;
        }
        debug!("{} <- {}:{}", file.key, file.layer.upstream, file.target.name);
        written.push(summary(&file, content.len()));
    }
    Ok(written)
}

fn summary(file: &PlannedFile<'_>, size: usize) -> WrittenFile {
    WrittenFile {
        key: file.key.to_string(),
        source: file.layer.upstream.to_string(),
        name: file.target.name.clone(),
        size,
        templated: file.target.is_template(),
    }
}

/// Output keys must stay inside the output directory.
fn check_key(key: &str) -> Result<()> {
    let escapes = Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if key.is_empty() || escapes {
        return Err(Error::invalid_pattern(
            key,
            "output path must be relative and stay inside the output directory",
        ));
    }
    Ok(())
}

fn write_file(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
