//! Rename rules: a regular expression matched against a target key and a
//! replacement template filled from its capture groups.
//!
//! Replacement templates reference captures positionally. Two spellings are
//! understood:
//!
//! - `%[N]s` (and a bare `%s`, which takes the capture after the last one
//!   used), the form found in existing `.commonrepo.yaml` files;
//! - `$N` / `${N}`.
//!
//! `%%` and `$$` produce a literal `%` or `$`. A reference to a capture that
//! did not participate in the match expands to the empty string.
//!
//! Expressions are not anchored implicitly.

use regex::{Captures, Regex};

use crate::config::RenameSpec;
use crate::error::{Error, Result};

/// A compiled rename rule.
#[derive(Debug, Clone)]
pub struct RenameRule {
    regex: Regex,
    replacement: String,
}

impl RenameRule {
    /// Compile a rule. An invalid expression fails with
    /// `Error::InvalidPattern`.
    pub fn new(from: &str, to: &str) -> Result<Self> {
        let regex = Regex::new(from).map_err(|e| Error::invalid_pattern(from, e.to_string()))?;
        Ok(Self {
            regex,
            replacement: to.to_string(),
        })
    }

    /// Compile every spec, in order.
    pub fn compile_all(specs: &[RenameSpec]) -> Result<Vec<RenameRule>> {
        specs.iter().map(|spec| RenameRule::new(&spec.from, &spec.to)).collect()
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// The renamed key, or `None` when the expression does not match `key`.
    pub fn apply(&self, key: &str) -> Option<String> {
        self.regex.captures(key).map(|captures| expand(&self.replacement, &captures))
    }
}

impl TryFrom<&RenameSpec> for RenameRule {
    type Error = Error;

    fn try_from(spec: &RenameSpec) -> Result<Self> {
        RenameRule::new(&spec.from, &spec.to)
    }
}

fn expand(template: &str, captures: &Captures<'_>) -> String {
    let group = |n: usize| captures.get(n).map(|m| m.as_str()).unwrap_or("");

    let mut result = String::with_capacity(template.len());
    let mut next_implicit = 1;
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, chars.peek().copied()) {
            ('%', Some('%')) | ('$', Some('$')) => {
                chars.next();
                result.push(ch);
            }
            ('%', Some('s')) => {
                chars.next();
                result.push_str(group(next_implicit));
                next_implicit += 1;
            }
            ('%', Some('[')) => {
                let rest: String = chars.clone().collect();
                match parse_indexed_verb(&rest) {
                    Some((index, consumed)) => {
                        for _ in 0..consumed {
                            chars.next();
                        }
                        result.push_str(group(index));
                        next_implicit = index + 1;
                    }
                    None => result.push(ch),
                }
            }
            ('$', Some('{')) => {
                let rest: String = chars.clone().collect();
                match parse_braced_group(&rest) {
                    Some((index, consumed)) => {
                        for _ in 0..consumed {
                            chars.next();
                        }
                        result.push_str(group(index));
                    }
                    None => result.push(ch),
                }
            }
            ('$', Some(d)) if d.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                // digits is non-empty and numeric
                result.push_str(group(digits.parse().unwrap_or(0)));
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Parse `[N]s` at the start of `rest`, returning `N` and the number of
/// characters consumed.
fn parse_indexed_verb(rest: &str) -> Option<(usize, usize)> {
    let inner = rest.strip_prefix('[')?;
    let close = inner.find(']')?;
    let index: usize = inner[..close].parse().ok()?;
    if inner[close + 1..].starts_with('s') {
        Some((index, close + 3))
    } else {
        None
    }
}

/// Parse `{N}` at the start of `rest`.
fn parse_braced_group(rest: &str) -> Option<(usize, usize)> {
    let inner = rest.strip_prefix('{')?;
    let close = inner.find('}')?;
    let index: usize = inner[..close].parse().ok()?;
    Some((index, close + 2))
}
