//! # Error Suggestions
//!
//! Helpers that turn failures into messages telling the user what went
//! wrong AND how to fix it. Commands route library errors through
//! [`explain`] instead of printing them bare.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! let chain = upstream::upstreams(&root, &config_path, &cache_root)
//!     .map_err(suggestions::explain)?;
//! ```

use std::path::Path;

use crate::error::Error;

/// Top-level `.commonrepo.yaml` fields, for typo suggestions.
const CONFIG_FIELDS: [&str; 6] = [
    "include",
    "exclude",
    "template",
    "template-vars",
    "rename",
    "upstream",
];

/// Generate an error for when the configuration file is not found.
///
/// Includes hints about:
/// - Creating a new config file
/// - Using the -c/--config flag
/// - Using the COMMONREPO_CONFIG environment variable
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create a .commonrepo.yaml file in your repository root\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set COMMONREPO_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for a glob or rename expression that does not compile.
pub fn invalid_pattern(pattern: &str, message: &str) -> anyhow::Error {
    let hint = if pattern.contains('(') || pattern.contains('^') || pattern.contains('$') {
        "hint: Rename rules are regular expressions; check for unclosed groups"
    } else {
        "hint: Use * within one path segment, ** for any number of segments\n\
         hint: Close every [class] and {alternation}, escape literals with backslash"
    };

    anyhow::anyhow!(
        "Invalid pattern: {pattern}\n\
         error: {message}\n\n\
         {hint}"
    )
}

/// Generate an error for an upstream that cannot be reached.
pub fn upstream_not_found(locator: &str, message: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Upstream not found: {locator}\n\
         error: {message}\n\n\
         hint: Local upstreams are resolved relative to the repository root (--repo)\n\
         hint: For remote upstreams, check the URL and that your git credentials can read it"
    )
}

/// Generate an error for an upstream chain that loops back on itself.
///
/// Includes hints about how to resolve the cycle.
pub fn cyclic_upstream(cycle: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Cycle detected in upstream chain: {cycle}\n\n\
         hint: The last upstream is already in the chain (an ancestor or a shared dependency)\n\
         hint: Remove one of the 'upstream:' entries to break the cycle\n\
         hint: Consider extracting shared files into a separate repository"
    )
}

/// Generate an error for an unknown top-level configuration field.
pub fn unknown_field(field: &str) -> anyhow::Error {
    let did_you_mean = find_similar(field, &CONFIG_FIELDS)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown configuration field: {field}{did_you_mean}\n\n\
         Valid fields are: {fields}",
        fields = CONFIG_FIELDS.join(", ")
    )
}

/// Attach hints to a library error where one helps.
pub fn explain(error: Error) -> anyhow::Error {
    let hinted = match &error {
        Error::InvalidPattern { pattern, message } => Some(invalid_pattern(pattern, message)),
        Error::UpstreamNotFound { locator, message } => Some(upstream_not_found(locator, message)),
        Error::CyclicUpstream { cycle } => Some(cyclic_upstream(cycle)),
        Error::ConfigParse { message, .. } => unknown_field_in(message).map(unknown_field),
        _ => None,
    };
    hinted.unwrap_or_else(|| error.into())
}

/// Extract the field name from serde's "unknown field `x`" message.
fn unknown_field_in(message: &str) -> Option<&str> {
    let rest = message.split("unknown field `").nth(1)?;
    rest.split('`').next()
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    // single rolling row
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b.len()]
}
