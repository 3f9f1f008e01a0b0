//! # Glob Matcher
//!
//! Pure pattern matching over an explicit candidate list. Nothing in this
//! module touches the filesystem: callers hand in the paths (repository
//! paths or target keys) and get back the matching subset, sorted
//! lexicographically so the result never depends on candidate order.
//!
//! ## Pattern Grammar
//!
//! Patterns are matched against the full `/`-separated relative path and are
//! case-sensitive.
//!
//! - `*` matches any run of characters other than `/`, including the empty
//!   run. It may be mixed with literals inside a segment (`*d*.yaml`).
//! - `**` forming a whole segment matches zero or more whole segments, so
//!   `**/x` matches `x` at any depth and `a/**/x` matches `a/x`, `a/b/x`, ...
//!   A trailing `/**` also matches the directory path itself, and a bare `**`
//!   matches everything. Anywhere else `**` behaves like `*`.
//! - `?` matches one character other than `/`.
//! - `[abc]`, `[a-z]` and the negated `[!abc]` / `[^abc]` match one
//!   character; negated classes never match `/`.
//! - `{a,b}` matches either alternative; alternatives may nest.
//! - `\` escapes the next character.
//!
//! Patterns are compiled to an anchored [`regex::Regex`]. An unclosed class
//! or alternation, an empty class, or a dangling escape fails with
//! [`Error::InvalidPattern`].

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::{Error, Result};

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
}

impl Glob {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        let tokens = Parser::new(pattern).parse()?;
        let mut source = String::with_capacity(pattern.len() * 2 + 2);
        source.push('^');
        emit(&tokens, &mut source);
        source.push('$');

        let regex =
            Regex::new(&source).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern this glob was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Check a single path against the pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Return the matching candidates, sorted and deduplicated.
    pub fn filter<I, S>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matches: Vec<String> = candidates
            .into_iter()
            .filter(|c| self.is_match(c.as_ref()))
            .map(|c| c.as_ref().to_string())
            .collect();
        matches.sort();
        matches.dedup();
        matches
    }
}

impl fmt::Display for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for Glob {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Glob::new(s)
    }
}

/// Match `pattern` against `candidates`.
///
/// Convenience wrapper around [`Glob::new`] and [`Glob::filter`].
///
/// # Examples
///
/// ```
/// use commonrepo::glob::match_paths;
///
/// let paths = ["b/x", "x", "a/b/c/x", "a/y"];
/// let found = match_paths("**/x", paths).unwrap();
/// assert_eq!(found, vec!["a/b/c/x", "b/x", "x"]);
/// ```
pub fn match_paths<I, S>(pattern: &str, candidates: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(Glob::new(pattern)?.filter(candidates))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    /// `*`
    AnyRun,
    /// `?`
    AnyChar,
    /// Regex class body, already escaped.
    Class { negated: bool, body: String },
    Alternation(Vec<Vec<Token>>),
    Separator,
    /// `**` as a whole segment
    Recursive,
}

struct Parser<'a> {
    pattern: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            chars: pattern.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Vec<Token>> {
        let tokens = self.parse_sequence(0)?;
        // parse_sequence at depth 0 only returns at end of input
        debug_assert_eq!(self.pos, self.chars.len());
        Ok(tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn at_segment_start(&self) -> bool {
        self.pos == 0 || self.chars[self.pos - 1] == '/'
    }

    /// Parse until end of input, or until an unnested `,`/`}` when inside an
    /// alternation (`depth > 0`).
    fn parse_sequence(&mut self, depth: usize) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek(0) {
            match ch {
                ',' | '}' if depth > 0 => return Ok(tokens),
                '/' => {
                    tokens.push(Token::Separator);
                    self.pos += 1;
                }
                '*' => {
                    let whole_segment = depth == 0
                        && self.at_segment_start()
                        && self.peek(1) == Some('*')
                        && matches!(self.peek(2), None | Some('/'));
                    if whole_segment {
                        tokens.push(Token::Recursive);
                        self.pos += 2;
                    } else {
                        tokens.push(Token::AnyRun);
                        self.pos += 1;
                    }
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    self.pos += 1;
                }
                '[' => tokens.push(self.parse_class()?),
                '{' => tokens.push(self.parse_alternation(depth)?),
                '\\' => {
                    let escaped = self.peek(1).ok_or_else(|| {
                        Error::invalid_pattern(self.pattern, "dangling escape at end of pattern")
                    })?;
                    tokens.push(Token::Literal(escaped));
                    self.pos += 2;
                }
                c => {
                    tokens.push(Token::Literal(c));
                    self.pos += 1;
                }
            }
        }

        if depth > 0 {
            return Err(Error::invalid_pattern(self.pattern, "unclosed '{'"));
        }
        Ok(tokens)
    }

    fn parse_alternation(&mut self, depth: usize) -> Result<Token> {
        self.pos += 1; // '{'
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(self.parse_sequence(depth + 1)?);
            match self.peek(0) {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(Token::Alternation(alternatives));
                }
                _ => return Err(Error::invalid_pattern(self.pattern, "unclosed '{'")),
            }
        }
    }

    fn parse_class(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1; // '['

        let negated = matches!(self.peek(0), Some('!') | Some('^'));
        if negated {
            self.pos += 1;
        }

        let mut members: Vec<char> = Vec::new();
        let mut ranges: Vec<usize> = Vec::new();
        let mut first = true;

        loop {
            let ch = self.peek(0).ok_or_else(|| {
                Error::invalid_pattern(
                    self.pattern,
                    format!("unclosed '[' at position {}", start),
                )
            })?;

            match ch {
                ']' if !first => {
                    self.pos += 1;
                    break;
                }
                '\\' => {
                    let escaped = self.peek(1).ok_or_else(|| {
                        Error::invalid_pattern(self.pattern, "dangling escape in character class")
                    })?;
                    members.push(escaped);
                    self.pos += 2;
                }
                '-' if !first && self.peek(1).is_some_and(|c| c != ']') => {
                    ranges.push(members.len());
                    self.pos += 1;
                }
                c => {
                    members.push(c);
                    self.pos += 1;
                }
            }
            first = false;
        }

        if members.is_empty() {
            return Err(Error::invalid_pattern(self.pattern, "empty character class"));
        }

        // A range marker sits between members[i - 1] and members[i].
        let mut body = String::new();
        for (i, member) in members.iter().enumerate() {
            if ranges.contains(&i) {
                body.push('-');
            }
            body.push_str(&regex::escape(&member.to_string()));
        }

        Ok(Token::Class { negated, body })
    }
}

fn emit(tokens: &[Token], out: &mut String) {
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Recursive => {
                if tokens.get(i + 1) == Some(&Token::Separator) {
                    out.push_str("(?:[^/]+/)*");
                    i += 1;
                } else {
                    out.push_str(".*");
                }
            }
            Token::Separator => {
                if tokens.get(i + 1) == Some(&Token::Recursive) && i + 2 == tokens.len() {
                    out.push_str("(?:/.*)?");
                    i += 1;
                } else {
                    out.push('/');
                }
            }
            Token::Literal(c) => out.push_str(&regex::escape(&c.to_string())),
            Token::AnyRun => out.push_str("[^/]*"),
            Token::AnyChar => out.push_str("[^/]"),
            Token::Class { negated, body } => {
                out.push('[');
                if *negated {
                    out.push_str("^/");
                }
                out.push_str(body);
                out.push(']');
            }
            Token::Alternation(alternatives) => {
                out.push_str("(?:");
                for (n, alternative) in alternatives.iter().enumerate() {
                    if n > 0 {
                        out.push('|');
                    }
                    emit(alternative, out);
                }
                out.push(')');
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_paths() -> Vec<&'static str> {
        vec![
            ".commonrepo.yaml",
            "LICENSE",
            "README.md",
            "go.mod",
            "go.sum",
            "test/sentinel",
            "testdata/fixtures/schema.yaml",
            "testdata/fixtures/local/append.yaml",
            "testdata/fixtures/local/deep.yaml",
            "testdata/fixtures/local/single.yml",
        ]
    }

    #[test]
    fn test_star_stays_in_top_level() {
        assert_eq!(
            match_paths("go.*", repo_paths()).unwrap(),
            vec!["go.mod", "go.sum"]
        );
    }

    #[test]
    fn test_exact_filename() {
        assert_eq!(
            match_paths("README.md", repo_paths()).unwrap(),
            vec!["README.md"]
        );
    }

    #[test]
    fn test_star_segments() {
        assert_eq!(
            match_paths("*/*/schema.yaml", repo_paths()).unwrap(),
            vec!["testdata/fixtures/schema.yaml"]
        );
        assert_eq!(
            match_paths("*/*/*/deep.yaml", repo_paths()).unwrap(),
            vec!["testdata/fixtures/local/deep.yaml"]
        );
    }

    #[test]
    fn test_recursive_prefix() {
        assert_eq!(
            match_paths("**/schema.yaml", repo_paths()).unwrap(),
            vec!["testdata/fixtures/schema.yaml"]
        );
        assert_eq!(
            match_paths("**/LICENSE", repo_paths()).unwrap(),
            vec!["LICENSE"]
        );
    }

    #[test]
    fn test_recursive_middle() {
        let paths = ["a/x", "a/b/x", "a/b/c/x", "b/x", "a/y"];
        assert_eq!(
            match_paths("a/**/x", paths).unwrap(),
            vec!["a/b/c/x", "a/b/x", "a/x"]
        );
    }

    #[test]
    fn test_recursive_suffix() {
        let paths = ["a", "a/x", "a/b/x", "ab/x"];
        assert_eq!(
            match_paths("a/**", paths).unwrap(),
            vec!["a", "a/b/x", "a/x"]
        );
    }

    #[test]
    fn test_bare_recursive_matches_everything() {
        let all = repo_paths();
        let mut expected: Vec<String> = all.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(match_paths("**", all).unwrap(), expected);
    }

    #[test]
    fn test_segment_local_wildcards() {
        assert_eq!(
            match_paths("testdata/fixtures/local/*d*.yaml", repo_paths()).unwrap(),
            vec![
                "testdata/fixtures/local/append.yaml",
                "testdata/fixtures/local/deep.yaml"
            ]
        );
    }

    #[test]
    fn test_double_star_inside_segment_is_single_star() {
        let paths = ["renamed-README.md", "renamed-docs/guide.md", "README.md"];
        assert_eq!(
            match_paths("renamed-**", paths).unwrap(),
            vec!["renamed-README.md"]
        );
    }

    #[test]
    fn test_case_sensitive() {
        assert!(match_paths("readme.md", repo_paths()).unwrap().is_empty());
    }

    #[test]
    fn test_question_mark() {
        let paths = ["go.mod", "go.sum", "go.work"];
        assert_eq!(match_paths("go.???", paths).unwrap(), vec!["go.mod", "go.sum"]);
        assert!(!Glob::new("a?b").unwrap().is_match("a/b"));
    }

    #[test]
    fn test_character_classes() {
        let glob = Glob::new("file[0-9].txt").unwrap();
        assert!(glob.is_match("file3.txt"));
        assert!(!glob.is_match("filex.txt"));

        let negated = Glob::new("a[!bc]d").unwrap();
        assert!(negated.is_match("axd"));
        assert!(!negated.is_match("abd"));
        assert!(!negated.is_match("a/d"));

        let literal_bracket = Glob::new("[]]").unwrap();
        assert!(literal_bracket.is_match("]"));
    }

    #[test]
    fn test_alternation() {
        let glob = Glob::new(".commonrepo.{yaml,yml}").unwrap();
        assert!(glob.is_match(".commonrepo.yaml"));
        assert!(glob.is_match(".commonrepo.yml"));
        assert!(!glob.is_match(".commonrepo.json"));

        let nested = Glob::new("{src/{a,b},docs}/*.md").unwrap();
        assert!(nested.is_match("src/a/x.md"));
        assert!(nested.is_match("docs/x.md"));
        assert!(!nested.is_match("src/c/x.md"));
    }

    #[test]
    fn test_escapes() {
        let glob = Glob::new(r"weird\*name").unwrap();
        assert!(glob.is_match("weird*name"));
        assert!(!glob.is_match("weirdXname"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let glob = Glob::new("a+b(c).md").unwrap();
        assert!(glob.is_match("a+b(c).md"));
        assert!(!glob.is_match("aab(c).md"));
    }

    #[test]
    fn test_invalid_patterns() {
        for pattern in ["[abc", "{a,b", r"trailing\", "[]", "[z-a]"] {
            let err = Glob::new(pattern).unwrap_err();
            assert!(
                matches!(err, Error::InvalidPattern { .. }),
                "expected InvalidPattern for {:?}, got {:?}",
                pattern,
                err
            );
        }
    }

    #[test]
    fn test_order_independent_of_input() {
        let forward = match_paths("**/*.yaml", repo_paths()).unwrap();
        let mut reversed_input = repo_paths();
        reversed_input.reverse();
        let backward = match_paths("**/*.yaml", reversed_input).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_display_and_from_str() {
        let glob: Glob = "src/**/*.rs".parse().unwrap();
        assert_eq!(glob.to_string(), "src/**/*.rs");
        assert_eq!(glob.as_str(), "src/**/*.rs");
    }
}
