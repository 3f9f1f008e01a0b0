//! Property-based tests for the glob matcher.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::glob::{match_paths, Glob};
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_.-]{1,8}".prop_filter("not a dot segment", |s| s != "." && s != "..")
    }

    fn path() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join("/"))
    }

    proptest! {
        /// Property: matching twice yields identical, identically ordered results
        #[test]
        fn matching_is_idempotent(
            pattern in "[a-z*/]{1,10}",
            candidates in prop::collection::vec(path(), 0..20),
        ) {
            if let Ok(first) = match_paths(&pattern, &candidates) {
                let second = match_paths(&pattern, &candidates).unwrap();
                prop_assert_eq!(first, second);
            }
        }

        /// Property: results do not depend on candidate order and come back sorted
        #[test]
        fn results_are_sorted_and_order_independent(
            candidates in prop::collection::vec(path(), 0..20),
        ) {
            let mut reversed = candidates.clone();
            reversed.reverse();

            let forward = match_paths("**/*", &candidates).unwrap();
            let backward = match_paths("**/*", &reversed).unwrap();
            prop_assert_eq!(&forward, &backward);

            let mut sorted = forward.clone();
            sorted.sort();
            prop_assert_eq!(forward, sorted);
        }

        /// Property: `**/x` matches `x` at any depth, including the root
        #[test]
        fn recursive_wildcard_matches_any_depth(
            dirs in prop::collection::vec(segment(), 0..6),
            name in segment(),
        ) {
            let glob = Glob::new(&format!("**/{}", glob_escape(&name))).unwrap();
            let mut parts = dirs.clone();
            parts.push(name.clone());
            let candidate = parts.join("/");
            prop_assert!(glob.is_match(&candidate), "{} should match {}", glob, candidate);
        }

        /// Property: `a/**/x` matches `a/x` and `a/.../x`
        #[test]
        fn inner_recursive_wildcard_matches_any_depth(
            dirs in prop::collection::vec(segment(), 0..6),
        ) {
            let glob = Glob::new("a/**/x").unwrap();
            let mut parts = vec!["a".to_string()];
            parts.extend(dirs);
            parts.push("x".to_string());
            prop_assert!(glob.is_match(&parts.join("/")));
        }

        /// Property: a single `*` never crosses a `/`
        #[test]
        fn single_star_stays_in_one_segment(candidate in path()) {
            let glob = Glob::new("*").unwrap();
            prop_assert_eq!(glob.is_match(&candidate), !candidate.contains('/'));
        }

        /// Property: a pattern without metacharacters matches only itself
        #[test]
        fn literal_pattern_matches_only_itself(pattern in path(), other in path()) {
            let glob = Glob::new(&pattern).unwrap();
            prop_assert!(glob.is_match(&pattern));
            prop_assert_eq!(glob.is_match(&other), other == pattern);
        }

        /// Property: compiling arbitrary input never panics
        #[test]
        fn compile_never_panics(pattern in ".*") {
            let _ = Glob::new(&pattern);
        }
    }

    fn glob_escape(literal: &str) -> String {
        literal
            .chars()
            .flat_map(|c| match c {
                '*' | '?' | '[' | ']' | '{' | '}' | '\\' => vec!['\\', c],
                _ => vec![c],
            })
            .collect()
    }
}
