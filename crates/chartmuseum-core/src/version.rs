//! Ordinal version ordering
//!
//! Chart versions in the wild are not always valid semver (`v1.2`, `2.0-rc1`,
//! `1.10.0-build.7`), so ordering uses a tolerant rule instead: every run of
//! ASCII digits is compared as a whole number, everything else byte by byte.
//! `10.0.0` sorts after `9.3.4` and `1.99` before `2.0`.

use regex::Regex;
use std::cmp::Ordering;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Digit run with leading zeros removed (at least one digit kept)
    Number(&'a [u8]),
    Byte(u8),
}

impl Ord for Token<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Token::Number(_), Token::Byte(_)) => Ordering::Less,
            (Token::Byte(_), Token::Number(_)) => Ordering::Greater,
            (Token::Byte(a), Token::Byte(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Token<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Walks the raw bytes, so multi-byte characters compare byte by byte
struct Tokens<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let (&first, tail) = self.rest.split_first()?;
        if !first.is_ascii_digit() {
            self.rest = tail;
            return Some(Token::Byte(first));
        }

        let end = self
            .rest
            .iter()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;

        let zeros = run.iter().take_while(|&&b| b == b'0').count();
        let number = if zeros == run.len() { &run[run.len() - 1..] } else { &run[zeros..] };
        Some(Token::Number(number))
    }
}

fn tokens(version: &str) -> Tokens<'_> {
    Tokens {
        rest: version.as_bytes(),
    }
}

/// Compare two version strings with digit runs taken as numbers
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    tokens(a).cmp(tokens(b))
}

/// Wrapper giving a version string ordinal ordering
#[derive(Debug, Clone, Copy)]
pub struct OrdinalVersion<'a>(pub &'a str);

impl PartialEq for OrdinalVersion<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrdinalVersion<'_> {}

impl PartialOrd for OrdinalVersion<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdinalVersion<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(self.0, other.0)
    }
}

/// Compile a caller-supplied version filter
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CoreError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Highest version matching `pattern`, first occurrence winning ties
pub fn latest_matching<'a, I>(versions: I, pattern: &Regex) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter(|v| pattern.is_match(v))
        .fold(None, |best, candidate| match best {
            Some(current) if compare_versions(current, candidate) != Ordering::Less => {
                Some(current)
            }
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_runs_compare_by_magnitude() {
        assert_eq!(compare_versions("10.0.0", "9.3.4"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "1.99"), Ordering::Greater);
        assert_eq!(compare_versions("1.2.10", "1.2.9"), Ordering::Greater);
        assert_eq!(compare_versions("8.8.19", "9.3.4"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros_are_ignored() {
        assert_eq!(compare_versions("1.05", "1.5"), Ordering::Equal);
        assert_eq!(compare_versions("1.00", "1.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.010", "1.9"), Ordering::Greater);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0-rc1"), Ordering::Less);
        assert_eq!(compare_versions("", "0"), Ordering::Less);
    }

    #[test]
    fn test_non_ascii_suffixes() {
        assert_eq!(compare_versions("1.0.0-é", "1.0.0-a"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0-é", "1.0.0-é"), Ordering::Equal);
        assert_eq!(compare_versions("2.0-ß", "10.0-ß"), Ordering::Less);
        assert_eq!(compare_versions("é", ""), Ordering::Greater);

        let versions = ["1.0.0-é", "1.0.0-日本", "0.9"];
        let any = compile_pattern(".").unwrap();
        assert_eq!(latest_matching(versions, &any), Some("1.0.0-日本"));
    }

    #[test]
    fn test_component_wise_greater_always_sorts_after() {
        let pairs = [
            ("10.0.0", "9.3.4"),
            ("2.0", "1.99"),
            ("100.200.300", "99.199.299"),
            ("3.10", "2.9"),
            ("17.3.1", "16.2.0"),
        ];
        for (a, b) in pairs {
            assert!(OrdinalVersion(a) > OrdinalVersion(b), "{a} should sort after {b}");
            assert!(OrdinalVersion(b) < OrdinalVersion(a), "{b} should sort before {a}");
        }
    }

    #[test]
    fn test_sort_with_wrapper() {
        let mut versions = vec!["9.3.4", "10.0.0", "8.8.19", "10.0.0-rc1", "1.99"];
        versions.sort_by_key(|v| OrdinalVersion(*v));
        assert_eq!(versions, ["1.99", "8.8.19", "9.3.4", "10.0.0", "10.0.0-rc1"]);
    }

    #[test]
    fn test_latest_matching() {
        let versions = ["8.8.19", "9.3.4", "10.0.0", "9.10.1"];
        let nine = compile_pattern(r"^9\.").unwrap();
        assert_eq!(latest_matching(versions, &nine), Some("9.10.1"));

        let any = compile_pattern(".*").unwrap();
        assert_eq!(latest_matching(versions, &any), Some("10.0.0"));

        let none = compile_pattern(r"^11\.").unwrap();
        assert_eq!(latest_matching(versions, &none), None);
    }

    #[test]
    fn test_latest_matching_keeps_first_on_tie() {
        let versions = ["1.05", "1.5"];
        let any = compile_pattern(".").unwrap();
        assert_eq!(latest_matching(versions, &any), Some("1.05"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = compile_pattern("([").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPattern { .. }));
    }
}
