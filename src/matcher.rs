//! Line match predicates
//!
//! A predicate classifies a single line. The substring guard matches a line
//! containing every one of its substrings anywhere in the line; it makes no
//! claim that the line is unique in the file. The regex guard is the
//! structural alternative (e.g. `^\s*<th>KDV %</th>$`).

use crate::error::PatchError;
use crate::lines::content_of;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable description of a predicate, as written in recipes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherSpec {
    /// Line must contain all of these substrings
    Contains(Vec<String>),
    /// Line (without its terminator) must match this regex
    Regex(String),
}

impl fmt::Display for MatcherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatcherSpec::Contains(parts) => {
                let quoted: Vec<String> = parts.iter().map(|p| format!("{:?}", p)).collect();
                write!(f, "contains {}", quoted.join(" + "))
            }
            MatcherSpec::Regex(pattern) => write!(f, "matches /{}/", pattern),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LineMatcher {
    Contains(Vec<String>),
    Regex(Regex),
}

impl LineMatcher {
    pub fn compile(spec: &MatcherSpec) -> Result<Self, PatchError> {
        match spec {
            MatcherSpec::Contains(parts) => {
                if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
                    return Err(PatchError::EmptyGuard);
                }
                Ok(LineMatcher::Contains(parts.clone()))
            }
            MatcherSpec::Regex(pattern) => Regex::new(pattern)
                .map(LineMatcher::Regex)
                .map_err(|e| PatchError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }),
        }
    }

    /// Shorthand for the common two-substring guard
    pub fn contains_all<I, S>(parts: I) -> Result<Self, PatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::compile(&MatcherSpec::Contains(
            parts.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn is_match(&self, line: &str) -> bool {
        let content = content_of(line);
        match self {
            LineMatcher::Contains(parts) => parts.iter().all(|p| content.contains(p.as_str())),
            LineMatcher::Regex(re) => re.is_match(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_requires_every_substring() {
        let m = LineMatcher::contains_all(["<th", "KDV %"]).unwrap();
        assert!(m.is_match("    <th style={{ width: '70px' }}>KDV %</th>\n"));
        assert!(!m.is_match("    <th>KDV TUTAR</th>\n"));
        assert!(!m.is_match("    <td>KDV %</td>\n"));
    }

    #[test]
    fn test_contains_is_order_independent() {
        let m = LineMatcher::contains_all(["X", "TARGET"]).unwrap();
        assert!(m.is_match("TARGET X\n"));
    }

    #[test]
    fn test_empty_guard_rejected() {
        assert_eq!(
            LineMatcher::contains_all(Vec::<String>::new()).unwrap_err(),
            PatchError::EmptyGuard
        );
        assert_eq!(
            LineMatcher::contains_all(["TARGET", ""]).unwrap_err(),
            PatchError::EmptyGuard
        );
    }

    #[test]
    fn test_regex_anchors_ignore_terminator() {
        let m = LineMatcher::compile(&MatcherSpec::Regex(r"^\s*</tbody>$".to_string())).unwrap();
        assert!(m.is_match("        </tbody>\r\n"));
        assert!(!m.is_match("        </tbody> {/* end */}\n"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = LineMatcher::compile(&MatcherSpec::Regex("(unclosed".to_string())).unwrap_err();
        assert!(matches!(err, PatchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_matcher_spec_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            marker: MatcherSpec,
        }

        let w: Wrapper = toml::from_str(r#"marker = { contains = ["<tbody>"] }"#).unwrap();
        assert_eq!(w.marker, MatcherSpec::Contains(vec!["<tbody>".to_string()]));

        let w: Wrapper = toml::from_str(r#"marker = { regex = "^end$" }"#).unwrap();
        assert_eq!(w.marker, MatcherSpec::Regex("^end$".to_string()));
    }

    #[test]
    fn test_matcher_spec_display() {
        let spec = MatcherSpec::Contains(vec!["TARGET".into(), "X".into()]);
        assert_eq!(spec.to_string(), r#"contains "TARGET" + "X""#);
    }
}
