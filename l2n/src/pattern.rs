//! Glob patterns for net-join rules.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

/// A glob pattern supporting `*` (any substring) and `?` (any single
/// character). Everything else matches literally.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct GlobPattern {
    pattern: ArcStr,
}

impl GlobPattern {
    /// Creates a pattern from the given source text.
    pub fn new(pattern: impl Into<ArcStr>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The source text of the pattern.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if `input` matches this pattern.
    pub fn matches(&self, input: &str) -> bool {
        let p: Vec<char> = self.pattern.chars().collect();
        let s: Vec<char> = input.chars().collect();

        // Iterative matcher with a single backtrack point per `*`.
        let (mut pi, mut si) = (0usize, 0usize);
        let mut star: Option<(usize, usize)> = None;
        while si < s.len() {
            if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
                pi += 1;
                si += 1;
            } else if pi < p.len() && p[pi] == '*' {
                star = Some((pi, si));
                pi += 1;
            } else if let Some((spi, ssi)) = star {
                pi = spi + 1;
                si = ssi + 1;
                star = Some((spi, ssi + 1));
            } else {
                return false;
            }
        }
        while pi < p.len() && p[pi] == '*' {
            pi += 1;
        }
        pi == p.len()
    }
}

impl From<&str> for GlobPattern {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_and_wildcards() {
        assert!(GlobPattern::new("vdd").matches("vdd"));
        assert!(!GlobPattern::new("vdd").matches("vdd1"));
        assert!(GlobPattern::new("vdd*").matches("vdd"));
        assert!(GlobPattern::new("vdd*").matches("vdd_core"));
        assert!(GlobPattern::new("*dd").matches("vdd"));
        assert!(GlobPattern::new("v?d").matches("vdd"));
        assert!(!GlobPattern::new("v?d").matches("vd"));
        assert!(GlobPattern::new("*").matches(""));
        assert!(GlobPattern::new("a*b*c").matches("axxbyyc"));
        assert!(!GlobPattern::new("a*b*c").matches("axxbyy"));
    }
}
