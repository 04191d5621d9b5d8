//! Wildcard patterns used by table and column filters: `*` matches any run of characters and
//! `?` matches exactly one.

use crate::registry::case_key;

/// returns true when `name` matches `pattern` under the given case policy.
pub fn wildcard_match(pattern: &str, name: &str, case_sensitive: bool) -> bool {
    let p: Vec<char> = case_key(pattern, case_sensitive).chars().collect();
    let n: Vec<char> = case_key(name, case_sensitive).chars().collect();
    // Greedy match with backtracking to the most recent `*`.
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// accepts names that match any include pattern (all names when there are none) and no
/// exclude pattern.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    includes: Vec<String>,
    excludes: Vec<String>,
    case_sensitive: bool,
}

impl PatternSet {
    pub fn new(case_sensitive: bool) -> Self {
        PatternSet {
            case_sensitive,
            ..Default::default()
        }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.includes.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excludes.push(pattern.to_string());
        self
    }

    pub fn accepts(&self, name: &str) -> bool {
        let included = self.includes.is_empty()
            || self
                .includes
                .iter()
                .any(|p| wildcard_match(p, name, self.case_sensitive));
        included
            && !self
                .excludes
                .iter()
                .any(|p| wildcard_match(p, name, self.case_sensitive))
    }
}

#[test]
fn test_wildcard_match() {
    assert!(wildcard_match("*", "", false));
    assert!(wildcard_match("A*", "abc", false));
    assert!(!wildcard_match("A*", "abc", true));
    assert!(wildcard_match("a?c", "abc", true));
    assert!(!wildcard_match("a?c", "ac", true));
    assert!(wildcard_match("*_LOG", "audit_log", false));
    assert!(wildcard_match("a*b*c", "aXXbYYbZc", true));
    assert!(!wildcard_match("a*b*c", "aXXbYY", true));
    assert!(wildcard_match("exact", "EXACT", false));
}

#[test]
fn test_pattern_set() {
    let s = PatternSet::new(false).include("T*").exclude("*_TMP");
    assert!(s.accepts("table1"));
    assert!(!s.accepts("t_tmp"));
    assert!(!s.accepts("other"));
    assert!(PatternSet::new(false).accepts("anything"));
}
