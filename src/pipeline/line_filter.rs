use crate::error::{FilexError, Result};
use regex::RegexSet;

/// Line predicate applied by workers. Terms are case-insensitive substrings
/// by default; with `as_regex` they are compiled verbatim. An empty term
/// list selects every line.
pub struct LineFilter {
    set: Option<RegexSet>,
}

impl LineFilter {
    pub fn from_terms(terms: &[String], as_regex: bool) -> Result<Self> {
        if terms.is_empty() {
            return Ok(Self { set: None });
        }

        let patterns: Vec<String> = terms
            .iter()
            .map(|term| {
                if as_regex {
                    format!("(?i){}", term)
                } else {
                    format!("(?i){}", regex::escape(term))
                }
            })
            .collect();

        let set = RegexSet::new(&patterns).map_err(|e| FilexError::Pattern {
            pattern: terms.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self { set: Some(set) })
    }

    pub fn matches(&self, line: &str) -> bool {
        match &self.set {
            None => true,
            Some(set) => set.is_match(line),
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.set.is_none()
    }
}
