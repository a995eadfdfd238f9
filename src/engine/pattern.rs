// SPDX-License-Identifier: Apache-2.0

//! Glob filters for connection and table listings.

use regex::Regex;

use federa_core::{EngineError, EngineResult};

/// Anchored, case-sensitive name glob: `*` matches any run, `?` one character.
#[derive(Debug, Clone)]
pub struct NamePattern {
    glob: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(glob: &str) -> EngineResult<Self> {
        let mut source = String::with_capacity(glob.len() + 8);
        source.push('^');
        let mut literal = [0u8; 4];
        for ch in glob.chars() {
            match ch {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut literal))),
            }
        }
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| EngineError::validation(format!("Invalid name pattern '{glob}': {e}")))?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

/// Keeps the names accepted by `filter` (all of them when there is none).
pub fn filter_names(names: Vec<String>, filter: Option<&NamePattern>) -> Vec<String> {
    match filter {
        Some(pattern) => names.into_iter().filter(|n| pattern.matches(n)).collect(),
        None => names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        let p = NamePattern::new("ord*").unwrap();
        assert!(p.matches("orders"));
        assert!(p.matches("ord"));
        assert!(!p.matches("my_orders"));

        let p = NamePattern::new("t?").unwrap();
        assert!(p.matches("t1"));
        assert!(!p.matches("t12"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let p = NamePattern::new("a.b+(c)").unwrap();
        assert!(p.matches("a.b+(c)"));
        assert!(!p.matches("axbb(c)"));
    }

    #[test]
    fn filter_names_without_pattern_keeps_all() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(filter_names(names.clone(), None), names);

        let p = NamePattern::new("b").unwrap();
        assert_eq!(filter_names(names, Some(&p)), vec!["b".to_string()]);
    }
}
