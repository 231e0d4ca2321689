use anyhow::{Context, Result};
use glob::Pattern;
use log::debug;

use crate::modimpl::filecandidate::FileCandidate;

pub const DEFAULT_DOCUMENT_PATTERN: &str = "*.pdf";

/// Decides which listing entries are documents worth transferring.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    patterns: Vec<Pattern>,
}

impl DocumentFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled_patterns = Vec::with_capacity(patterns.len());

        for pattern_str in patterns {
            let pattern_str = pattern_str.as_ref().trim();
            if pattern_str.is_empty() {
                continue;
            }
            let pattern = Pattern::new(pattern_str)
                .with_context(|| format!("Invalid glob pattern: {}", pattern_str))?;
            compiled_patterns.push(pattern);
        }

        if compiled_patterns.is_empty() {
            anyhow::bail!("at least one document pattern is required");
        }

        Ok(Self {
            patterns: compiled_patterns,
        })
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    /// Plain files whose name matches one of the patterns. Directories and
    /// links are never eligible.
    pub fn is_eligible(&self, candidate: &FileCandidate) -> bool {
        candidate.is_file() && self.matches_name(&candidate.name)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        let matched = self.patterns.iter().find(|pattern| pattern.matches(name));
        match matched {
            Some(pattern) => {
                debug!("Pattern '{}' matches file '{}'", pattern.as_str(), name);
                true
            }
            None => false,
        }
    }
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            patterns: vec![
                Pattern::new(DEFAULT_DOCUMENT_PATTERN).expect("static pattern is valid")
            ],
        }
    }
}
