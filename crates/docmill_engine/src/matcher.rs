use regex::Regex;
use relative_path::RelativePath;
use tracing::debug;

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

/// Compiled include/exclude pattern sets evaluated against relative paths.
///
/// A path is accepted only if it matches at least one include pattern and
/// none of the exclude patterns; exclude always wins over include. Matching
/// happens on the forward-slash relative form, so patterns behave the same
/// on every platform.
#[derive(Debug)]
pub struct PathMatcher {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl PathMatcher {
    /// Compile the pattern lists. An invalid pattern is a pre-flight
    /// configuration failure.
    pub fn new(includes: &[String], excludes: &[String]) -> DocmillResult<Self> {
        debug!(
            include_count = includes.len(),
            exclude_count = excludes.len(),
            "compiling path patterns"
        );
        Ok(Self {
            includes: compile(includes, "include")?,
            excludes: compile(excludes, "exclude")?,
        })
    }

    /// Returns true if the relative path should be submitted to extraction.
    pub fn is_match(&self, relative: &RelativePath) -> bool {
        let candidate = relative.as_str();
        if !self.includes.iter().any(|re| re.is_match(candidate)) {
            return false;
        }
        !self.excludes.iter().any(|re| re.is_match(candidate))
    }
}

fn compile(patterns: &[String], role: &str) -> DocmillResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|error| {
                Box::new(DocmillError::new(ErrorKind::Config {
                    message: format!("invalid {} pattern '{}': {}", role, pattern, error),
                }))
            })
        })
        .collect()
}
