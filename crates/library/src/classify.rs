//! Identifier extraction.
//!
//! A file's Subject and Session are derived from its full path with a regex
//! *search*. The value taken from a match is, in order of preference:
//!
//! 1. the first capture group that participated and is non-empty,
//! 2. the whole match, if it is non-empty,
//! 3. the fallback.
//!
//! This lets one pattern describe several naming conventions through
//! alternation (`sub-(\w+)|/(M\d+)/`) without the caller needing to know which
//! branch fired.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use ndos_config::{Config, Fallback, Patterns};
use ndos_storage::validate_segment;
use regex::Regex;
use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use tracing::{debug, warn};

/// Extracts an identifier from `haystack` using `pattern`, returning
/// `fallback` when nothing (or only an empty string) matches.
///
/// ```
/// use ndos_library::extract;
/// use regex::Regex;
///
/// let pattern = Regex::new(r"sub-(\w+)|/(M\d+)/").unwrap();
/// assert_eq!(extract(&pattern, "data/sub-R7/scan.csv", "unknown"), "R7");
/// assert_eq!(extract(&pattern, "data/M001/scan.csv", "unknown"), "M001");
/// assert_eq!(extract(&pattern, "data/other/scan.csv", "unknown"), "unknown");
/// ```
pub fn extract<'a>(pattern: &Regex, haystack: &'a str, fallback: &'a str) -> &'a str {
    let Some(captures) = pattern.captures(haystack) else {
        return fallback;
    };
    captures
        .iter()
        .skip(1)
        .flatten()
        .map(|group| group.as_str())
        .find(|group| !group.is_empty())
        .or_else(|| captures.get(0).map(|whole| whole.as_str()).filter(|whole| !whole.is_empty()))
        .unwrap_or(fallback)
}

/// The (Subject, Session) pair a file is filed under. It is the grouping key
/// for both the moved files and the per-session archive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Placement {
    pub subject: String,
    pub session: String,
}
impl Placement {
    pub fn new(subject: impl Into<String>, session: impl Into<String>) -> Self {
        Self { subject: subject.into(), session: session.into() }
    }
}
impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.subject, self.session)
    }
}

/// Compiled subject and session patterns, plus the identifiers to fall back
/// on. Build once per run and share across files.
#[derive(Clone, Debug)]
pub struct Classifier {
    subject: Regex,
    session: Regex,
    fallback: Fallback,
}
impl Classifier {
    /// Compiles both patterns and checks that the fallbacks are usable as
    /// directory names.
    pub fn new(patterns: &Patterns, fallback: &Fallback) -> Result<Self> {
        let subject = Regex::new(&patterns.subject)
            .or_raise(|| ErrorKind::Pattern { field: "subject", pattern: patterns.subject.clone() })?;
        let session = Regex::new(&patterns.session)
            .or_raise(|| ErrorKind::Pattern { field: "session", pattern: patterns.session.clone() })?;
        for id in [&fallback.subject, &fallback.session] {
            validate_segment(id).or_raise(|| ErrorKind::Fallback(id.clone()))?;
        }
        Ok(Self { subject, session, fallback: fallback.clone() })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.patterns, &config.fallback)
    }

    /// Derives the [`Placement`] for a file from its full path.
    ///
    /// Path separators are normalized to `/` before matching so patterns are
    /// portable. An extracted value that isn't a single plain path segment
    /// (say a custom pattern captured `a/b`, or `..`) is replaced by the
    /// fallback.
    pub fn classify(&self, path: &Path) -> Placement {
        let haystack = haystack(path);
        let subject = Self::identifier(&self.subject, &haystack, &self.fallback.subject, "subject");
        let session = Self::identifier(&self.session, &haystack, &self.fallback.session, "session");
        debug!(path = %haystack, subject, session, "classified");
        Placement::new(subject, session)
    }

    fn identifier<'a>(pattern: &Regex, haystack: &'a str, fallback: &'a str, field: &'static str) -> &'a str {
        let id = extract(pattern, haystack, fallback);
        match validate_segment(id) {
            Ok(id) => id,
            Err(_) => {
                warn!(path = %haystack, field, id, fallback, "extracted identifier is not a plain directory name");
                fallback
            },
        }
    }
}
fn haystack(path: &Path) -> Cow<'_, str> {
    let lossy = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        lossy
    } else {
        Cow::Owned(lossy.replace(std::path::MAIN_SEPARATOR, "/"))
    }
}
