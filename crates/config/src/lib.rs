//! Layered configuration for ndos.
//!
//! Settings are merged from, lowest precedence first:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. the user's config file (`config.toml` in the platform config directory,
//!    see [`user_config_file`]), when enabled,
//! 3. the project's [`PROJECT_FILE`] in the destination root,
//! 4. an explicitly requested file, which must exist,
//! 5. `NDOS_`-prefixed environment variables, with `__` separating nested
//!    keys (`NDOS_ARCHIVE__COMPRESSION=bzip2`).
//!
//! Command-line flags are applied by the binary on top of the result.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ndos_compress::Compression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Name of the per-project configuration file, looked up in the project root.
pub const PROJECT_FILE: &str = "ndos.toml";
/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "NDOS_";

/// Subject: a `sub-`/`subject-`/`subject_` prefix at the start of a path
/// segment, or a whole segment such as `M12`, `R3` or `S0042`.
pub const DEFAULT_SUBJECT_PATTERN: &str = r"(?i)(?:^|/)(?:sub-|subject[-_]?)([a-z0-9]+)|/([MRS]\d+)/";
/// Session: an 8-digit date-like token (optionally followed by a short numeric
/// suffix, which is not part of the identifier), or a whole 8-digit segment.
pub const DEFAULT_SESSION_PATTERN: &str = r"(?i)(\d{8})(?:[-_]?\d{0,2})|/(\d{8})/";
pub const DEFAULT_SUBJECT_FALLBACK: &str = "unknown_subject";
pub const DEFAULT_SESSION_FALLBACK: &str = "unknown_session";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub patterns: Patterns,
    pub fallback: Fallback,
    pub archive: Archive,
}

/// Regular expressions used to derive identifiers from file paths.
///
/// Both are searched (not fully matched) against the `/`-separated path. The
/// first non-empty capture group wins, then the whole match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patterns {
    pub subject: String,
    pub session: String,
}
impl Default for Patterns {
    fn default() -> Self {
        Self { subject: DEFAULT_SUBJECT_PATTERN.to_string(), session: DEFAULT_SESSION_PATTERN.to_string() }
    }
}

/// Identifiers used when a pattern does not match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fallback {
    pub subject: String,
    pub session: String,
}
impl Default for Fallback {
    fn default() -> Self {
        Self { subject: DEFAULT_SUBJECT_FALLBACK.to_string(), session: DEFAULT_SESSION_FALLBACK.to_string() }
    }
}

/// Per-session archiving.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Archive {
    /// Run the archiving phase after restructuring.
    pub enabled: bool,
    /// Compression applied to each `<Subject>_<Session>.tar` bundle.
    pub compression: Compression,
}
impl Default for Archive {
    fn default() -> Self {
        Self { enabled: true, compression: Compression::Gzip }
    }
}

/// Location of the user-wide configuration file, if the platform has a
/// config directory for the current user.
pub fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ndos").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Assembles the configuration sources; see the [crate docs](crate) for the
/// order they are merged in.
#[derive(Clone, Debug, Default)]
pub struct Loader {
    user: bool,
    project_root: Option<PathBuf>,
    file: Option<PathBuf>,
}
impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the user-wide configuration file.
    pub fn with_user_config(mut self) -> Self {
        self.user = true;
        self
    }

    /// Include `<root>/ndos.toml`, if it exists.
    pub fn with_project(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Include an explicit file. Unlike the other files, it must exist.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if self.user
            && let Some(user) = user_config_file()
        {
            figment = figment.merge(Toml::file(user));
        }
        if let Some(root) = &self.project_root {
            figment = figment.merge(Toml::file(root.join(PROJECT_FILE)));
        }
        if let Some(file) = &self.file {
            if !file.is_file() {
                exn::bail!(ErrorKind::Missing(file.clone()));
            }
            figment = figment.merge(Toml::file(file));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    #[instrument(skip(self), fields(project = ?self.project_root, file = ?self.file))]
    pub fn load(&self) -> Result<Config> {
        let config: Config = self.figment()?.extract().or_raise(|| ErrorKind::Invalid)?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

impl Config {
    /// Shorthand for loading the user file, the project file in `root` and the
    /// environment.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        Loader::new().with_user_config().with_project(root.as_ref()).load()
    }
}
