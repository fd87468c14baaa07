//! TOML-based repository configuration.
//!
//! Each repository keeps its settings in `.arbor/config.toml`. Every section
//! has defaults, so an empty file is a valid configuration. The commit
//! author may be overridden from the environment via
//! [`ArborConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::merge::ConflictMarkers;
use crate::merge::conflict::{DEFAULT_END, DEFAULT_SEPARATOR, DEFAULT_START};

/// Name of the metadata directory at the repository root.
pub const METADATA_DIR: &str = ".arbor";

/// Name of the config file inside [`METADATA_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding `author.name`.
pub const AUTHOR_NAME_ENV: &str = "ARBOR_AUTHOR_NAME";

/// Environment variable overriding `author.email`.
pub const AUTHOR_EMAIL_ENV: &str = "ARBOR_AUTHOR_EMAIL";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level repository configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArborConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Identity recorded on new commits.
    #[serde(default)]
    pub author: AuthorConfig,

    /// Conflict marker strings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Object store backend.
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Branch HEAD points at after `init`. Default `main`.
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".into()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
        }
    }
}

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorConfig {
    #[serde(default = "default_author_name")]
    pub name: String,

    #[serde(default)]
    pub email: String,
}

fn default_author_name() -> String {
    "arbor".into()
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: default_author_name(),
            email: String::new(),
        }
    }
}

impl AuthorConfig {
    /// `name <email>`, or just the name when no email is configured.
    pub fn signature(&self) -> String {
        if self.email.is_empty() {
            self.name.clone()
        } else {
            format!("{} <{}>", self.name, self.email)
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_marker_start")]
    pub marker_start: String,

    #[serde(default = "default_marker_separator")]
    pub marker_separator: String,

    #[serde(default = "default_marker_end")]
    pub marker_end: String,
}

fn default_marker_start() -> String {
    DEFAULT_START.into()
}
fn default_marker_separator() -> String {
    DEFAULT_SEPARATOR.into()
}
fn default_marker_end() -> String {
    DEFAULT_END.into()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            marker_start: default_marker_start(),
            marker_separator: default_marker_separator(),
            marker_end: default_marker_end(),
        }
    }
}

impl MergeConfig {
    /// Marker lines for a merge of commit `id_one` with commit `id_two`.
    pub fn markers(&self, id_one: &str, id_two: &str) -> ConflictMarkers {
        ConflictMarkers::with_prefixes(
            &self.marker_start,
            &self.marker_separator,
            &self.marker_end,
            id_one,
            id_two,
        )
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Which object store backend a repository uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite database under the metadata directory.
    #[default]
    Sqlite,
    /// Process-local; nothing survives exit.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database path, relative to the metadata directory. Default `objects.db`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("objects.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// Absolute database location for a repository rooted at `repo_root`.
    pub fn database_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(METADATA_DIR).join(&self.path)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl ArborConfig {
    /// Location of the config file for a repository rooted at `repo_root`.
    pub fn path_for(repo_root: &Path) -> PathBuf {
        repo_root.join(METADATA_DIR).join(CONFIG_FILE)
    }

    /// Load an [`ArborConfig`] from a TOML file at the given path.
    ///
    /// This does **not** apply environment overrides; call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: ArborConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Apply `ARBOR_AUTHOR_NAME` and `ARBOR_AUTHOR_EMAIL` when set and
    /// non-empty.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(name) = read_env(AUTHOR_NAME_ENV) {
            debug!(env_name = AUTHOR_NAME_ENV, "author name overridden from environment");
            self.author.name = name;
        }
        if let Some(email) = read_env(AUTHOR_EMAIL_ENV) {
            debug!(env_name = AUTHOR_EMAIL_ENV, "author email overridden from environment");
            self.author.email = email;
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.default_branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository.default_branch".into(),
                detail: "default branch must not be empty".into(),
            });
        }
        if self.author.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "author.name".into(),
                detail: "author name must not be empty".into(),
            });
        }

        let markers = [
            ("merge.marker_start", &self.merge.marker_start),
            ("merge.marker_separator", &self.merge.marker_separator),
            ("merge.marker_end", &self.merge.marker_end),
        ];
        for (field, value) in markers {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "conflict marker must not be empty".into(),
                });
            }
        }
        if self.merge.marker_start == self.merge.marker_separator
            || self.merge.marker_start == self.merge.marker_end
            || self.merge.marker_separator == self.merge.marker_end
        {
            return Err(ConfigError::InvalidValue {
                field: "merge".into(),
                detail: "conflict markers must be distinct".into(),
            });
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.path".into(),
                detail: "store path must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, as written by `arbor init`.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Value of `env_name` if set and non-empty. A set-but-empty variable is
/// ignored with a warning.
fn read_env(env_name: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => Some(val),
        Ok(_) => {
            warn!(env_name, "env var is set but empty, ignoring");
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[repository]
default_branch = "trunk"

[author]
name = "Jane Doe"
email = "jane@example.com"

[merge]
marker_start = "<<<<<<<"
marker_separator = "======="
marker_end = ">>>>>>>"

[store]
backend = "memory"
path = "data/objects.db"

[logging]
log_level = "debug"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: ArborConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.repository.default_branch, "trunk");
        assert_eq!(config.author.signature(), "Jane Doe <jane@example.com>");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.logging.log_level, "debug");
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: ArborConfig = toml::from_str("").unwrap();
        assert_eq!(config, ArborConfig::default());
        assert_eq!(config.repository.default_branch, "main");
        assert_eq!(config.merge.marker_start, "<<<<<");
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("objects.db"));
        assert_eq!(config.logging.log_level, "warn");
        assert_eq!(config.author.signature(), "arbor");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = ArborConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.merge.marker_end, ">>>>>>>");
    }

    #[test]
    fn test_file_not_found() {
        let result = ArborConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[repository\ndefault_branch = ").unwrap();
        let result = ArborConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_empty_branch() {
        let mut config = ArborConfig::default();
        config.repository.default_branch = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "repository.default_branch"
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_markers() {
        let mut config = ArborConfig::default();
        config.merge.marker_end = config.merge.marker_start.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "merge"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_marker() {
        let mut config = ArborConfig::default();
        config.merge.marker_separator = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "merge.marker_separator"
        ));
    }

    #[test]
    fn test_markers_use_configured_prefixes() {
        let config: ArborConfig = toml::from_str(sample_toml()).unwrap();
        let markers = config.merge.markers("aaa", "bbb");
        assert_eq!(markers.start, "<<<<<<< aaa\n");
        assert_eq!(markers.separator, "=======\n");
        assert_eq!(markers.end, ">>>>>>> bbb\n");
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var(AUTHOR_NAME_ENV, "Env Author");
        std::env::set_var(AUTHOR_EMAIL_ENV, "env@example.com");

        let mut config = ArborConfig::default();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.author.signature(), "Env Author <env@example.com>");

        // Clean up
        std::env::remove_var(AUTHOR_NAME_ENV);
        std::env::remove_var(AUTHOR_EMAIL_ENV);
    }

    #[test]
    fn test_toml_string_round_trip() {
        let config: ArborConfig = toml::from_str(sample_toml()).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let back: ArborConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_database_path() {
        let config = ArborConfig::default();
        let path = config.store.database_path(Path::new("/work/repo"));
        assert_eq!(path, PathBuf::from("/work/repo/.arbor/objects.db"));
    }
}
