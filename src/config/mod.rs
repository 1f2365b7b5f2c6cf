//! # Configuration Module
//!
//! Loads the TOML configuration that declares which sources are enabled and
//! how selection runs. The file lives in the user's configuration area:
//! - Linux: `~/.config/clockwork-orange/config.toml`
//! - macOS: `~/Library/Application Support/clockwork-orange/config.toml`
//! - Windows: `%APPDATA%\clockwork-orange\config.toml`
//!
//! The blacklist sits next to it as `blacklist.json` unless overridden.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

/// Application name used for the config directory
const APP_NAME: &str = "clockwork-orange";

const CONFIG_FILE_NAME: &str = "config.toml";

const BLACKLIST_FILE_NAME: &str = "blacklist.json";

/// Standard configuration directory for the application
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Standard configuration file path
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Standard blacklist path
pub fn default_blacklist_path() -> Result<PathBuf, ConfigError> {
    config_dir()
        .map(|dir| dir.join(BLACKLIST_FILE_NAME))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Write a file through a sibling temp file and rename, so a crash never
/// leaves a half-written config behind
fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_error = |reason: String| ConfigError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| write_error(e.to_string()))?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| write_error(e.to_string()))?;
    temp.write_all(contents.as_bytes())
        .map_err(|e| write_error(e.to_string()))?;
    temp.persist(path)
        .map_err(|e| write_error(e.error.to_string()))?;
    Ok(())
}

/// Which wallpaper targets a cycle fills
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Desktop only
    #[default]
    Desktop,
    /// Lock screen only
    Lockscreen,
    /// Two distinct images: desktop and lock screen
    Dual,
}

impl TargetMode {
    /// Number of distinct images a cycle must produce
    pub fn target_count(&self) -> usize {
        match self {
            Self::Desktop | Self::Lockscreen => 1,
            Self::Dual => 2,
        }
    }
}

/// Configuration-declared adapter type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A local image file or folder
    #[default]
    Local,
    /// The download folder an external network or AI plugin fills
    DownloadDir,
}

/// One configured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable id, recorded in blacklist entries
    pub id: String,

    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File or folder; download folders default to `<Pictures>/Wallpapers/<id>`
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Descend into subfolders (local folders only)
    #[serde(default)]
    pub recursive: bool,

    #[serde(default)]
    pub include_hidden: bool,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::DownloadDir => write!(f, "download_dir"),
        }
    }
}

fn default_true() -> bool {
    true
}

impl SourceConfig {
    pub fn local(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            kind: SourceKind::Local,
            enabled: true,
            path: Some(path.into()),
            recursive: false,
            include_hidden: false,
        }
    }

    pub fn download_dir(id: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            id: id.into(),
            kind: SourceKind::DownloadDir,
            enabled: true,
            path,
            recursive: false,
            include_hidden: false,
        }
    }

    /// Where this source reads images from, with `~` expanded
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        match (&self.path, self.kind) {
            (Some(path), _) => Ok(expand_home(path)),
            (None, SourceKind::DownloadDir) => dirs::picture_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
                .map(|pictures| pictures.join("Wallpapers").join(&self.id))
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "source '{}' has no path and no Pictures folder was found",
                        self.id
                    ))
                }),
            (None, SourceKind::Local) => Err(ConfigError::Invalid(format!(
                "local source '{}' needs a path",
                self.id
            ))),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Desktop, lock screen, or both
    pub mode: TargetMode,

    /// Seconds between cycles when cycling continuously
    pub default_wait: u64,

    /// Per-source enumeration timeout in seconds (0 = no timeout)
    pub enumeration_timeout_secs: u64,

    /// Overrides the blacklist location
    pub blacklist_path: Option<PathBuf>,

    /// Configured sources, `[[source]]` tables in TOML
    #[serde(rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: TargetMode::Desktop,
            default_wait: 900,
            enumeration_timeout_secs: 30,
            blacklist_path: None,
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate and write through a temp file and rename, like the blacklist
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &contents)
    }

    /// Write the commented default template
    pub fn write_template(path: &Path) -> Result<(), ConfigError> {
        write_atomic(path, &Self::generate_default_config())
    }

    /// Append a source and save. The id must not be taken.
    pub fn add_source(&mut self, source: SourceConfig, path: &Path) -> Result<(), ConfigError> {
        self.sources.push(source);
        if let Err(e) = self.save(path) {
            self.sources.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Reject configurations the registry could not build
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::Invalid("source id must not be empty".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "source id '{}' is declared more than once",
                    source.id
                )));
            }
        }
        Ok(())
    }

    /// Blacklist location, explicit or standard
    pub fn blacklist_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.blacklist_path {
            Some(path) => Ok(expand_home(path)),
            None => default_blacklist_path(),
        }
    }

    pub fn enumeration_timeout(&self) -> Option<Duration> {
        (self.enumeration_timeout_secs > 0)
            .then(|| Duration::from_secs(self.enumeration_timeout_secs))
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Commented template written by `config init`
    pub fn generate_default_config() -> String {
        r#"# clockwork-orange configuration

# desktop | lockscreen | dual
mode = "desktop"

# Seconds between wallpaper changes when cycling
default_wait = 900

# Give up on a source that takes longer than this to list its images (0 = wait forever)
enumeration_timeout_secs = 30

# blacklist_path = "~/.config/clockwork-orange/blacklist.json"

[[source]]
id = "local"
kind = "local"
path = "~/Pictures/Wallpapers"
recursive = false

# Folder filled by an external downloader plugin
# [[source]]
# id = "wallhaven"
# kind = "download_dir"
# enabled = true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_wait, 900);
    }

    #[test]
    fn default_template_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::generate_default_config()).unwrap();

        assert_eq!(config.mode, TargetMode::Desktop);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].kind, SourceKind::Local);
        assert!(config.sources[0].enabled);
    }

    #[test]
    fn parses_sources_and_mode() {
        let toml = r#"
            mode = "dual"
            enumeration_timeout_secs = 0

            [[source]]
            id = "mine"
            path = "/srv/walls"
            recursive = true

            [[source]]
            id = "wallhaven"
            kind = "download_dir"
            enabled = false
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.mode, TargetMode::Dual);
        assert_eq!(config.enumeration_timeout(), None);
        assert_eq!(config.enabled_sources().count(), 1);
        assert!(config.sources[0].recursive);
        assert_eq!(config.sources[1].kind, SourceKind::DownloadDir);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "mode = [").unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn duplicate_source_ids_are_rejected() {
        let config = AppConfig {
            sources: vec![
                SourceConfig::local("a", "/one"),
                SourceConfig::local("a", "/two"),
            ],
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = AppConfig {
            mode: TargetMode::Lockscreen,
            sources: vec![SourceConfig::download_dir("wallhaven", None)],
            ..Default::default()
        };

        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn template_is_written_and_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clockwork-orange").join("config.toml");

        AppConfig::write_template(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# clockwork-orange configuration"));
        assert_eq!(AppConfig::load(&path).unwrap().sources.len(), 1);
    }

    #[test]
    fn added_source_is_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();

        config
            .add_source(SourceConfig::local("walls", "/srv/walls"), &path)
            .unwrap();

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.sources, vec![SourceConfig::local("walls", "/srv/walls")]);
    }

    #[test]
    fn duplicate_source_is_not_added_or_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config
            .add_source(SourceConfig::local("walls", "/one"), &path)
            .unwrap();

        let result = config.add_source(SourceConfig::local("walls", "/two"), &path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(AppConfig::load(&path).unwrap().sources.len(), 1);
    }

    #[test]
    fn local_source_requires_path() {
        let mut source = SourceConfig::local("a", "/walls");
        source.path = None;

        assert!(source.resolved_path().is_err());
    }

    #[test]
    fn download_dir_has_a_default_location() {
        let source = SourceConfig::download_dir("wallhaven", None);
        if let Ok(path) = source.resolved_path() {
            assert!(path.ends_with("Wallpapers/wallhaven"));
        }
    }

    #[test]
    fn tilde_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/walls")), home.join("walls"));
        }
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn target_counts() {
        assert_eq!(TargetMode::Desktop.target_count(), 1);
        assert_eq!(TargetMode::Lockscreen.target_count(), 1);
        assert_eq!(TargetMode::Dual.target_count(), 2);
    }
}
