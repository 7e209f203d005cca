//! Configuration management for chatshelf
//!
//! This module handles loading, parsing, validating, and resolving
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatshelfError, Result};
use crate::fs_utils::lexical_absolute;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest retention period accepted, in days
pub const MAX_RETENTION_DAYS: u32 = 3650;

/// Main configuration structure for chatshelf
///
/// Holds the home directory of every supported assistant and the trash
/// settings. Paths are kept as written (`~` unexpanded) until
/// [`Config::resolve`] turns them into absolute roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Codex settings
    #[serde(default)]
    pub codex: CodexConfig,
    /// Claude Code settings
    #[serde(default = "default_claude")]
    pub claude: HomeConfig,
    /// Gemini CLI settings
    #[serde(default = "default_gemini")]
    pub gemini: HomeConfig,
    /// Trash settings
    #[serde(default)]
    pub trash: TrashConfig,
}

/// Codex configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodexConfig {
    /// Codex home directory
    #[serde(default = "default_codex_home")]
    pub home: String,

    /// Desktop app state file carrying user-assigned titles
    ///
    /// Defaults to `.codex-global-state.json` inside the Codex home.
    #[serde(default)]
    pub desktop_state_file: Option<String>,
}

fn default_codex_home() -> String {
    std::env::var("CODEX_HOME")
        .ok()
        .filter(|home| !home.trim().is_empty())
        .unwrap_or_else(|| "~/.codex".to_string())
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self {
            home: default_codex_home(),
            desktop_state_file: None,
        }
    }
}

/// Configuration for a provider that only needs its home directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeConfig {
    /// Provider home directory
    pub home: String,
}

fn default_claude() -> HomeConfig {
    HomeConfig {
        home: "~/.claude".to_string(),
    }
}

fn default_gemini() -> HomeConfig {
    HomeConfig {
        home: "~/.gemini".to_string(),
    }
}

/// Trash configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Trash directory; defaults to `trash` under the user data directory
    #[serde(default)]
    pub root: Option<String>,

    /// Days a trashed session stays restorable
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Run the expiry sweep before trash commands
    #[serde(default = "default_auto_cleanup")]
    pub auto_cleanup: bool,
}

fn default_retention_days() -> u32 {
    30
}

fn default_auto_cleanup() -> bool {
    true
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            root: None,
            retention_days: default_retention_days(),
            auto_cleanup: default_auto_cleanup(),
        }
    }
}

/// Absolute roots derived from a validated [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Codex home
    pub codex_home: PathBuf,
    /// Codex desktop state file
    pub codex_desktop_state_file: PathBuf,
    /// Claude Code home
    pub claude_home: PathBuf,
    /// Gemini CLI home
    pub gemini_home: PathBuf,
    /// Trash directory
    pub trash_root: PathBuf,
    /// Days a trashed session stays restorable
    pub retention_days: u32,
    /// Run the expiry sweep before trash commands
    pub auto_cleanup: bool,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "chatshelf", "chatshelf")
}

/// Expands a leading `~` to the user's home directory
///
/// # Errors
///
/// Returns `ChatshelfError::Config` if the path starts with `~` and no home
/// directory can be determined.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match rest {
        Some(rest) => {
            let base = BaseDirs::new().ok_or_else(|| {
                ChatshelfError::Config(format!("Cannot expand {}: no home directory", path))
            })?;
            Ok(base.home_dir().join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

impl Config {
    /// Default configuration file location
    ///
    /// `<config dir>/chatshelf/config.yaml` as reported by the platform.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file, or `None` for the default location
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: Option<&str>, cli: &crate::cli::Cli) -> Result<Self> {
        let path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                tracing::warn!("Config file not found at {}, using defaults", path.display());
                Self::default()
            }
            None => {
                tracing::warn!("No config directory available, using defaults");
                Self::default()
            }
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatshelfError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatshelfError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(home) = std::env::var("CHATSHELF_CODEX_HOME") {
            self.codex.home = home;
        }

        if let Ok(home) = std::env::var("CHATSHELF_CLAUDE_HOME") {
            self.claude.home = home;
        }

        if let Ok(home) = std::env::var("CHATSHELF_GEMINI_HOME") {
            self.gemini.home = home;
        }

        if let Ok(root) = std::env::var("CHATSHELF_TRASH_ROOT") {
            self.trash.root = Some(root);
        }

        if let Ok(days) = std::env::var("CHATSHELF_RETENTION_DAYS") {
            if let Ok(value) = days.parse() {
                self.trash.retention_days = value;
            } else {
                tracing::warn!("Invalid CHATSHELF_RETENTION_DAYS: {}", days);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(root) = &cli.trash_root {
            self.trash.root = Some(root.to_string_lossy().into_owned());
        }

        if let Some(days) = cli.retention_days {
            self.trash.retention_days = days;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if a path is blank or the retention period is out of range
    pub fn validate(&self) -> Result<()> {
        let homes = [
            ("codex.home", self.codex.home.as_str()),
            ("claude.home", self.claude.home.as_str()),
            ("gemini.home", self.gemini.home.as_str()),
        ];
        for (name, value) in homes {
            if value.trim().is_empty() {
                return Err(ChatshelfError::Config(format!("{} cannot be empty", name)).into());
            }
        }

        if let Some(file) = &self.codex.desktop_state_file {
            if file.trim().is_empty() {
                return Err(ChatshelfError::Config(
                    "codex.desktop_state_file cannot be empty".to_string(),
                )
                .into());
            }
        }

        if let Some(root) = &self.trash.root {
            if root.trim().is_empty() {
                return Err(ChatshelfError::Config("trash.root cannot be empty".to_string()).into());
            }
        }

        if self.trash.retention_days > MAX_RETENTION_DAYS {
            return Err(ChatshelfError::Config(format!(
                "trash.retention_days must be less than or equal to {}",
                MAX_RETENTION_DAYS
            ))
            .into());
        }

        Ok(())
    }

    /// Expands and absolutizes every configured path
    ///
    /// # Errors
    ///
    /// Returns `ChatshelfError::Config` if a `~` path cannot be expanded or
    /// no default trash location exists on this platform.
    pub fn resolve(&self) -> Result<ResolvedPaths> {
        let absolute = |raw: &str| -> Result<PathBuf> { Ok(lexical_absolute(&expand_home(raw)?)) };

        let codex_home = absolute(&self.codex.home)?;
        let codex_desktop_state_file = match &self.codex.desktop_state_file {
            Some(file) => absolute(file)?,
            None => codex_home.join(crate::providers::codex::DESKTOP_STATE_FILE),
        };
        let trash_root = match &self.trash.root {
            Some(root) => absolute(root)?,
            None => project_dirs()
                .map(|dirs| dirs.data_dir().join("trash"))
                .ok_or_else(|| {
                    ChatshelfError::Config("Could not determine data directory".to_string())
                })?,
        };

        Ok(ResolvedPaths {
            codex_home,
            codex_desktop_state_file,
            claude_home: absolute(&self.claude.home)?,
            gemini_home: absolute(&self.gemini.home)?,
            trash_root,
            retention_days: self.trash.retention_days,
            auto_cleanup: self.trash.auto_cleanup,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            codex: CodexConfig::default(),
            claude: default_claude(),
            gemini: default_gemini(),
            trash: TrashConfig::default(),
        }
    }
}
