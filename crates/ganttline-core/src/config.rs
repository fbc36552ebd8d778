use anyhow::{Context, Result, bail};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::history::{MAX_PAGE_LIMIT, SnapshotPolicy};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ganttline.toml";

/// Environment variable overriding `database.path`.
pub const DB_ENV_VAR: &str = "GANTTLINE_DB";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_event_threshold")]
    pub snapshot_event_threshold: u64,
    #[serde(default = "default_max_age_secs")]
    pub snapshot_max_age_secs: i64,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            snapshot_event_threshold: default_event_threshold(),
            snapshot_max_age_secs: default_max_age_secs(),
            page_limit: default_page_limit(),
        }
    }
}

impl HistoryConfig {
    /// Check values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if `snapshot_max_age_secs` is negative or too large
    /// to represent as a duration.
    pub fn validate(&self) -> Result<()> {
        let secs = self.snapshot_max_age_secs;
        if secs < 0 {
            bail!("history.snapshot_max_age_secs must not be negative, got {secs}");
        }
        if Duration::try_seconds(secs).is_none() {
            bail!("history.snapshot_max_age_secs is out of range, got {secs}");
        }
        Ok(())
    }

    /// Snapshot policy for these settings. An out-of-range age saturates to
    /// the longest representable duration.
    #[must_use]
    pub fn policy(&self) -> SnapshotPolicy {
        SnapshotPolicy {
            event_threshold: self.snapshot_event_threshold,
            max_age: Duration::try_seconds(self.snapshot_max_age_secs.max(0))
                .unwrap_or(Duration::MAX),
        }
    }

    /// Configured page size, clamped to `1..=MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn page_limit(&self) -> usize {
        self.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub config: Config,
    /// `None` when built-in defaults were used.
    pub source: Option<PathBuf>,
}

/// Parse a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Default per-user config location.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ganttline").join("config.toml"))
}

/// Resolve the effective config.
///
/// Lookup order: `explicit` (must exist), `ganttline.toml` in `cwd`, the
/// per-user config file, built-in defaults. Afterwards `db_override`, then
/// `GANTTLINE_DB`, replace `database.path`.
///
/// # Errors
///
/// Returns an error if a selected file cannot be read or parsed, or holds
/// values rejected by [`HistoryConfig::validate`].
pub fn resolve_config(
    explicit: Option<&Path>,
    cwd: &Path,
    db_override: Option<&Path>,
) -> Result<ResolvedConfig> {
    resolve_with(
        explicit,
        cwd,
        user_config_path(),
        db_override,
        env::var_os(DB_ENV_VAR).map(PathBuf::from),
    )
}

fn resolve_with(
    explicit: Option<&Path>,
    cwd: &Path,
    user_path: Option<PathBuf>,
    db_override: Option<&Path>,
    env_db: Option<PathBuf>,
) -> Result<ResolvedConfig> {
    let source = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => [Some(cwd.join(LOCAL_CONFIG_FILE)), user_path]
            .into_iter()
            .flatten()
            .find(|candidate| candidate.is_file()),
    };

    let mut config = match source {
        Some(ref path) => load_config_file(path)?,
        None => Config::default(),
    };
    if let Some(ref path) = source {
        config
            .history
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
    }

    if let Some(path) = db_override.map(Path::to_path_buf).or(env_db) {
        config.database.path = path;
    }
    tracing::debug!(source = ?source, db = %config.database.path.display(), "resolved config");

    Ok(ResolvedConfig { config, source })
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ganttline.sqlite3")
}

const fn default_event_threshold() -> u64 {
    crate::history::tracker::DEFAULT_EVENT_THRESHOLD
}

const fn default_max_age_secs() -> i64 {
    crate::history::tracker::DEFAULT_MAX_AGE_SECS
}

const fn default_page_limit() -> usize {
    MAX_PAGE_LIMIT
}
