//! Runtime configuration, loaded once at startup.
//!
//! Precedence, lowest first: built-in defaults, the TOML file
//! (`backup.toml` unless `--config` names another), then the process
//! environment. A `.env` file is read into the environment first.
//! Whitespace-only values count as unset.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::error::BackupError;
use crate::state_machine::Cooldowns;

const DEFAULT_CONFIG_FILE: &str = "backup.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupConfig {
    /// Account used for basic auth against both systems.
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub api_token: String,

    /// Site hostname shared by the tracker and the wiki.
    #[serde(default)]
    pub hostname: String,

    /// Replaces `https://<hostname>` when set.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cooldowns: CooldownConfig,

    #[serde(default)]
    pub export: ExportOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            other => Err(format!("unknown storage backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub region: String,
    /// Root directory for the `local` backend.
    pub local_root: Option<PathBuf>,
    /// Prefix of the workflow state record.
    pub state_prefix: String,
    pub tracker_prefix: String,
    pub wiki_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: String::new(),
            region: "ap-southeast-2".to_string(),
            local_root: None,
            state_prefix: "workflow-state".to_string(),
            tracker_prefix: "tracker".to_string(),
            wiki_prefix: "wiki".to_string(),
        }
    }
}

/// Minimum hours between attempts of each phase.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub initiate_hours: u64,
    pub save_tracker_hours: u64,
    pub save_wiki_hours: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            initiate_hours: 48,
            save_tracker_hours: 3,
            save_wiki_hours: 3,
        }
    }
}

impl CooldownConfig {
    pub fn to_cooldowns(&self) -> Cooldowns {
        Cooldowns {
            initiate: hours(self.initiate_hours),
            save_tracker: hours(self.save_tracker_hours),
            save_wiki: hours(self.save_wiki_hours),
        }
    }
}

fn hours(h: u64) -> TimeDelta {
    i64::try_from(h)
        .ok()
        .and_then(TimeDelta::try_hours)
        .unwrap_or(TimeDelta::MAX)
}

/// Flags passed to the vendors when starting an export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub include_attachments: bool,
    /// Tracker only.
    pub export_to_cloud: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_attachments: true,
            export_to_cloud: true,
        }
    }
}

impl BackupConfig {
    /// Load from the optional TOML file and the environment, then validate.
    pub fn load(config_path: Option<&Path>, env_file: Option<&Path>) -> Result<Self, BackupError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    BackupError::Config(format!("cannot read env file {}: {e}", path.display()))
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }

        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, BackupError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Overlay values found through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// Older deployments used unprefixed names (`API_EMAIL`,
    /// `AWS_S3_BUCKETNAME`, `INCLUDE_ATTACHMENTS`, ...); those are read when
    /// the `BACKUP_*` name is unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), BackupError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_any = |keys: &[&str]| keys.iter().find_map(|key| get(*key));

        if let Some(v) = get_any(&["BACKUP_API_EMAIL", "API_EMAIL"]) {
            self.email = v;
        }
        if let Some(v) = get_any(&["BACKUP_API_TOKEN", "API_TOKEN"]) {
            self.api_token = v;
        }
        if let Some(v) = get_any(&["BACKUP_API_HOSTNAME", "API_HOSTNAME"]) {
            self.hostname = v;
        }
        if let Some(v) = get("BACKUP_API_BASE_URL") {
            self.base_url = Some(v);
        }

        if let Some(v) = get("BACKUP_STORAGE_BACKEND") {
            self.storage.backend = v.parse().map_err(BackupError::Config)?;
        }
        if let Some(v) = get_any(&["BACKUP_BUCKET", "AWS_S3_BUCKETNAME"]) {
            self.storage.bucket = v;
        }
        if let Some(v) = get_any(&["BACKUP_REGION", "AWS_S3_REGION"]) {
            self.storage.region = v;
        }
        if let Some(v) = get("BACKUP_LOCAL_ROOT") {
            self.storage.local_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get_any(&["BACKUP_STATE_PREFIX", "AWS_S3_STATE_PATH"]) {
            self.storage.state_prefix = v;
        }
        if let Some(v) = get_any(&["BACKUP_TRACKER_PREFIX", "AWS_S3_JIRA_PATH"]) {
            self.storage.tracker_prefix = v;
        }
        if let Some(v) = get_any(&["BACKUP_WIKI_PREFIX", "AWS_S3_CONFLUENCE_PATH"]) {
            self.storage.wiki_prefix = v;
        }

        if let Some(v) = get("BACKUP_COOLDOWN_INITIATE_HOURS") {
            self.cooldowns.initiate_hours = parse_hours("BACKUP_COOLDOWN_INITIATE_HOURS", &v)?;
        }
        if let Some(v) = get("BACKUP_COOLDOWN_SAVE_TRACKER_HOURS") {
            self.cooldowns.save_tracker_hours =
                parse_hours("BACKUP_COOLDOWN_SAVE_TRACKER_HOURS", &v)?;
        }
        if let Some(v) = get("BACKUP_COOLDOWN_SAVE_WIKI_HOURS") {
            self.cooldowns.save_wiki_hours = parse_hours("BACKUP_COOLDOWN_SAVE_WIKI_HOURS", &v)?;
        }

        if let Some(v) = get_any(&["BACKUP_INCLUDE_ATTACHMENTS", "INCLUDE_ATTACHMENTS"]) {
            self.export.include_attachments = parse_flag("BACKUP_INCLUDE_ATTACHMENTS", &v)?;
        }
        if let Some(v) = get_any(&["BACKUP_EXPORT_TO_CLOUD", "EXPORT_TO_CLOUD"]) {
            self.export.export_to_cloud = parse_flag("BACKUP_EXPORT_TO_CLOUD", &v)?;
        }

        Ok(())
    }

    /// Base URL of the vendor site.
    pub fn api_base_url(&self) -> Result<String, BackupError> {
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().trim_end_matches('/').to_string());
        }
        let host = self.hostname.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(BackupError::Config(
                "no API hostname set (BACKUP_API_HOSTNAME)".into(),
            ));
        }
        Ok(format!("https://{host}"))
    }

    pub fn validate(&self) -> Result<(), BackupError> {
        self.api_base_url()?;
        if self.email.trim().is_empty() || self.api_token.trim().is_empty() {
            return Err(BackupError::Config(
                "API credentials missing (BACKUP_API_EMAIL, BACKUP_API_TOKEN)".into(),
            ));
        }
        match self.storage.backend {
            StorageBackend::S3 if self.storage.bucket.trim().is_empty() => {
                Err(BackupError::Config("no bucket set for backups (BACKUP_BUCKET)".into()))
            }
            StorageBackend::Local if self.storage.local_root.is_none() => Err(BackupError::Config(
                "local storage needs a root directory (BACKUP_LOCAL_ROOT)".into(),
            )),
            _ => Ok(()),
        }
    }
}

fn parse_hours(key: &str, value: &str) -> Result<u64, BackupError> {
    value
        .parse()
        .map_err(|_| BackupError::Config(format!("{key} must be a whole number of hours, got `{value}`")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, BackupError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(BackupError::Config(format!("{key} must be true or false, got `{value}`"))),
    }
}
