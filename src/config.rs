use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the title date/time format.
pub const DATE_TIME_FORMAT_ENV: &str = "DATE_TIME_FORMAT";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "VIGIL_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Root of the capture tree; one sub-folder per label.
    #[serde(default = "default_media_root")]
    pub root: PathBuf,

    /// Folder under `root` holding the newest object-detection captures.
    #[serde(default = "default_latest_folder")]
    pub latest_folder: String,
}

fn default_media_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vigil")
        .join("output")
}

fn default_latest_folder() -> String {
    "object_detection".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            latest_folder: default_latest_folder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// strftime format for capture titles. Overridden by `DATE_TIME_FORMAT`.
    #[serde(default = "default_date_time_format")]
    pub date_time_format: String,

    /// strftime format for the "seen at" clause of spoken summaries.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_date_time_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_time_format: default_date_time_format(),
            time_format: default_time_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of capture files read at once. 1 reads strictly in order.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Above this many detections the summary opens with "I have seen".
    #[serde(default = "default_verbosity_threshold")]
    pub verbosity_threshold: usize,

    /// Daemon poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Announcement hours (0-23). Overnight ranges such as 22-6 are allowed.
    #[serde(default)]
    pub hours_start: Option<u8>,

    #[serde(default)]
    pub hours_end: Option<u8>,
}

fn default_verbosity_threshold() -> usize {
    10
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            verbosity_threshold: default_verbosity_threshold(),
            poll_interval_secs: default_poll_interval(),
            hours_start: None,
            hours_end: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vigil")
        .join("vigil.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            media: MediaConfig::default(),
            display: DisplayConfig::default(),
            retrieval: RetrievalConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}

impl Config {
    /// Load from `$VIGIL_CONFIG` or the default location, writing a default
    /// file on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            config
        };

        config.finish(env_var)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_from_env(path, env_var)
    }

    /// Like [`Config::load_from`], reading overrides through `env`.
    pub fn load_from_env<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::read_file(path)?.finish(env)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply environment overrides and validate.
    fn finish<F>(mut self, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = env(DATE_TIME_FORMAT_ENV) {
            self.display.date_time_format = format;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        TimeFormat::new(&self.display.date_time_format).context("display.date_time_format")?;
        TimeFormat::new(&self.display.time_format).context("display.time_format")?;
        if self.retrieval.concurrency == 0 {
            bail!("retrieval.concurrency must be at least 1");
        }
        for hour in [self.voice.hours_start, self.voice.hours_end].into_iter().flatten() {
            if hour > 23 {
                bail!("voice hours must be between 0 and 23, got {}", hour);
            }
        }
        Ok(())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vigil")
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    pub fn latest_dir(&self) -> PathBuf {
        self.media.root.join(&self.media.latest_folder)
    }

    pub fn title_format(&self) -> Result<TimeFormat> {
        TimeFormat::new(&self.display.date_time_format)
    }

    pub fn clause_format(&self) -> Result<TimeFormat> {
        TimeFormat::new(&self.display.time_format)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// A strftime pattern known to contain only valid specifiers.
///
/// chrono panics when an invalid pattern is rendered, so patterns coming
/// from configuration are checked once here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat(String);

impl TimeFormat {
    pub fn new(pattern: &str) -> Result<Self> {
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            bail!("invalid date/time format {:?}", pattern);
        }
        Ok(Self(pattern.to_string()))
    }

    pub fn apply(&self, ts: DateTime<Utc>) -> String {
        ts.format(&self.0).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.media.latest_folder, "object_detection");
        assert_eq!(config.retrieval.concurrency, 1);
        assert_eq!(config.voice.verbosity_threshold, 10);
        assert!(config.validate().is_ok());
        assert!(config.latest_dir().ends_with("output/object_detection"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
db_path = "/srv/vigil/vigil.db"

[media]
root = "/srv/vigil/output"

[retrieval]
concurrency = 4
"#
        )
        .unwrap();

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/srv/vigil/vigil.db"));
        assert_eq!(config.media.root, PathBuf::from("/srv/vigil/output"));
        assert_eq!(config.media.latest_folder, "object_detection");
        assert_eq!(config.retrieval.concurrency, 4);
        assert_eq!(config.display.time_format, "%H:%M");
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.voice.hours_start = Some(22);
        config.voice.hours_end = Some(6);
        config.save_to(&path).unwrap();

        let reloaded = Config::read_file(&path).unwrap();
        assert_eq!(reloaded.voice.hours_start, Some(22));
        assert_eq!(reloaded.voice.hours_end, Some(6));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.retrieval.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.display.date_time_format = "%Y-%Q".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.voice.hours_end = Some(24);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_date_time_format_from_environment() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[display]\ndate_time_format = \"%Y-%m-%d\"\n").unwrap();

        let config = Config::load_from_env(&path, |_| None).unwrap();
        assert_eq!(config.display.date_time_format, "%Y-%m-%d");

        let config = Config::load_from_env(&path, |key| {
            (key == DATE_TIME_FORMAT_ENV).then(|| "%d/%m %H:%M".to_string())
        })
        .unwrap();
        assert_eq!(config.display.date_time_format, "%d/%m %H:%M");
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 14, 5, 9).unwrap();
        assert_eq!(config.title_format().unwrap().apply(ts), "10/03 14:05");

        let rejected = Config::load_from_env(&path, |key| {
            (key == DATE_TIME_FORMAT_ENV).then(|| "%Y-%Q".to_string())
        });
        assert!(rejected.is_err());
    }

    #[test]
    fn test_time_format_apply() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 14, 5, 9).unwrap();
        assert_eq!(TimeFormat::new("%H:%M").unwrap().apply(ts), "14:05");
        assert_eq!(
            TimeFormat::new("%Y-%m-%d %H:%M:%S").unwrap().apply(ts),
            "2024-03-10 14:05:09"
        );
        assert!(TimeFormat::new("%").is_err());
    }
}
