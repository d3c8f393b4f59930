//! Engine configuration loading and config file resolution
//!
//! Configuration is a single TOML file. Every field has a built-in default, so
//! an empty file (or no file at all) yields a working engine.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `LINGO_CONFIG` environment variable
//! 3. `<config_dir>/lingo/config.toml`
//! 4. Built-in defaults (no file)

use crate::time::DEFAULT_EPSILON;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LINGO_CONFIG";

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub subtitle_sync: SubtitleSyncConfig,

    #[serde(default)]
    pub auto_pause: AutoPauseConfig,

    #[serde(default)]
    pub trace: TraceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Clock-synchronized scheduler tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Media-time comparison tolerance (seconds)
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Maximum tasks executed per evaluation before deferring
    #[serde(default = "default_max_tasks_per_tick")]
    pub max_tasks_per_tick: usize,

    /// Wall-clock budget per evaluation (milliseconds)
    #[serde(default = "default_max_batch_ms")]
    pub max_batch_ms: f64,
}

/// Subtitle synchronization tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSyncConfig {
    /// Extra tolerance applied around the currently active cue (seconds)
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,

    /// Maximum distance for the nearest-cue fallback (seconds)
    #[serde(default = "default_max_nearest_distance")]
    pub max_nearest_distance: f64,
}

/// Auto-pause behavior
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoPauseConfig {
    #[serde(default)]
    pub resume_policy: AutoResumePolicy,
}

/// How playback resumes after an auto-pause with auto-resume enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoResumePolicy {
    /// Surface a countdown in the UI; the UI decides when to resume
    #[default]
    Countdown,
    /// Countdown plus a scheduled resume after the configured delay
    Scheduled,
    /// Never resume automatically
    Disabled,
}

impl std::fmt::Display for AutoResumePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoResumePolicy::Countdown => write!(f, "countdown"),
            AutoResumePolicy::Scheduled => write!(f, "scheduled"),
            AutoResumePolicy::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for AutoResumePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "countdown" => Ok(AutoResumePolicy::Countdown),
            "scheduled" => Ok(AutoResumePolicy::Scheduled),
            "disabled" => Ok(AutoResumePolicy::Disabled),
            other => Err(Error::InvalidInput(format!(
                "unknown resume policy '{}'",
                other
            ))),
        }
    }
}

/// Diagnostic trace retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Number of ticks kept
    #[serde(default = "default_trace_capacity")]
    pub capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_max_tasks_per_tick() -> usize {
    32
}

fn default_max_batch_ms() -> f64 {
    8.0
}

fn default_hysteresis() -> f64 {
    0.1
}

fn default_max_nearest_distance() -> f64 {
    0.5
}

fn default_trace_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            max_tasks_per_tick: default_max_tasks_per_tick(),
            max_batch_ms: default_max_batch_ms(),
        }
    }
}

impl Default for SubtitleSyncConfig {
    fn default() -> Self {
        Self {
            hysteresis: default_hysteresis(),
            max_nearest_distance: default_max_nearest_distance(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: default_trace_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// A missing file is not an error: a warning is logged and defaults are
    /// returned. A malformed or invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file per priority order and load it
    pub fn load_resolved(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) => Self::load(&path),
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        if !s.epsilon.is_finite() || s.epsilon < 0.0 {
            return Err(Error::Config(format!(
                "scheduler.epsilon must be a non-negative number, got {}",
                s.epsilon
            )));
        }
        if s.max_tasks_per_tick == 0 {
            return Err(Error::Config(
                "scheduler.max_tasks_per_tick must be at least 1".to_string(),
            ));
        }
        if !s.max_batch_ms.is_finite() || s.max_batch_ms <= 0.0 {
            return Err(Error::Config(format!(
                "scheduler.max_batch_ms must be positive, got {}",
                s.max_batch_ms
            )));
        }

        let sync = &self.subtitle_sync;
        if !sync.hysteresis.is_finite() || sync.hysteresis < 0.0 {
            return Err(Error::Config(format!(
                "subtitle_sync.hysteresis must be non-negative, got {}",
                sync.hysteresis
            )));
        }
        if !sync.max_nearest_distance.is_finite() || sync.max_nearest_distance < 0.0 {
            return Err(Error::Config(format!(
                "subtitle_sync.max_nearest_distance must be non-negative, got {}",
                sync.max_nearest_distance
            )));
        }

        if self.trace.capacity == 0 {
            return Err(Error::Config(
                "trace.capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Config file resolution following priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. Platform config directory
///
/// Returns `None` when no candidate exists, in which case defaults apply.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument (returned even if missing so the
    // caller reports it)
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_file().filter(|p| p.exists())
}

/// `<config_dir>/lingo/config.toml` for the current platform
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lingo").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.scheduler.epsilon, DEFAULT_EPSILON);
        assert_eq!(config.scheduler.max_tasks_per_tick, 32);
        assert_eq!(config.subtitle_sync.hysteresis, 0.1);
        assert_eq!(config.auto_pause.resume_policy, AutoResumePolicy::Countdown);
        assert_eq!(config.trace.capacity, 256);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [scheduler]
            max_tasks_per_tick = 4

            [auto_pause]
            resume_policy = "scheduled"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.max_tasks_per_tick, 4);
        assert_eq!(config.scheduler.max_batch_ms, 8.0);
        assert_eq!(config.auto_pause.resume_policy, AutoResumePolicy::Scheduled);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = EngineConfig::default();
        config.scheduler.max_tasks_per_tick = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_negative_hysteresis() {
        let mut config = EngineConfig::default();
        config.subtitle_sync.hysteresis = -0.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_resume_policy_from_str() {
        assert_eq!(
            "Scheduled".parse::<AutoResumePolicy>().unwrap(),
            AutoResumePolicy::Scheduled
        );
        assert!("sometimes".parse::<AutoResumePolicy>().is_err());
    }
}
