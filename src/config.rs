use crate::capture::CaptureRegion;
use crate::combat_log::{
    CombatLogOptions, ANCHOR_TOLERANCE, DEFAULT_COMBAT_LOG_PATH, LINE_TOLERANCE,
};
use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;
use crate::stats::{DEFAULT_HISTORY_POINTS, DEFAULT_WINDOW_MS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Screen region holding the combat log [x, y, width, height]
    pub capture_region: [u32; 4],

    /// Captures per second
    pub capture_fps: u32,

    /// Recognition worker threads
    pub worker_threads: usize,

    /// Frames at least this similar (0.0-1.0) to the previous one are skipped
    pub similarity_threshold: f32,

    /// Character differences tolerated when locating the overlap anchor
    pub anchor_tolerance: usize,

    /// Character differences tolerated when comparing lines
    pub line_tolerance: usize,

    /// Moving average window in milliseconds
    pub window_ms: u64,

    /// Consumer liveness poll in milliseconds
    pub poll_interval_ms: u64,

    /// Warn when more recognition results than this are waiting
    pub queue_warn_threshold: usize,

    /// Log every parsed damage event
    pub damage_log: bool,

    /// Log lines no rule matched
    pub ignored_log: bool,

    /// Append new combat log lines to `combat_log_path`
    pub save_combat_log: bool,

    /// Relative paths resolve against the config directory
    pub combat_log_path: String,

    /// Chart points kept for display
    pub history_points: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_region: [0, 0, 800, 300],
            capture_fps: 10,
            worker_threads: 4,
            similarity_threshold: 0.9,
            anchor_tolerance: ANCHOR_TOLERANCE,
            line_tolerance: LINE_TOLERANCE,
            window_ms: DEFAULT_WINDOW_MS,
            poll_interval_ms: 10_000,
            queue_warn_threshold: 100,
            damage_log: false,
            ignored_log: false,
            save_combat_log: false,
            combat_log_path: DEFAULT_COMBAT_LOG_PATH.to_string(),
            history_points: DEFAULT_HISTORY_POINTS,
        }
    }
}

impl Config {
    /// Load configuration from the directory next to the executable.
    /// Creates default config if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path, writing defaults there on first run
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!("Created default config at: {}", path.display());
            return Ok(config);
        }

        let load_failed =
            |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source,
            };
        let content = fs::read_to_string(path).map_err(|e| load_failed(Box::new(e)))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| load_failed(Box::new(e)))?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration next to the executable
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed =
            |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
                path: path.display().to_string(),
                source,
            };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(Box::new(e)))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;
        Ok(())
    }

    /// `config/config.json` in the executable's directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let exe_path = env::current_exe().map_err(|_| ConfigError::NoConfigDir)?;
        let exe_dir = exe_path.parent().ok_or(ConfigError::NoConfigDir)?;
        Ok(exe_dir.join("config").join("config.json"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_fps == 0 {
            return Err(ConfigError::Invalid(
                "capture_fps must be greater than 0".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "worker_threads must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be within 0.0-1.0, got {}",
                self.similarity_threshold
            )));
        }
        if self.window_ms == 0 {
            return Err(ConfigError::Invalid(
                "window_ms must be greater than 0".to_string(),
            ));
        }
        CaptureRegion::from_array(self.capture_region)
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn capture_region(&self) -> CaptureRegion {
        CaptureRegion::from_array(self.capture_region)
    }

    /// Combat log file, relative paths resolved against `base_dir`
    pub fn combat_log_file(&self, base_dir: &Path) -> PathBuf {
        let path = Path::new(&self.combat_log_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Runtime settings; `base_dir` anchors a relative combat log path
    pub fn pipeline_config(&self, base_dir: &Path) -> PipelineConfig {
        PipelineConfig {
            capture_fps: self.capture_fps,
            worker_threads: self.worker_threads,
            similarity_threshold: self.similarity_threshold,
            anchor_tolerance: self.anchor_tolerance,
            line_tolerance: self.line_tolerance,
            window_ms: self.window_ms,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            queue_warn_threshold: self.queue_warn_threshold,
            history_points: self.history_points,
            combat_log: CombatLogOptions {
                damage_log: self.damage_log,
                ignored_log: self.ignored_log,
                save_to: self
                    .save_combat_log
                    .then(|| self.combat_log_file(base_dir)),
            },
        }
    }
}
