use bilijean_providers::bilibili::DEFAULT_API_BASE;
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::streaming::constants::{AudioBitRateId, VideoCodecId};
use crate::streaming::negotiator::SourcePreferences;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub bilibili: BilibiliConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Platform API access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BilibiliConfig {
    pub api_base: String,
    pub request_timeout_seconds: u64,
    /// bound for the redirect probe made while classifying a URL
    pub probe_timeout_seconds: u64,
    /// bound for the optional owner profile lookup
    pub enrichment_timeout_seconds: u64,
    /// `SESSDATA` cookie of a logged-in account
    pub sess_data: Option<String>,
}

impl Default for BilibiliConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_seconds: 5,
            probe_timeout_seconds: 1,
            enrichment_timeout_seconds: 2,
            sess_data: None,
        }
    }
}

/// Default rendition preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub prefer_high_quality_video: bool,
    pub max_video_quality: Option<u32>,
    pub prefer_efficient_codec: bool,
    pub max_codec: Option<u32>,
    pub prefer_high_quality_audio: bool,
    pub max_audio_quality: Option<u32>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        SourcePreferences::default().into()
    }
}

impl From<&PlaybackConfig> for SourcePreferences {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            prefer_high_quality_video: config.prefer_high_quality_video,
            max_video_quality: config.max_video_quality,
            prefer_efficient_codec: config.prefer_efficient_codec,
            max_codec: config.max_codec,
            prefer_high_quality_audio: config.prefer_high_quality_audio,
            max_audio_quality: config.max_audio_quality,
        }
    }
}

impl From<SourcePreferences> for PlaybackConfig {
    fn from(prefs: SourcePreferences) -> Self {
        Self {
            prefer_high_quality_video: prefs.prefer_high_quality_video,
            max_video_quality: prefs.max_video_quality,
            prefer_efficient_codec: prefs.prefer_efficient_codec,
            max_codec: prefs.max_codec,
            prefer_high_quality_audio: prefs.prefer_high_quality_audio,
            max_audio_quality: prefs.max_audio_quality,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // BILIJEAN_LOGGING__LEVEL, BILIJEAN_BILIBILI__SESS_DATA, ...
        builder = builder.add_source(
            Environment::with_prefix("BILIJEAN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Rendition preferences configured for playback
    #[must_use]
    pub fn source_preferences(&self) -> SourcePreferences {
        SourcePreferences::from(&self.playback)
    }

    /// Human-readable problems with this configuration; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            problems.push(format!("logging.format must be json or pretty, got {:?}", self.logging.format));
        }
        if self.bilibili.api_base.trim().is_empty() {
            problems.push("bilibili.api_base must not be empty".to_string());
        }
        let timeouts = [
            ("request_timeout_seconds", self.bilibili.request_timeout_seconds),
            ("probe_timeout_seconds", self.bilibili.probe_timeout_seconds),
            ("enrichment_timeout_seconds", self.bilibili.enrichment_timeout_seconds),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                problems.push(format!("bilibili.{name} must be greater than zero"));
            }
        }
        if let Some(cap) = self.playback.max_codec {
            if VideoCodecId::try_from(cap).is_err() {
                problems.push(format!("playback.max_codec {cap} is not a known codec id"));
            }
        }
        if let Some(cap) = self.playback.max_audio_quality {
            if AudioBitRateId::try_from(cap).is_err() {
                problems.push(format!("playback.max_audio_quality {cap} is not a known audio quality id"));
            }
        }

        problems
    }
}
