use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Lowest frame rate the engine runs at; smaller configured values are
/// raised to it.
pub const MIN_FRAME_RATE: u32 = 10;

/// Runtime generation the game content targets; drives the defaults that
/// differ between engine generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentVersion {
    Rgss1,
    Rgss2,
    #[default]
    Rgss3,
}

impl ContentVersion {
    pub fn default_frame_rate(self) -> u32 {
        match self {
            ContentVersion::Rgss1 => 40,
            ContentVersion::Rgss2 | ContentVersion::Rgss3 => 60,
        }
    }

    pub fn default_resolution(self) -> ScreenSize {
        match self {
            ContentVersion::Rgss1 => ScreenSize::new(640, 480),
            ContentVersion::Rgss2 | ContentVersion::Rgss3 => ScreenSize::new(544, 416),
        }
    }
}

impl fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContentVersion::Rgss1 => "rgss1",
            ContentVersion::Rgss2 => "rgss2",
            ContentVersion::Rgss3 => "rgss3",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuPower {
    Low,
    #[default]
    High,
}

/// Pixel dimensions written as `WIDTHxHEIGHT` in configuration files and on
/// the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ScreenSize {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (width, height) = normalized.split_once('x').ok_or_else(|| {
            ConfigError::Invalid(format!("size '{raw}' must be formatted as WIDTHxHEIGHT"))
        })?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid width in size '{raw}'")))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid height in size '{raw}'")))?;
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "size '{raw}' must be non-zero in both dimensions"
            )));
        }
        Ok(Self { width, height })
    }
}

impl Serialize for ScreenSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScreenSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub version: u32,
    #[serde(default)]
    pub content_version: ContentVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ScreenSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<ScreenSize>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub allow_frame_skip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    #[serde(default = "default_true")]
    pub show_fps: bool,
    #[serde(
        default = "default_fps_report_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub fps_report_interval: Duration,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default)]
    pub gpu_power: GpuPower,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            content_version: ContentVersion::default(),
            resolution: None,
            window_size: None,
            title: default_title(),
            allow_frame_skip: false,
            frame_rate: None,
            show_fps: true,
            fps_report_interval: default_fps_report_interval(),
            vsync: true,
            gpu_power: GpuPower::default(),
        }
    }
}

fn default_title() -> String {
    "rgu".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fps_report_interval() -> Duration {
    Duration::from_secs(1)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*value))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("an FPS report interval in seconds or as a humantime string like \"500ms\"")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("fps_report_interval '{v}' is not a duration: {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("fps_report_interval cannot be negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("fps_report_interval cannot be negative"));
            }
            Duration::try_from_secs_f64(v).map_err(|err| {
                E::custom(format!("fps_report_interval {v} is out of range: {err}"))
            })
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: EngineConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Logical resolution the compositor renders at.
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
            .unwrap_or_else(|| self.content_version.default_resolution())
    }

    /// Initial window size; falls back to the logical resolution.
    pub fn window_size(&self) -> ScreenSize {
        self.window_size.unwrap_or_else(|| self.resolution())
    }

    pub fn default_frame_rate(&self) -> u32 {
        self.content_version.default_frame_rate()
    }

    /// Effective frame rate; explicit values below [`MIN_FRAME_RATE`] are
    /// raised to it.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
            .map_or_else(|| self.default_frame_rate(), |rate| rate.max(MIN_FRAME_RATE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.fps_report_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "fps_report_interval must be greater than zero".into(),
            ));
        }

        if self.title.trim().is_empty() {
            return Err(ConfigError::Invalid("title may not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
content_version = "rgss1"
resolution = "800x600"
window_size = "1600x1200"
title = "Demo"
allow_frame_skip = true
fps_report_interval = "500ms"
gpu_power = "low"
"#;

    #[test]
    fn parses_full_engine_file() {
        let config = EngineConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.content_version, ContentVersion::Rgss1);
        assert_eq!(config.resolution(), ScreenSize::new(800, 600));
        assert_eq!(config.window_size(), ScreenSize::new(1600, 1200));
        assert_eq!(config.title, "Demo");
        assert!(config.allow_frame_skip);
        assert_eq!(config.fps_report_interval, Duration::from_millis(500));
        assert_eq!(config.gpu_power, GpuPower::Low);
        assert!(config.vsync);
    }

    #[test]
    fn defaults_follow_content_version() {
        let legacy = EngineConfig::from_toml_str("version = 1\ncontent_version = \"rgss1\"\n")
            .unwrap();
        assert_eq!(legacy.resolution(), ScreenSize::new(640, 480));
        assert_eq!(legacy.frame_rate(), 40);

        let modern = EngineConfig::from_toml_str("version = 1\n").unwrap();
        assert_eq!(modern.content_version, ContentVersion::Rgss3);
        assert_eq!(modern.resolution(), ScreenSize::new(544, 416));
        assert_eq!(modern.window_size(), ScreenSize::new(544, 416));
        assert_eq!(modern.frame_rate(), 60);
        assert_eq!(modern.fps_report_interval, Duration::from_secs(1));
    }

    #[test]
    fn explicit_frame_rate_overrides_default() {
        let config = EngineConfig::from_toml_str("version = 1\nframe_rate = 30\n").unwrap();
        assert_eq!(config.frame_rate(), 30);
        assert_eq!(config.default_frame_rate(), 60);
    }

    #[test]
    fn numeric_interval_is_seconds() {
        let config =
            EngineConfig::from_toml_str("version = 1\nfps_report_interval = 2\n").unwrap();
        assert_eq!(config.fps_report_interval, Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = EngineConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_sized_resolution() {
        let err = EngineConfig::from_toml_str("version = 1\nresolution = \"0x480\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn low_frame_rates_are_clamped() {
        for raw in ["0", "5"] {
            let input = format!("version = 1\nframe_rate = {raw}\n");
            let config = EngineConfig::from_toml_str(&input).unwrap();
            assert_eq!(config.frame_rate(), MIN_FRAME_RATE);
        }
    }

    #[test]
    fn unrepresentable_report_interval_is_a_parse_error() {
        for raw in ["inf", "1e300"] {
            let input = format!("version = 1\nfps_report_interval = {raw}\n");
            let err = EngineConfig::from_toml_str(&input).unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn size_parser_accepts_uppercase_separator() {
        let size: ScreenSize = "1280X720".parse().unwrap();
        assert_eq!(size, ScreenSize::new(1280, 720));
        assert!("1280".parse::<ScreenSize>().is_err());
        assert!("axb".parse::<ScreenSize>().is_err());
    }

    #[test]
    fn serializes_back_to_toml() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = toml::to_string(&config).unwrap();
        assert!(rendered.contains("resolution = \"800x600\""));
        assert!(rendered.contains("fps_report_interval = \"500ms\""));
        let reparsed = EngineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.resolution(), config.resolution());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.title, "Demo");

        let missing = EngineConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
