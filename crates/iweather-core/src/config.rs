use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

const PLACEHOLDER_PREFIX: &str = "YOUR_";

const MAX_WINDOW_WEEKS: u32 = 520;

const FORECAST_KEY_VAR: &str = "IWEATHER_FORECAST_KEY";
const PLACES_KEY_VAR: &str = "IWEATHER_PLACES_KEY";
const CALENDAR_TOKEN_VAR: &str = "IWEATHER_CALENDAR_TOKEN";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Forecast API settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Place autocomplete settings
    #[serde(default)]
    pub places: PlacesConfig,

    /// Forward geocoder settings
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    /// Calendar source settings
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Resolution pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Unit system requested from the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForecastUnits {
    #[default]
    Auto,
    Us,
    Si,
    Ca,
    Uk2,
}

impl ForecastUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Us => "us",
            Self::Si => "si",
            Self::Ca => "ca",
            Self::Uk2 => "uk2",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL; requests go to `{base_url}/{api_key}/{lat},{lon}`
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub units: ForecastUnits,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.forecast.io/forecast".to_string(),
            api_key: "YOUR_FORECAST_API_KEY".to_string(),
            timeout_secs: default_timeout_secs(),
            units: ForecastUnits::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/place/autocomplete/json".to_string(),
            api_key: "YOUR_PLACES_API_KEY".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Nominatim-compatible server; `/search` and `/reverse` are appended
    pub base_url: String,
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "iWeather/0.1.0".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Forward window of events to resolve, in weeks from now
    #[serde(default = "default_window_weeks")]
    pub window_weeks: u32,

    /// Google Calendar v3 API base
    #[serde(default = "default_calendar_api_base")]
    pub api_base: String,

    /// OAuth access token, usually from IWEATHER_CALENDAR_TOKEN.
    /// Read from the file if present but never written back.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            window_weeks: default_window_weeks(),
            api_base: default_calendar_api_base(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on concurrent geocode/weather lookups per run
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    /// Fetch weather for each resolved event
    #[serde(default = "default_annotate_weather")]
    pub annotate_weather: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: default_max_concurrent_lookups(),
            annotate_weather: default_annotate_weather(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_window_weeks() -> u32 {
    10
}

fn default_calendar_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_max_concurrent_lookups() -> usize {
    4
}

fn default_annotate_weather() -> bool {
    true
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iweather")
}

fn is_placeholder(key: &str) -> bool {
    key.is_empty() || key.starts_with(PLACEHOLDER_PREFIX)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            forecast: ForecastConfig::default(),
            places: PlacesConfig::default(),
            geocoder: GeocoderConfig::default(),
            calendar: CalendarConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist.
    ///
    /// Environment variables override the file on every load and are not
    /// written to it.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_from_with(path, |var| std::env::var(var).ok())
    }

    fn load_from_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.apply_env_overrides(env);
        Ok(config)
    }

    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        let set = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        if let Some(key) = set(FORECAST_KEY_VAR) {
            self.forecast.api_key = key;
        }
        if let Some(key) = set(PLACES_KEY_VAR) {
            self.places.api_key = key;
        }
        if let Some(token) = set(CALENDAR_TOKEN_VAR) {
            self.calendar.access_token = Some(token);
        }
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.forecast.base_url, "forecast.base_url", &mut result);
        self.validate_url(&self.places.base_url, "places.base_url", &mut result);
        self.validate_url(&self.geocoder.base_url, "geocoder.base_url", &mut result);
        self.validate_url(&self.calendar.api_base, "calendar.api_base", &mut result);

        for (field, secs) in [
            ("forecast.timeout_secs", self.forecast.timeout_secs),
            ("places.timeout_secs", self.places.timeout_secs),
            ("geocoder.timeout_secs", self.geocoder.timeout_secs),
        ] {
            if secs == 0 {
                result.add_error(field, "Timeout must be greater than 0");
            } else if secs > 300 {
                result.add_warning(field, "Timeout is unusually long (>5 minutes)");
            }
        }

        if is_placeholder(&self.forecast.api_key) {
            result.add_warning(
                "forecast.api_key",
                "Forecast API key not configured - weather will be unavailable",
            );
        }

        if is_placeholder(&self.places.api_key) {
            result.add_warning(
                "places.api_key",
                "Places API key not configured - location suggestions will be unavailable",
            );
        }

        if self.geocoder.user_agent.trim().is_empty() {
            result.add_error("geocoder.user_agent", "User agent must not be empty");
        }

        if self.calendar.window_weeks == 0 {
            result.add_error("calendar.window_weeks", "Event window must be at least 1 week");
        } else if self.calendar.window_weeks > MAX_WINDOW_WEEKS {
            result.add_error(
                "calendar.window_weeks",
                format!("Event window must be at most {} weeks", MAX_WINDOW_WEEKS),
            );
        } else if self.calendar.window_weeks > 52 {
            result.add_warning("calendar.window_weeks", "Event window is longer than a year");
        }

        if self.calendar.access_token.is_none() {
            result.add_warning(
                "calendar.access_token",
                "Calendar access token not configured - events cannot be loaded",
            );
        }

        if self.pipeline.max_concurrent_lookups == 0 {
            result.add_error(
                "pipeline.max_concurrent_lookups",
                "At least one concurrent lookup is required",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("iweather");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_default_window_is_ten_weeks() {
        assert_eq!(Config::default().calendar.window_weeks, 10);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.forecast.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "forecast.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.places.base_url = "ftp://maps.example.com/autocomplete".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = Config::default();
        config.geocoder.timeout_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "geocoder.timeout_secs"));
    }

    #[test]
    fn test_zero_concurrency_is_error() {
        let mut config = Config::default();
        config.pipeline.max_concurrent_lookups = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_placeholder_key_is_warning() {
        let mut config = Config::default();
        config.forecast.api_key = "YOUR_FORECAST_API_KEY".to_string();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "forecast.api_key"));
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.calendar.window_weeks = 4;
        config.forecast.units = ForecastUnits::Si;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.calendar.window_weeks, 4);
        assert_eq!(loaded.forecast.units, ForecastUnits::Si);
    }

    #[test]
    fn test_load_from_missing_path_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.pipeline.max_concurrent_lookups, 4);
    }

    #[test]
    fn test_window_weeks_limits() {
        let mut config = Config::default();
        config.calendar.window_weeks = 60;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "calendar.window_weeks"));

        config.calendar.window_weeks = 20_000_000;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "calendar.window_weeks"));
    }

    #[test]
    fn test_env_overrides_apply_on_every_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let first_env = |var: &str| match var {
            "IWEATHER_CALENDAR_TOKEN" => Some("secret-token".to_string()),
            _ => None,
        };
        let first = Config::load_from_with(&path, first_env).unwrap();
        assert_eq!(first.calendar.access_token.as_deref(), Some("secret-token"));
        assert_eq!(first.forecast.api_key, "YOUR_FORECAST_API_KEY");

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("secret-token"));

        let second_env = |var: &str| match var {
            "IWEATHER_FORECAST_KEY" => Some("real-key".to_string()),
            _ => None,
        };
        let second = Config::load_from_with(&path, second_env).unwrap();
        assert_eq!(second.forecast.api_key, "real-key");
        assert_eq!(second.places.api_key, "YOUR_PLACES_API_KEY");
        assert!(second.calendar.access_token.is_none());
    }

    #[test]
    fn test_access_token_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.calendar.access_token = Some("secret-token".to_string());
        config.save_to(&path).unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("secret-token"));
    }

    #[test]
    fn test_token_in_file_is_still_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[calendar]\naccess_token = \"from-file\"\n").unwrap();

        let config = Config::load_from_with(&path, |_| None).unwrap();
        assert_eq!(config.calendar.access_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_missing_config_dir_uses_default() {
        let config: Config = toml::from_str("[pipeline]\nmax_concurrent_lookups = 2\n").unwrap();
        assert!(config.config_dir.ends_with("iweather"));
        assert_eq!(config.pipeline.max_concurrent_lookups, 2);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = [not toml").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("config_dir = \"/tmp/iweather\"\n").unwrap();
        assert_eq!(config.calendar.window_weeks, 10);
        assert!(config.pipeline.annotate_weather);
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
