//! Error types for weather parsing and remote lookups.

use thiserror::Error;

/// A raw weather record could not be turned into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("expected a JSON object")]
    NotAnObject,
}

/// Forecast fetch errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid coordinate query: {0:?}")]
    InvalidQuery(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Network error. Check your connection.",
            Self::Status { status, .. } if *status == 401 || *status == 403 => {
                "Weather API key is invalid. Check settings."
            }
            Self::Status { .. } => "Weather service error. Please try again.",
            Self::Json(_) | Self::Parse(_) => "Weather data could not be read.",
            Self::InvalidQuery(_) => "Invalid location for weather lookup.",
        }
    }

    /// Whether a later attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Geocoding and autocomplete errors.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {status}: {message}")]
    Api { status: String, message: String },

    #[error("No results for {0:?}")]
    NoResults(String),
}

impl GeocodeError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Status { .. } | Self::Api { .. } => {
                "Location service error. Please try again.".to_string()
            }
            Self::Json(_) => "Location data could not be read.".to_string(),
            Self::NoResults(query) => format!("No location found for \"{}\"", query),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::MissingField("time");
        assert_eq!(err.to_string(), "missing field `time`");

        let err = ParseError::InvalidType {
            field: "time",
            expected: "an integer",
        };
        assert!(err.to_string().contains("an integer"));
    }

    #[test]
    fn test_weather_error_retryable() {
        let unavailable = WeatherError::Status {
            status: 503,
            body: String::new(),
        };
        let forbidden = WeatherError::Status {
            status: 403,
            body: String::new(),
        };
        assert!(unavailable.is_retryable());
        assert!(!forbidden.is_retryable());
        assert!(!WeatherError::Parse(ParseError::NotAnObject).is_retryable());
    }

    #[test]
    fn test_weather_error_user_message() {
        let forbidden = WeatherError::Status {
            status: 403,
            body: String::new(),
        };
        assert!(forbidden.user_message().contains("API key"));
    }

    #[test]
    fn test_geocode_no_results_message() {
        let err = GeocodeError::NoResults("Nowhere".into());
        assert!(err.user_message().contains("Nowhere"));
        assert!(!err.is_retryable());
    }
}
