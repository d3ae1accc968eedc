//! Calendar-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Calendar access denied")]
    AccessDenied,

    #[error("Calendar access restricted")]
    AccessRestricted,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Event window of {0} weeks is out of range")]
    InvalidWindow(u32),

    #[error("Resolution cancelled")]
    Cancelled,
}

impl CalendarError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::AccessDenied => {
                "Calendar access is turned off. Enable it in Settings to see event weather."
                    .to_string()
            }
            Self::AccessRestricted => "Calendar access is restricted on this device.".to_string(),
            Self::TokenExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::CalendarNotFound(_) => "Calendar not found".to_string(),
            Self::ApiError(msg) => format!("Calendar error: {}", msg),
            Self::NetworkError(_) => "Network error. Check your connection.".to_string(),
            Self::InvalidWindow(_) => "The event window setting is too large.".to_string(),
            Self::Cancelled => "Loading events was cancelled.".to_string(),
        }
    }

    /// Whether this error means calendar access is not granted.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::AccessDenied | Self::AccessRestricted)
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::NetworkError(_))
    }
}
