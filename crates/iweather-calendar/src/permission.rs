//! Calendar access gating.
//!
//! Resolution only runs once access is confirmed. An undetermined status
//! triggers a request; a denied or restricted status routes the caller to
//! the explanation it should show instead.

use crate::error::CalendarError;
use crate::source::CalendarSource;
use crate::types::AuthorizationStatus;

/// Where the caller should go after checking access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionRoute {
    /// Access granted; load events.
    Proceed,
    /// Access not granted; explain how to enable it.
    NeedPermission,
    /// Access blocked by policy; explain that it cannot be enabled here.
    Restricted,
}

impl PermissionRoute {
    pub fn into_result(self) -> Result<(), CalendarError> {
        match self {
            Self::Proceed => Ok(()),
            Self::NeedPermission => Err(CalendarError::AccessDenied),
            Self::Restricted => Err(CalendarError::AccessRestricted),
        }
    }
}

/// Check the source's authorization, requesting it when undetermined.
///
/// A failed request routes to `NeedPermission`, the same as a refusal.
pub async fn check_access(source: &dyn CalendarSource) -> PermissionRoute {
    match source.authorization_status() {
        AuthorizationStatus::Authorized => PermissionRoute::Proceed,
        AuthorizationStatus::Denied => PermissionRoute::NeedPermission,
        AuthorizationStatus::Restricted => PermissionRoute::Restricted,
        AuthorizationStatus::NotDetermined => match source.request_access().await {
            Ok(true) => {
                tracing::info!("Calendar access granted");
                PermissionRoute::Proceed
            }
            Ok(false) => {
                tracing::info!("Calendar access refused");
                PermissionRoute::NeedPermission
            }
            Err(e) => {
                tracing::warn!("Calendar access request failed: {}", e);
                PermissionRoute::NeedPermission
            }
        },
    }
}

/// Like [`check_access`], but as a `Result` for `?` chains.
pub async fn ensure_access(source: &dyn CalendarSource) -> Result<(), CalendarError> {
    check_access(source).await.into_result()
}
