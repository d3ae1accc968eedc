use async_trait::async_trait;

use crate::error::CalendarError;
use crate::types::{AuthorizationStatus, Calendar, CalendarEvent, TimeWindow};

/// The calendar store events are read from.
///
/// Implementations own the platform's permission model: callers check
/// `authorization_status` and, when undetermined, `request_access` before
/// reading anything.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask for access. Returns whether access was granted.
    async fn request_access(&self) -> Result<bool, CalendarError>;

    /// Calendars holding events, in enumeration order.
    async fn calendars(&self) -> Result<Vec<Calendar>, CalendarError>;

    /// Events from `calendars` overlapping `window`, grouped by calendar in
    /// the order given and in source order within each calendar.
    async fn events_matching(
        &self,
        window: &TimeWindow,
        calendars: &[Calendar],
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}
