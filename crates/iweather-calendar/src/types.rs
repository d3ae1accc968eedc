//! Calendar types and data structures.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use iweather_weather::{Coordinate, CurrentWeather, Placemark};
use serde::{Deserialize, Serialize};

/// Calendar access authorization, as reported by the calendar source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
}

/// Calendar metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub title: String,
    pub is_primary: bool,
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now, now + weeks)`, or `None` if the end is out of range.
    pub fn weeks_from(now: DateTime<Utc>, weeks: u32) -> Option<Self> {
        let span = Duration::try_weeks(i64::from(weeks))?;
        Some(Self {
            start: now,
            end: now.checked_add_signed(span)?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Location attached to a calendar event: a human-readable title, a
/// coordinate, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StructuredLocation {
    pub title: Option<String>,
    pub coordinate: Option<Coordinate>,
}

impl StructuredLocation {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            coordinate: None,
        }
    }

    pub fn at(coordinate: Coordinate) -> Self {
        Self {
            title: None,
            coordinate: Some(coordinate),
        }
    }

    /// Build from a free-text location field.
    ///
    /// Text that is a bare `lat,lon` pair (optionally prefixed `geo:`)
    /// carries its coordinate directly; anything else is a title to geocode.
    /// Blank text yields `None`.
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(match parse_coordinate_text(text) {
            Some(coordinate) => Self {
                title: Some(text.to_string()),
                coordinate: Some(coordinate),
            },
            None => Self::titled(text),
        })
    }
}

fn parse_coordinate_text(text: &str) -> Option<Coordinate> {
    let body = text.strip_prefix("geo:").unwrap_or(text);
    let (lat, lon) = body.split_once(',')?;
    let coordinate = Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    coordinate.is_valid().then_some(coordinate)
}

/// A raw event as supplied by the calendar source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub structured_location: Option<StructuredLocation>,
}

/// A calendar event whose location has been resolved to a coordinate.
///
/// Built once per source event during a resolution pass and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub coordinate: Coordinate,
    /// The geocoding result, when the location was resolved from text
    pub placemark: Option<Placemark>,
    /// Conditions at the event's location and start time
    pub weather: Option<CurrentWeather>,
}

// API Response Types

/// Google Calendar API event response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

/// API response for calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<ApiCalendar>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendar {
    pub id: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

impl CalendarEvent {
    /// Convert an API event. Cancelled events and events without a
    /// parseable start are skipped.
    pub fn from_api(api: ApiEvent, calendar_id: &str) -> Option<Self> {
        if api.status.as_deref() == Some("cancelled") {
            return None;
        }

        let (start, all_day) = match api.start.as_ref().and_then(parse_event_time) {
            Some(parsed) => parsed,
            None => {
                tracing::debug!("Skipping event {} without a usable start time", api.id);
                return None;
            }
        };

        let end = api
            .end
            .as_ref()
            .and_then(parse_event_time)
            .map(|(end, _)| end)
            .unwrap_or(start);

        Some(Self {
            id: api.id,
            calendar_id: calendar_id.to_string(),
            title: api.summary.unwrap_or_default(),
            start,
            end,
            all_day,
            structured_location: api.location.as_deref().and_then(StructuredLocation::from_text),
        })
    }
}

impl From<ApiCalendar> for Calendar {
    fn from(api: ApiCalendar) -> Self {
        Self {
            title: api.summary.unwrap_or_else(|| api.id.clone()),
            id: api.id,
            is_primary: api.primary,
        }
    }
}

fn parse_event_time(api: &ApiEventTime) -> Option<(DateTime<Utc>, bool)> {
    if let Some(dt_str) = &api.date_time {
        if let Ok(dt) = DateTime::parse_from_rfc3339(dt_str) {
            return Some((dt.with_timezone(&Utc), false));
        }
    }
    if let Some(date_str) = &api.date {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            return Some((date.and_time(NaiveTime::MIN).and_utc(), true));
        }
    }
    None
}
