//! Google Calendar API as a calendar source.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::instrument;

use crate::error::CalendarError;
use crate::source::CalendarSource;
use crate::types::*;

const PAGE_SIZE: u32 = 250;

pub struct GoogleCalendarSource {
    client: reqwest::Client,
    access_token: Option<String>,
    base_url: String,
    status: Mutex<AuthorizationStatus>,
}

impl GoogleCalendarSource {
    /// Without a token access is `Denied` until one is configured.
    pub fn new(base_url: &str, access_token: Option<&str>) -> Self {
        let status = if access_token.is_some() {
            AuthorizationStatus::NotDetermined
        } else {
            AuthorizationStatus::Denied
        };

        Self {
            client: reqwest::Client::new(),
            access_token: access_token.map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            status: Mutex::new(status),
        }
    }

    fn auth_header(&self) -> Result<String, CalendarError> {
        self.access_token
            .as_ref()
            .map(|t| format!("Bearer {}", t))
            .ok_or(CalendarError::AccessDenied)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, CalendarError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", self.auth_header()?)
            .send()
            .await?;

        let result = self.handle_response(response).await;
        if let Err(CalendarError::TokenExpired | CalendarError::AccessDenied) = &result {
            *self.status.lock() = AuthorizationStatus::Denied;
        }
        result
    }

    /// List events from one calendar within the window, following pagination.
    #[instrument(skip(self), level = "info")]
    pub async fn list_events(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/calendars/{}/events?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime&maxResults={}",
                self.base_url,
                urlencoding::encode(calendar_id),
                urlencoding::encode(&window.start.to_rfc3339()),
                urlencoding::encode(&window.end.to_rfc3339()),
                PAGE_SIZE,
            );
            if let Some(pt) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(pt)));
            }

            let resp: EventListResponse = self.get(&url).await?;
            events.extend(
                resp.items
                    .into_iter()
                    .filter_map(|api| CalendarEvent::from_api(api, calendar_id)),
            );

            match resp.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Calendar {} has {} events in window", calendar_id, events.len());
        Ok(events)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(CalendarError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(CalendarError::AccessDenied)
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::CalendarNotFound(text))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarSource {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    /// Probe the calendar list with the configured token.
    #[instrument(skip(self), level = "info")]
    async fn request_access(&self) -> Result<bool, CalendarError> {
        if self.access_token.is_none() {
            return Ok(false);
        }

        let url = format!("{}/users/me/calendarList?maxResults=1", self.base_url);
        match self.get::<CalendarListResponse>(&url).await {
            Ok(_) => {
                *self.status.lock() = AuthorizationStatus::Authorized;
                Ok(true)
            }
            Err(CalendarError::TokenExpired | CalendarError::AccessDenied) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), level = "info")]
    async fn calendars(&self) -> Result<Vec<Calendar>, CalendarError> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/users/me/calendarList", self.base_url);
            if let Some(pt) = &page_token {
                url.push_str(&format!("?pageToken={}", urlencoding::encode(pt)));
            }

            let resp: CalendarListResponse = self.get(&url).await?;
            calendars.extend(resp.items.into_iter().map(Calendar::from));

            match resp.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    async fn events_matching(
        &self,
        window: &TimeWindow,
        calendars: &[Calendar],
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events = Vec::new();
        for calendar in calendars {
            events.extend(self.list_events(&calendar.id, window).await?);
        }
        Ok(events)
    }
}
