//! Event resolution: turn raw calendar events into coordinate-annotated
//! [`Event`]s.
//!
//! Each raw event moves from pending to exactly one of:
//! - located by coordinate, when its structured location already has one
//! - located by geocode, when its location title geocodes to a placemark
//! - dropped, when it has no location or the title doesn't geocode
//!
//! Lookups for different events run concurrently, but results are keyed by
//! input position and published in input order, so completion timing never
//! changes what readers see.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use iweather_weather::{
    Coordinate, CurrentWeather, GeocodeError, Geocoder, Placemark, WeatherSource,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::CalendarError;
use crate::permission::ensure_access;
use crate::source::CalendarSource;
use crate::store::{EventReader, EventStore};
use crate::types::{CalendarEvent, Event, TimeWindow};

const DEFAULT_WINDOW_WEEKS: u32 = 10;
const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 4;

/// Why a raw event produced no [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// No structured location, or one with neither coordinate nor title
    NoLocation,
    /// The geocoder returned no placemarks
    NoGeocodeResult,
    /// The geocoder failed
    GeocodeFailed(String),
}

/// Terminal state of one raw event.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    LocatedByCoordinate(Event),
    LocatedByGeocode(Event),
    Dropped(DropReason),
}

impl ResolveOutcome {
    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::LocatedByCoordinate(e) | Self::LocatedByGeocode(e) => Some(e),
            Self::Dropped(_) => None,
        }
    }

    pub fn into_event(self) -> Option<Event> {
        match self {
            Self::LocatedByCoordinate(e) | Self::LocatedByGeocode(e) => Some(e),
            Self::Dropped(_) => None,
        }
    }
}

/// Per-pass tally of outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionReport {
    pub total: usize,
    pub by_coordinate: usize,
    pub by_geocode: usize,
    /// Source event id and reason, in input order
    pub dropped: Vec<(String, DropReason)>,
    /// Resolved events that also carry weather
    pub with_weather: usize,
}

impl ResolutionReport {
    pub fn resolved(&self) -> usize {
        self.by_coordinate + self.by_geocode
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub window_weeks: u32,
    pub max_concurrent_lookups: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            window_weeks: DEFAULT_WINDOW_WEEKS,
            max_concurrent_lookups: DEFAULT_MAX_CONCURRENT_LOOKUPS,
        }
    }
}

pub struct ResolutionPipeline {
    geocoder: Arc<dyn Geocoder>,
    weather: Option<Arc<dyn WeatherSource>>,
    options: PipelineOptions,
    /// Held for the whole of a run, which serializes runs.
    store: Mutex<EventStore>,
    reader: EventReader,
}

impl ResolutionPipeline {
    pub fn new(geocoder: Arc<dyn Geocoder>, store: EventStore) -> Self {
        let reader = store.reader();
        Self {
            geocoder,
            weather: None,
            options: PipelineOptions::default(),
            store: Mutex::new(store),
            reader,
        }
    }

    /// Attach weather at each event's location and start time.
    pub fn with_weather(mut self, weather: Arc<dyn WeatherSource>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Read handle onto the events published by this pipeline.
    pub fn reader(&self) -> EventReader {
        self.reader.clone()
    }

    /// Resolve a single raw event.
    pub async fn resolve_event(&self, raw: &CalendarEvent) -> ResolveOutcome {
        let Some(location) = &raw.structured_location else {
            return ResolveOutcome::Dropped(DropReason::NoLocation);
        };

        if let Some(coordinate) = location.coordinate {
            let event = self.build_event(raw, coordinate, None).await;
            return ResolveOutcome::LocatedByCoordinate(event);
        }

        let Some(title) = location
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return ResolveOutcome::Dropped(DropReason::NoLocation);
        };

        match self.geocoder.geocode_first(title).await {
            Ok(placemark) => {
                let event = self
                    .build_event(raw, placemark.coordinate, Some(placemark))
                    .await;
                ResolveOutcome::LocatedByGeocode(event)
            }
            Err(GeocodeError::NoResults(_)) => {
                tracing::warn!("No geocode result for {:?}, dropping {}", title, raw.id);
                ResolveOutcome::Dropped(DropReason::NoGeocodeResult)
            }
            Err(e) => {
                tracing::warn!("Geocoding {:?} failed, dropping {}: {}", title, raw.id, e);
                ResolveOutcome::Dropped(DropReason::GeocodeFailed(e.to_string()))
            }
        }
    }

    /// Resolve a batch, returning resolved events in input order.
    pub async fn resolve_all(&self, raws: &[CalendarEvent]) -> (Vec<Event>, ResolutionReport) {
        let limit = self.options.max_concurrent_lookups.max(1);

        let mut outcomes: Vec<(usize, ResolveOutcome)> = stream::iter(raws.iter().enumerate())
            .map(|(index, raw)| async move { (index, self.resolve_event(raw).await) })
            .buffer_unordered(limit)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = ResolutionReport {
            total: raws.len(),
            ..ResolutionReport::default()
        };
        let mut events = Vec::with_capacity(outcomes.len());

        for (index, outcome) in outcomes {
            match outcome {
                ResolveOutcome::LocatedByCoordinate(event) => {
                    report.by_coordinate += 1;
                    events.push(event);
                }
                ResolveOutcome::LocatedByGeocode(event) => {
                    report.by_geocode += 1;
                    events.push(event);
                }
                ResolveOutcome::Dropped(reason) => {
                    report.dropped.push((raws[index].id.clone(), reason));
                }
            }
        }
        report.with_weather = events.iter().filter(|e| e.weather.is_some()).count();

        (events, report)
    }

    /// Run a full pass: check access, load events for the configured window,
    /// resolve them and publish the result.
    ///
    /// Concurrent calls wait for the run in progress. A cancelled run
    /// returns [`CalendarError::Cancelled`] and leaves the store untouched.
    pub async fn run(
        &self,
        source: &dyn CalendarSource,
        cancel: &CancellationToken,
    ) -> Result<ResolutionReport, CalendarError> {
        let mut store = self.store.lock().await;

        let work = async {
            ensure_access(source).await?;

            let window = TimeWindow::weeks_from(Utc::now(), self.options.window_weeks)
                .ok_or(CalendarError::InvalidWindow(self.options.window_weeks))?;
            let calendars = source.calendars().await?;
            let raws = source.events_matching(&window, &calendars).await?;
            tracing::info!(
                "Resolving {} events from {} calendars",
                raws.len(),
                calendars.len()
            );

            Ok::<_, CalendarError>(self.resolve_all(&raws).await)
        };

        let (events, report) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Resolution cancelled");
                return Err(CalendarError::Cancelled);
            }
            result = work => result?,
        };

        let generation = store.replace_all(events);
        tracing::info!(
            "Published {} of {} events (generation {}, {} dropped)",
            report.resolved(),
            report.total,
            generation,
            report.dropped.len()
        );

        Ok(report)
    }

    async fn build_event(
        &self,
        raw: &CalendarEvent,
        coordinate: Coordinate,
        placemark: Option<Placemark>,
    ) -> Event {
        Event {
            title: raw.title.clone(),
            start_date: raw.start,
            end_date: raw.end,
            coordinate,
            placemark,
            weather: self.lookup_weather(raw, &coordinate).await,
        }
    }

    async fn lookup_weather(
        &self,
        raw: &CalendarEvent,
        coordinate: &Coordinate,
    ) -> Option<CurrentWeather> {
        let weather = self.weather.as_ref()?;
        match weather.weather_at(coordinate, raw.start).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!("Weather lookup failed for {}: {}", raw.id, e);
                None
            }
        }
    }
}
