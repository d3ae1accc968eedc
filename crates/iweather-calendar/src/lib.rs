//! Calendar events annotated with location and weather.
//!
//! Reads events from a calendar source, resolves each event's location to
//! a coordinate and publishes the results to an in-memory store.

pub mod error;
pub mod google;
pub mod permission;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod types;

pub use error::CalendarError;
pub use google::GoogleCalendarSource;
pub use permission::{check_access, ensure_access, PermissionRoute};
pub use pipeline::{
    DropReason, PipelineOptions, ResolutionPipeline, ResolutionReport, ResolveOutcome,
};
pub use source::CalendarSource;
pub use store::{EventReader, EventStore};
pub use types::{
    AuthorizationStatus, Calendar, CalendarEvent, Event, StructuredLocation, TimeWindow,
};
