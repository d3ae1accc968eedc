//! Weather and location lookups for iWeather
//!
//! Forecast fetching and parsing, forward/reverse geocoding, and place
//! autocomplete.

pub mod error;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod suggest;
pub mod types;

pub use error::{GeocodeError, ParseError, WeatherError};
pub use geocode::{Geocoder, NominatimGeocoder, Placemark};
pub use model::{CurrentWeather, DailyWeather, Forecast, RawRecord, Weather};
pub use provider::{WeatherProvider, WeatherSource};
pub use suggest::{LocationSuggestion, PlacesClient};
pub use types::{Coordinate, WeatherCondition};
