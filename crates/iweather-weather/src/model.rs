//! Typed weather records parsed from raw forecast JSON.
//!
//! A forecast payload is a JSON object whose `currently` block and
//! `daily.data` entries share the same base fields (`summary`, `icon`,
//! `temperature`, ...). Every snapshot carries a Unix `time` which is
//! rendered into a display string in the payload's UTC offset.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::types::WeatherCondition;

/// A raw weather record keyed by field name.
pub type RawRecord = serde_json::Map<String, Value>;

/// Long date, short time: "July 20, 2015 at 1:46 PM".
const LONG_DATE_SHORT_TIME: &str = "%B %-d, %Y at %-I:%M %p";
/// Long date only: "July 20, 2015".
const LONG_DATE: &str = "%B %-d, %Y";

/// Unwrap a JSON value into a record, rejecting arrays and scalars.
pub fn into_record(value: Value) -> Result<RawRecord, ParseError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAnObject),
    }
}

/// Fields shared by every weather snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Weather {
    pub summary: Option<String>,
    pub condition: WeatherCondition,
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    /// Relative humidity, 0.0 to 1.0
    pub humidity: Option<f64>,
    /// Probability of precipitation, 0.0 to 1.0
    pub precip_probability: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl Weather {
    /// Extract the base fields. All are optional, but a present field
    /// with the wrong JSON type is rejected.
    pub fn parse(raw: &RawRecord) -> Result<Self, ParseError> {
        let condition = optional_str(raw, "icon")?
            .map(WeatherCondition::from_icon)
            .unwrap_or_default();

        Ok(Self {
            summary: optional_str(raw, "summary")?.map(str::to_string),
            condition,
            temperature: optional_f64(raw, "temperature")?,
            apparent_temperature: optional_f64(raw, "apparentTemperature")?,
            humidity: optional_f64(raw, "humidity")?,
            precip_probability: optional_f64(raw, "precipProbability")?,
            wind_speed: optional_f64(raw, "windSpeed")?,
        })
    }
}

/// Conditions at a single instant, with a display date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(flatten)]
    pub weather: Weather,
    pub time: DateTime<Utc>,
    /// e.g. "July 20, 2015 at 1:46 PM"
    pub date: String,
}

impl CurrentWeather {
    /// Parse with the display date rendered in UTC.
    pub fn parse(raw: &RawRecord) -> Result<Self, ParseError> {
        Self::parse_in(raw, Utc.fix())
    }

    /// Parse with the display date rendered at `offset`.
    pub fn parse_in(raw: &RawRecord, offset: FixedOffset) -> Result<Self, ParseError> {
        let time = required_time(raw)?;
        let date = time
            .with_timezone(&offset)
            .format(LONG_DATE_SHORT_TIME)
            .to_string();

        Ok(Self {
            weather: Weather::parse(raw)?,
            time,
            date,
        })
    }
}

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    #[serde(flatten)]
    pub weather: Weather,
    pub time: DateTime<Utc>,
    /// e.g. "July 20, 2015"
    pub date: String,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
}

impl DailyWeather {
    pub fn parse(raw: &RawRecord) -> Result<Self, ParseError> {
        Self::parse_in(raw, Utc.fix())
    }

    pub fn parse_in(raw: &RawRecord, offset: FixedOffset) -> Result<Self, ParseError> {
        let time = required_time(raw)?;
        let date = time.with_timezone(&offset).format(LONG_DATE).to_string();

        // Older payloads use Min/Max, newer ones Low/High
        let temperature_min = match optional_f64(raw, "temperatureMin")? {
            Some(t) => Some(t),
            None => optional_f64(raw, "temperatureLow")?,
        };
        let temperature_max = match optional_f64(raw, "temperatureMax")? {
            Some(t) => Some(t),
            None => optional_f64(raw, "temperatureHigh")?,
        };

        Ok(Self {
            weather: Weather::parse(raw)?,
            time,
            date,
            temperature_min,
            temperature_max,
        })
    }
}

/// A full forecast response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    /// Hours east of UTC used for display dates
    pub offset_hours: f64,
    pub current: Option<CurrentWeather>,
    pub daily: Vec<DailyWeather>,
    /// Data points dropped because they failed to parse
    pub skipped_points: usize,
}

impl Forecast {
    /// Parse a forecast payload.
    ///
    /// Top-level fields must be well typed. Malformed `currently` or daily
    /// data points are skipped and counted instead of failing the whole
    /// forecast.
    pub fn parse(raw: &RawRecord) -> Result<Self, ParseError> {
        let offset_hours = optional_f64(raw, "offset")?.unwrap_or(0.0);
        let offset = offset_from_hours(offset_hours).unwrap_or_else(|| Utc.fix());
        let mut skipped_points = 0;

        let current = match raw.get("currently") {
            None | Some(Value::Null) => None,
            Some(Value::Object(block)) => match CurrentWeather::parse_in(block, offset) {
                Ok(current) => Some(current),
                Err(e) => {
                    tracing::warn!("Skipping malformed current conditions: {}", e);
                    skipped_points += 1;
                    None
                }
            },
            Some(_) => {
                return Err(ParseError::InvalidType {
                    field: "currently",
                    expected: "an object",
                })
            }
        };

        let mut daily = Vec::new();
        let points = raw
            .get("daily")
            .and_then(|d| d.get("data"))
            .and_then(Value::as_array);
        for point in points.into_iter().flatten() {
            let parsed = point
                .as_object()
                .ok_or(ParseError::NotAnObject)
                .and_then(|record| DailyWeather::parse_in(record, offset));
            match parsed {
                Ok(day) => daily.push(day),
                Err(e) => {
                    tracing::warn!("Skipping malformed daily data point: {}", e);
                    skipped_points += 1;
                }
            }
        }

        Ok(Self {
            latitude: optional_f64(raw, "latitude")?,
            longitude: optional_f64(raw, "longitude")?,
            timezone: optional_str(raw, "timezone")?.map(str::to_string),
            offset_hours,
            current,
            daily,
            skipped_points,
        })
    }
}

fn offset_from_hours(hours: f64) -> Option<FixedOffset> {
    if !hours.is_finite() {
        return None;
    }
    FixedOffset::east_opt((hours * 3600.0).round() as i32)
}

fn required_time(raw: &RawRecord) -> Result<DateTime<Utc>, ParseError> {
    let secs = match raw.get("time") {
        None | Some(Value::Null) => return Err(ParseError::MissingField("time")),
        Some(v) => v.as_i64().ok_or(ParseError::InvalidType {
            field: "time",
            expected: "an integer",
        })?,
    };
    DateTime::from_timestamp(secs, 0).ok_or(ParseError::InvalidTimestamp(secs))
}

fn optional_f64(raw: &RawRecord, field: &'static str) -> Result<Option<f64>, ParseError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or(ParseError::InvalidType {
            field,
            expected: "a number",
        }),
    }
}

fn optional_str<'a>(raw: &'a RawRecord, field: &'static str) -> Result<Option<&'a str>, ParseError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or(ParseError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        into_record(value).unwrap()
    }

    #[test]
    fn test_current_weather_parses_base_fields() {
        let raw = record(json!({
            "time": 1437400000,
            "summary": "Partly Cloudy",
            "icon": "partly-cloudy-day",
            "temperature": 78.5,
            "apparentTemperature": 80,
            "humidity": 0.62,
            "precipProbability": 0.1,
            "windSpeed": 5.4
        }));

        let current = CurrentWeather::parse(&raw).unwrap();
        assert_eq!(current.weather.summary.as_deref(), Some("Partly Cloudy"));
        assert_eq!(current.weather.condition, WeatherCondition::PartlyCloudyDay);
        assert_eq!(current.weather.temperature, Some(78.5));
        assert_eq!(current.weather.apparent_temperature, Some(80.0));
        assert_eq!(current.time.timestamp(), 1437400000);
    }

    #[test]
    fn test_current_weather_date_string() {
        // 2015-07-20 13:46:40 UTC
        let raw = record(json!({ "time": 1437400000 }));
        let current = CurrentWeather::parse(&raw).unwrap();
        assert_eq!(current.date, "July 20, 2015 at 1:46 PM");
    }

    #[test]
    fn test_date_string_is_deterministic() {
        let raw = record(json!({ "time": 1437400000, "summary": "Clear" }));
        let first = CurrentWeather::parse(&raw).unwrap();
        let second = CurrentWeather::parse(&raw).unwrap();
        assert_eq!(first.date, second.date);
    }

    #[test]
    fn test_date_string_honours_offset() {
        let raw = record(json!({ "time": 1437400000 }));
        let pacific = FixedOffset::west_opt(7 * 3600).unwrap();
        let current = CurrentWeather::parse_in(&raw, pacific).unwrap();
        assert_eq!(current.date, "July 20, 2015 at 6:46 AM");
    }

    #[test]
    fn test_missing_time_is_parse_error() {
        let raw = record(json!({ "summary": "Clear", "temperature": 70.0 }));
        assert_eq!(
            CurrentWeather::parse(&raw).unwrap_err(),
            ParseError::MissingField("time")
        );
    }

    #[test]
    fn test_null_time_is_missing() {
        let raw = record(json!({ "time": null }));
        assert_eq!(
            CurrentWeather::parse(&raw).unwrap_err(),
            ParseError::MissingField("time")
        );
    }

    #[test]
    fn test_non_integer_time_is_parse_error() {
        for bad in [json!("1437400000"), json!(1437400000.5), json!(true)] {
            let raw = record(json!({ "time": bad }));
            assert!(matches!(
                CurrentWeather::parse(&raw),
                Err(ParseError::InvalidType { field: "time", .. })
            ));
        }
    }

    #[test]
    fn test_out_of_range_time() {
        let raw = record(json!({ "time": i64::MAX }));
        assert!(matches!(
            CurrentWeather::parse(&raw),
            Err(ParseError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_mistyped_base_field() {
        let raw = record(json!({ "time": 1437400000, "temperature": "hot" }));
        assert_eq!(
            CurrentWeather::parse(&raw).unwrap_err(),
            ParseError::InvalidType {
                field: "temperature",
                expected: "a number"
            }
        );
    }

    #[test]
    fn test_daily_weather_low_high_fallback() {
        let raw = record(json!({
            "time": 1437350400,
            "temperatureLow": 60.1,
            "temperatureHigh": 82.3
        }));
        let day = DailyWeather::parse(&raw).unwrap();
        assert_eq!(day.temperature_min, Some(60.1));
        assert_eq!(day.temperature_max, Some(82.3));
        assert_eq!(day.date, "July 20, 2015");
    }

    #[test]
    fn test_forecast_skips_malformed_points() {
        let raw = record(json!({
            "latitude": 37.422,
            "longitude": -122.084,
            "timezone": "America/Los_Angeles",
            "offset": -7,
            "currently": { "time": 1437400000, "summary": "Clear", "icon": "clear-day" },
            "daily": {
                "data": [
                    { "time": 1437375600, "temperatureMin": 58.0, "temperatureMax": 75.0 },
                    { "summary": "no time here" },
                    "not an object",
                    { "time": 1437462000, "temperatureMin": 59.0, "temperatureMax": 77.0 }
                ]
            }
        }));

        let forecast = Forecast::parse(&raw).unwrap();
        assert_eq!(forecast.timezone.as_deref(), Some("America/Los_Angeles"));
        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.skipped_points, 2);

        let current = forecast.current.unwrap();
        assert_eq!(current.date, "July 20, 2015 at 6:46 AM");
    }

    #[test]
    fn test_forecast_with_malformed_current() {
        let raw = record(json!({ "currently": { "summary": "no time" } }));
        let forecast = Forecast::parse(&raw).unwrap();
        assert!(forecast.current.is_none());
        assert_eq!(forecast.skipped_points, 1);
    }

    #[test]
    fn test_forecast_rejects_non_object_currently() {
        let raw = record(json!({ "currently": [1, 2, 3] }));
        assert!(matches!(
            Forecast::parse(&raw),
            Err(ParseError::InvalidType { field: "currently", .. })
        ));
    }

    #[test]
    fn test_into_record_rejects_arrays() {
        assert_eq!(into_record(json!([1, 2])).unwrap_err(), ParseError::NotAnObject);
    }
}
