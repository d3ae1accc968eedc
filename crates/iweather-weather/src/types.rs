use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components fall inside the valid lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Forecast query for current conditions: `"lat,lon"`.
    pub fn query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// Forecast query pinned to a point in time: `"lat,lon,unix"`.
    pub fn query_at(&self, at: DateTime<Utc>) -> String {
        format!("{},{},{}", self.latitude, self.longitude, at.timestamp())
    }
}

/// Weather condition categories mapped from forecast icon names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Unknown,
    ClearDay,
    ClearNight,
    PartlyCloudyDay,
    PartlyCloudyNight,
    Cloudy,
    Fog,
    Wind,
    Rain,
    Sleet,
    Snow,
    Hail,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert a forecast `icon` value to a condition.
    pub fn from_icon(icon: &str) -> Self {
        match icon {
            "clear-day" => Self::ClearDay,
            "clear-night" => Self::ClearNight,
            "partly-cloudy-day" => Self::PartlyCloudyDay,
            "partly-cloudy-night" => Self::PartlyCloudyNight,
            "cloudy" => Self::Cloudy,
            "fog" => Self::Fog,
            "wind" => Self::Wind,
            "rain" => Self::Rain,
            "sleet" => Self::Sleet,
            "snow" => Self::Snow,
            "hail" => Self::Hail,
            "thunderstorm" => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::ClearDay | Self::ClearNight => "Clear",
            Self::PartlyCloudyDay | Self::PartlyCloudyNight => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Wind => "Windy",
            Self::Rain => "Rain",
            Self::Sleet => "Sleet",
            Self::Snow => "Snow",
            Self::Hail => "Hail",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coordinate_query() {
        let c = Coordinate::new(37.422, -122.084);
        assert_eq!(c.query(), "37.422,-122.084");
    }

    #[test]
    fn test_coordinate_query_at() {
        let c = Coordinate::new(51.5, -0.12);
        let at = Utc.with_ymd_and_hms(2015, 7, 20, 12, 0, 0).unwrap();
        assert_eq!(c.query_at(at), "51.5,-0.12,1437393600");
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(0.0, 0.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_icon_mapping() {
        assert_eq!(WeatherCondition::from_icon("clear-day"), WeatherCondition::ClearDay);
        assert_eq!(
            WeatherCondition::from_icon("partly-cloudy-night"),
            WeatherCondition::PartlyCloudyNight
        );
        assert_eq!(WeatherCondition::from_icon("rain"), WeatherCondition::Rain);
    }

    #[test]
    fn test_unknown_icon() {
        assert_eq!(WeatherCondition::from_icon("tornado"), WeatherCondition::Unknown);
        assert_eq!(WeatherCondition::from_icon(""), WeatherCondition::Unknown);
    }

    #[test]
    fn test_condition_description() {
        assert_eq!(WeatherCondition::ClearNight.description(), "Clear");
        assert_eq!(WeatherCondition::Wind.description(), "Windy");
    }
}
