use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use iweather_calendar::{
    CalendarError, Event, EventStore, GoogleCalendarSource, PipelineOptions, ResolutionPipeline,
};
use iweather_core::{AppError, Config, ForecastUnits};
use iweather_weather::{NominatimGeocoder, PlacesClient, WeatherProvider};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = iweather_core::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("suggest") => suggest(&args[1..].join(" ")).await,
        _ => events().await,
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        let err = AppError::from(e);
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}

/// Resolve upcoming calendar events and print them with their weather.
async fn events() -> Result<()> {
    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let geocoder = NominatimGeocoder::new(
        &config.geocoder.base_url,
        &config.geocoder.user_agent,
        Duration::from_secs(config.geocoder.timeout_secs),
    )?;
    let geocoder = Arc::new(geocoder);

    let mut pipeline = ResolutionPipeline::new(geocoder.clone(), EventStore::new()).with_options(
        PipelineOptions {
            window_weeks: config.calendar.window_weeks,
            max_concurrent_lookups: config.pipeline.max_concurrent_lookups,
        },
    );

    if config.pipeline.annotate_weather {
        let mut provider = WeatherProvider::new(
            &config.forecast.base_url,
            &config.forecast.api_key,
            Duration::from_secs(config.forecast.timeout_secs),
        )?;
        if config.forecast.units != ForecastUnits::Auto {
            provider = provider.with_units(config.forecast.units.as_str());
        }
        pipeline = pipeline.with_weather(Arc::new(provider));
    }

    let source = GoogleCalendarSource::new(
        &config.calendar.api_base,
        config.calendar.access_token.as_deref(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let report = match pipeline.run(&source, &cancel).await {
        Ok(report) => report,
        Err(e) if e.is_permission_error() || matches!(e, CalendarError::Cancelled) => {
            println!("{}", e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!(
        "{} of {} events in the next {} weeks have a location",
        report.resolved(),
        report.total,
        config.calendar.window_weeks
    );

    for event in pipeline.reader().snapshot() {
        let place = match &event.placemark {
            Some(placemark) => Some(placemark.name.clone()),
            None => geocoder
                .reverse_geocode(&event.coordinate)
                .await
                .unwrap_or_else(|e| {
                    tracing::debug!("Reverse geocoding failed: {}", e);
                    None
                }),
        };
        print_event(&event, place.as_deref());
    }

    Ok(())
}

fn print_event(event: &Event, place: Option<&str>) {
    println!();
    println!("{}", event.title);
    println!("  {}", event.start_date.format("%a %b %-d, %-I:%M %p UTC"));
    match place {
        Some(place) => println!("  {}", place),
        None => println!(
            "  {:.4}, {:.4}",
            event.coordinate.latitude, event.coordinate.longitude
        ),
    }

    let Some(current) = &event.weather else {
        return;
    };
    let summary = current
        .weather
        .summary
        .as_deref()
        .unwrap_or_else(|| current.weather.condition.description());
    match current.weather.temperature {
        Some(temperature) => println!("  {} and {:.0}°", summary, temperature),
        None => println!("  {}", summary),
    }
}

/// Print place suggestions for partially typed text.
async fn suggest(text: &str) -> Result<()> {
    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let places = PlacesClient::new(
        &config.places.base_url,
        &config.places.api_key,
        Duration::from_secs(config.places.timeout_secs),
    )?;

    let suggestions = match places.suggest_locations(text).await {
        Ok(suggestions) => suggestions,
        Err(e) => {
            println!("{}", e.user_message());
            return Ok(());
        }
    };

    if suggestions.is_empty() {
        println!("No suggestions for {:?}", text);
    }
    for suggestion in suggestions {
        println!("{}", suggestion.description);
    }

    Ok(())
}
