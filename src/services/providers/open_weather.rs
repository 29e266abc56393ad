//! OpenWeather current-conditions adapter.
//!
//! Fetches metric current weather for a coordinate and classifies it into
//! the coarse buckets the recommender's boost tables key on.

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{WeatherBucket, WeatherSignal},
    services::providers::WeatherSource,
};

/// At or below this Celsius reading the weather counts as cold
const COLD_MAX_C: f64 = 7.0;
/// At or above this Celsius reading the weather counts as hot
const HOT_MIN_C: f64 = 32.0;
/// Humid bucket threshold: warm and sticky, but not yet hot
const HUMID_MIN_C: f64 = 26.0;
const HUMID_MIN_PCT: u8 = 70;

#[derive(Clone)]
pub struct OpenWeatherSource {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl OpenWeatherSource {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[derive(Deserialize)]
struct CurrentWeatherResponse {
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    main: MainReadings,
}

#[derive(Deserialize)]
struct ConditionEntry {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
    #[serde(default)]
    humidity: Option<u8>,
}

/// Buckets a condition string and readings.
///
/// Rainy conditions win over temperature; unclassifiable weather yields
/// no bucket at all, which the recommender treats as neutral.
pub fn classify(condition: &str, temp_c: f64, humidity: Option<u8>) -> Option<WeatherBucket> {
    let lowered = condition.to_lowercase();
    if ["rain", "storm", "drizzle"]
        .iter()
        .any(|frag| lowered.contains(frag))
    {
        return Some(WeatherBucket::Rain);
    }
    if temp_c <= COLD_MAX_C {
        return Some(WeatherBucket::Cold);
    }
    if temp_c >= HOT_MIN_C {
        return Some(WeatherBucket::Hot);
    }
    if temp_c >= HUMID_MIN_C && humidity.map(|h| h >= HUMID_MIN_PCT).unwrap_or(false) {
        return Some(WeatherBucket::Humid);
    }
    None
}

/// Short dining hint for a bucket, shown alongside recommendations
pub fn hint_for(bucket: WeatherBucket) -> &'static str {
    match bucket {
        WeatherBucket::Rain => "Rainy out. A cozy spot or takeout night?",
        WeatherBucket::Cold => "Cold evening. Something warm and hearty sounds right.",
        WeatherBucket::Hot => "Scorcher today. Cold dishes and shade win.",
        WeatherBucket::Humid => "Sticky out there. Air conditioning is a feature.",
    }
}

#[async_trait::async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn fetch(&self, lat: f64, lng: f64) -> AppResult<WeatherSignal> {
        let url = format!("{}/weather", self.api_url);
        let lat_s = lat.to_string();
        let lng_s = lng.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("lat", lat_s.as_str()),
                ("lon", lng_s.as_str()),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Weather API returned status {}: {}",
                status, body
            )));
        }

        let payload: CurrentWeatherResponse = response.json().await?;
        let condition = payload
            .weather
            .first()
            .map(|w| {
                if w.description.is_empty() {
                    w.main.clone()
                } else {
                    w.description.clone()
                }
            })
            .unwrap_or_else(|| "Unknown".to_string());

        let temp_c = payload.main.temp;
        let humidity = payload.main.humidity;
        let bucket = classify(&condition, temp_c, humidity);

        tracing::debug!(
            condition = %condition,
            temp_c,
            bucket = ?bucket,
            provider = "openweather",
            "Weather fetched"
        );

        Ok(WeatherSignal {
            bucket,
            condition,
            temperature_c: Some(temp_c),
            temperature_f: Some(temp_c * 9.0 / 5.0 + 32.0),
            humidity,
            hint: bucket.map(|b| hint_for(b).to_string()),
            source: "openweather".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "openweather"
    }
}
