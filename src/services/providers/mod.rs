//! External data source abstractions.
//!
//! Venue and weather lookups sit behind traits so handlers and tests can
//! swap the live HTTP adapters for mocks, and so a missing API key can
//! degrade to the built-in sample venues without special-casing callers.

use crate::{
    error::AppResult,
    models::{RawVenue, WeatherSignal},
};

pub mod google_places;
pub mod mock;
pub mod open_weather;

/// A source of raw venue results for a nearby search
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RestaurantSource: Send + Sync {
    /// Nearby search around a coordinate, constrained by radius and keyword
    async fn search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        keyword: &str,
    ) -> AppResult<Vec<RawVenue>>;

    /// Source name for logging and result metadata
    fn name(&self) -> &'static str;

    /// Public photo URL for a raw photo reference, when the source has one
    fn photo_url(&self, _photo_reference: &str) -> Option<String> {
        None
    }

    /// Human-visitable link for a place id, when the source has one
    fn maps_url(&self, _place_id: &str) -> Option<String> {
        None
    }
}

/// A source of current weather for a coordinate
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, lat: f64, lng: f64) -> AppResult<WeatherSignal>;

    fn name(&self) -> &'static str;
}
