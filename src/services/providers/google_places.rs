//! Google Places nearby-search adapter.
//!
//! Hits the Places Nearby Search endpoint with a coordinate, radius, and
//! keyword, restricted to the `restaurant` type. Photo references are
//! turned into public photo URLs and place ids into maps links so clients
//! never need the API key.

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::RawVenue,
    services::providers::RestaurantSource,
};

#[derive(Clone)]
pub struct GooglePlacesSource {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl GooglePlacesSource {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[derive(Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<RawVenue>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[async_trait::async_trait]
impl RestaurantSource for GooglePlacesSource {
    async fn search(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        keyword: &str,
    ) -> AppResult<Vec<RawVenue>> {
        let url = format!("{}/nearbysearch/json", self.api_url);
        let location = format!("{},{}", lat, lng);
        let radius = radius_m.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", "restaurant"),
                ("keyword", keyword),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Places API returned status {}: {}",
                status, body
            )));
        }

        let payload: NearbySearchResponse = response.json().await?;

        // ZERO_RESULTS is a normal empty answer, not a failure
        match payload.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => {
                return Err(AppError::ExternalApi(format!(
                    "Places API status {}: {}",
                    other,
                    payload.error_message.unwrap_or_default()
                )));
            }
        }

        tracing::info!(
            results = payload.results.len(),
            radius_m,
            keyword = %keyword,
            provider = "google_places",
            "Nearby search completed"
        );

        Ok(payload.results)
    }

    fn name(&self) -> &'static str {
        "google_places"
    }

    fn photo_url(&self, photo_reference: &str) -> Option<String> {
        Some(format!(
            "{}/photo?maxwidth=800&photo_reference={}&key={}",
            self.api_url, photo_reference, self.api_key
        ))
    }

    fn maps_url(&self, place_id: &str) -> Option<String> {
        Some(format!(
            "https://www.google.com/maps/place/?q=place_id:{}",
            place_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_source() -> GooglePlacesSource {
        GooglePlacesSource::new(
            "test_key".to_string(),
            "http://places.local".to_string(),
        )
    }

    #[test]
    fn test_photo_url_carries_reference_and_key() {
        let url = test_source().photo_url("ref123").unwrap();
        assert!(url.contains("photo_reference=ref123"));
        assert!(url.contains("key=test_key"));
    }

    #[test]
    fn test_maps_url_targets_place_id() {
        let url = test_source().maps_url("ChIJabc").unwrap();
        assert_eq!(url, "https://www.google.com/maps/place/?q=place_id:ChIJabc");
    }

    #[test]
    fn test_nearby_response_deserializes_zero_results() {
        let json = r#"{ "results": [], "status": "ZERO_RESULTS" }"#;
        let payload: NearbySearchResponse = serde_json::from_str(json).unwrap();
        assert!(payload.results.is_empty());
        assert_eq!(payload.status, "ZERO_RESULTS");
    }

    #[test]
    fn test_nearby_response_deserializes_results() {
        let json = r#"{
            "results": [{
                "place_id": "ChIJabc",
                "name": "Bella Vita",
                "rating": 4.6,
                "vicinity": "123 Main St",
                "business_status": "OPERATIONAL",
                "opening_hours": { "open_now": true },
                "types": ["restaurant"]
            }],
            "status": "OK"
        }"#;
        let payload: NearbySearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(payload.results.len(), 1);
        assert_eq!(payload.results[0].name, "Bella Vita");
    }
}
