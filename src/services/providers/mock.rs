//! Built-in sample venues.
//!
//! Served by the search orchestrator when no Places API key is
//! configured, so the rest of the pipeline (filtering, dedup, rotation)
//! still runs end to end on realistic shapes. Deterministic, which also
//! makes the no-key path the one integration tests exercise.

use crate::models::{RawOpeningHours, RawVenue};

fn sample(place_id: &str, name: &str, rating: f64, vicinity: &str) -> RawVenue {
    RawVenue {
        place_id: Some(place_id.to_string()),
        name: name.to_string(),
        rating: Some(rating),
        vicinity: Some(vicinity.to_string()),
        business_status: Some("OPERATIONAL".to_string()),
        opening_hours: Some(RawOpeningHours {
            open_now: Some(true),
        }),
        types: vec!["restaurant".to_string(), "food".to_string()],
        photos: Vec::new(),
    }
}

pub fn sample_venues() -> Vec<RawVenue> {
    vec![
        sample("sample-1", "Bella Vita Trattoria", 4.6, "102 Riverside Ave"),
        sample("sample-2", "Thai Orchid Kitchen", 4.5, "840 Park St"),
        sample("sample-3", "El Camino Taqueria", 4.7, "15 Market Square"),
        sample("sample-4", "Sakura Sushi House", 4.4, "220 Laura St"),
        sample("sample-5", "Smoke & Oak BBQ", 4.8, "77 King St"),
        sample("sample-6", "The Garden Table", 4.3, "31 Hendricks Ave"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transform::passes_filter;

    #[test]
    fn test_every_sample_venue_passes_quality_filter() {
        for venue in sample_venues() {
            assert!(passes_filter(&venue), "{} should pass", venue.name);
        }
    }

    #[test]
    fn test_sample_place_ids_are_unique() {
        let venues = sample_venues();
        let mut ids: Vec<_> = venues
            .iter()
            .filter_map(|v| v.place_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), venues.len());
    }
}
