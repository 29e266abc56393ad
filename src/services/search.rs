use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::models::{FallbackReason, RestaurantCandidate};
use crate::services::providers::{mock, RestaurantSource};
use crate::services::query::QueryPlan;
use crate::services::transform::{self, SearchMeta};

/// A completed venue search: presentable candidates plus the metadata
/// side channel describing how they were produced.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RestaurantCandidate>,
    pub meta: SearchMeta,
}

/// Runs one venue search end to end.
///
/// With no source configured the built-in sample venues stand in and the
/// metadata is tagged `missing_api_key`. Upstream failures degrade to the
/// fallback sentinel rather than erroring; callers always get at least
/// one candidate.
pub async fn run_search(
    source: Option<&Arc<dyn RestaurantSource>>,
    lat: f64,
    lng: f64,
    plan: &QueryPlan,
) -> SearchOutcome {
    let started = Instant::now();
    let mut meta = SearchMeta {
        keyword: plan.keyword.clone(),
        radius_m: plan.radius_m,
        hints: plan.hints.clone(),
        ..SearchMeta::default()
    };

    let (results, mut meta) = match source {
        None => {
            meta.source = "sample".to_string();
            let venues = mock::sample_venues();
            let (results, mut meta) =
                transform::transform(&venues, FallbackReason::NoResults, meta);
            meta.fallback_reason = Some(FallbackReason::MissingApiKey);
            (results, meta)
        }
        Some(source) => {
            meta.source = source.name().to_string();
            match source.search(lat, lng, plan.radius_m, &plan.keyword).await {
                Ok(venues) => {
                    let (mut results, meta) =
                        transform::transform(&venues, FallbackReason::NoResults, meta);
                    enrich(source.as_ref(), &venues, &mut results);
                    (results, meta)
                }
                Err(err) => {
                    tracing::error!(error = %err, keyword = %plan.keyword, "Venue search failed");
                    transform::fallback_only(FallbackReason::ApiError, meta)
                }
            }
        }
    };

    meta.duration_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        source = %meta.source,
        returned = meta.returned_count,
        duration_ms = meta.duration_ms,
        "Search completed"
    );

    SearchOutcome { results, meta }
}

/// Fills in photo and maps links from the source, keyed by place id
fn enrich(
    source: &dyn RestaurantSource,
    venues: &[crate::models::RawVenue],
    results: &mut [RestaurantCandidate],
) {
    for candidate in results.iter_mut() {
        if candidate.is_fallback {
            continue;
        }
        if let Some(place_id) = candidate.place_id.clone() {
            candidate.website = source.maps_url(&place_id);
            candidate.photo_url = venues
                .iter()
                .find(|v| v.place_id.as_deref() == Some(place_id.as_str()))
                .and_then(|v| v.photos.first())
                .and_then(|photo| source.photo_url(&photo.photo_reference));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{RawPhoto, RawVenue};
    use crate::services::providers::MockRestaurantSource;

    fn plan() -> QueryPlan {
        QueryPlan {
            radius_m: 5_000,
            keyword: "Casual Thai".to_string(),
            hints: vec!["Dinner".to_string()],
        }
    }

    #[tokio::test]
    async fn test_unconfigured_source_serves_samples_with_reason() {
        let outcome = run_search(None, 30.0, -81.0, &plan()).await;
        assert!(!outcome.results.is_empty());
        assert!(outcome.results.iter().all(|r| !r.is_fallback));
        assert_eq!(
            outcome.meta.fallback_reason,
            Some(FallbackReason::MissingApiKey)
        );
        assert_eq!(outcome.meta.source, "sample");
    }

    #[tokio::test]
    async fn test_source_error_degrades_to_sentinel() {
        let mut source = MockRestaurantSource::new();
        source
            .expect_search()
            .returning(|_, _, _, _| Err(AppError::ExternalApi("quota".to_string())));
        source.expect_name().return_const("google_places");

        let source: Arc<dyn RestaurantSource> = Arc::new(source);
        let outcome = run_search(Some(&source), 30.0, -81.0, &plan()).await;
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].is_fallback);
        assert_eq!(outcome.meta.fallback_reason, Some(FallbackReason::ApiError));
    }

    #[tokio::test]
    async fn test_enrichment_links_photo_and_maps() {
        let venue = RawVenue {
            place_id: Some("p1".to_string()),
            name: "Bella Vita".to_string(),
            rating: Some(4.5),
            vicinity: Some("1 Main St".to_string()),
            business_status: Some("OPERATIONAL".to_string()),
            opening_hours: Some(crate::models::RawOpeningHours {
                open_now: Some(true),
            }),
            types: vec!["restaurant".to_string()],
            photos: vec![RawPhoto {
                photo_reference: "ref1".to_string(),
            }],
        };

        let mut source = MockRestaurantSource::new();
        source
            .expect_search()
            .returning(move |_, _, _, _| Ok(vec![venue.clone()]));
        source.expect_name().return_const("google_places");
        source
            .expect_maps_url()
            .returning(|id| Some(format!("https://maps.example/{}", id)));
        source
            .expect_photo_url()
            .returning(|r| Some(format!("https://photos.example/{}", r)));

        let source: Arc<dyn RestaurantSource> = Arc::new(source);
        let outcome = run_search(Some(&source), 30.0, -81.0, &plan()).await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(
            outcome.results[0].website.as_deref(),
            Some("https://maps.example/p1")
        );
        assert_eq!(
            outcome.results[0].photo_url.as_deref(),
            Some("https://photos.example/ref1")
        );
    }

    #[tokio::test]
    async fn test_meta_echoes_plan_fields() {
        let outcome = run_search(None, 30.0, -81.0, &plan()).await;
        assert_eq!(outcome.meta.keyword, "Casual Thai");
        assert_eq!(outcome.meta.radius_m, 5_000);
        assert_eq!(outcome.meta.hints, vec!["Dinner".to_string()]);
    }
}
