use std::collections::HashSet;

use serde::Serialize;

use crate::models::{FallbackReason, RawVenue, RestaurantCandidate};

/// Minimum rating a venue must carry to be shown
const MIN_RATING: f64 = 4.0;

/// Name fragments that indicate a venue we never recommend for dinner
const NAME_BLOCKLIST: [&str; 4] = ["food truck", "truck", "club", "bar"];

/// Place-type fragments that indicate a drinking venue rather than a
/// restaurant. Matched as substrings, so `sports_bar` and `wine_bar`
/// are caught too.
const TYPE_BLOCKLIST: [&str; 2] = ["bar", "night_club"];

/// Side-channel describing how a result set was produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchMeta {
    pub keyword: String,
    pub radius_m: u32,
    pub source: String,
    pub duration_ms: u64,
    pub raw_count: usize,
    pub returned_count: usize,
    pub place_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

/// Whether a raw venue qualifies for presentation.
///
/// Requires an operational status, a rating of at least 4.0 (a missing
/// rating fails), currently open, and no blocklisted name fragment or
/// place type. Matching is case-insensitive throughout.
pub fn passes_filter(venue: &RawVenue) -> bool {
    if venue.business_status.as_deref() != Some("OPERATIONAL") {
        return false;
    }
    match venue.rating {
        Some(rating) if rating >= MIN_RATING => {}
        _ => return false,
    }
    if !venue.open_now() {
        return false;
    }

    let name = venue.name.to_lowercase();
    if NAME_BLOCKLIST.iter().any(|frag| name.contains(frag)) {
        return false;
    }

    !venue.types.iter().any(|t| {
        let tag = t.to_lowercase();
        TYPE_BLOCKLIST.iter().any(|frag| tag.contains(frag))
    })
}

/// Converts a raw venue into a presentable candidate.
/// `photo_url` and `website` synthesis is left to the provider layer.
pub fn to_candidate(venue: &RawVenue) -> RestaurantCandidate {
    RestaurantCandidate {
        place_id: venue.place_id.clone(),
        name: venue.name.clone(),
        rating: venue.rating,
        address: venue.vicinity.clone(),
        open_now: venue.open_now(),
        business_status: venue.business_status.clone(),
        types: venue.types.clone(),
        photo_url: None,
        website: None,
        is_fallback: false,
        trigger_reroll: false,
    }
}

/// Filters, converts, and dedupes a raw result set.
///
/// Dedup keys on `place_id` when present, otherwise on a name+address
/// composite, keeping the first occurrence. When nothing survives, the
/// output is exactly one fallback sentinel tagged with `reason`; callers
/// never see an empty list and never see an error from this stage.
pub fn transform(
    venues: &[RawVenue],
    reason_if_empty: FallbackReason,
    mut meta: SearchMeta,
) -> (Vec<RestaurantCandidate>, SearchMeta) {
    meta.raw_count = venues.len();

    let mut seen: HashSet<String> = HashSet::new();
    let mut results: Vec<RestaurantCandidate> = Vec::new();
    for venue in venues {
        if !passes_filter(venue) {
            continue;
        }
        let candidate = to_candidate(venue);
        if seen.insert(candidate.identity_key()) {
            results.push(candidate);
        }
    }

    if results.is_empty() {
        meta.fallback_reason = Some(reason_if_empty);
        results.push(RestaurantCandidate::fallback_sentinel());
        tracing::info!(reason = ?reason_if_empty, "No venue qualified; serving fallback");
    }

    meta.returned_count = results.len();
    meta.place_ids = results
        .iter()
        .filter_map(|r| r.place_id.clone())
        .collect();

    (results, meta)
}

/// A result set that never touched a venue source, e.g. when the API key
/// is absent or the upstream call failed.
pub fn fallback_only(reason: FallbackReason, meta: SearchMeta) -> (Vec<RestaurantCandidate>, SearchMeta) {
    transform(&[], reason, meta)
}
