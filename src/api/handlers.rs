use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::StoreKey;
use crate::error::{AppError, AppResult};
use crate::models::{
    taxonomy, Combination, FilterState, Layer, Mood, RestaurantCandidate, SignalBundle,
    TimeCategory, UserPreferences, WeatherSignal,
};
use crate::services::feedback::{self, FeedbackWeights};
use crate::services::recommender::Suggestion;
use crate::services::rotation::{RerollOutcome, RotationEngine};
use crate::services::search::{self, SearchOutcome};
use crate::services::signals;
use crate::services::suggest::SuggestResponse;
use crate::services::transform::SearchMeta;
use crate::services::query;

use super::state::{self, RotationSession};
use super::AppState;

const ANONYMOUS_USER: &str = "anonymous";

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub mood: Mood,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Previous combination, so near-wildcard rolls avoid repeating it
    pub previous: Option<Combination>,
    /// Fixed RNG seed, for reproducible draws
    pub seed: Option<u64>,
    /// How many combination rerolls the client has already used
    #[serde(default)]
    pub reroll_count: u32,
    #[serde(default)]
    pub premium: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub suggestion: Suggestion,
    pub restaurants: Vec<RestaurantCandidate>,
    pub meta: SearchMeta,
    pub weather: WeatherSignal,
    pub time_category: TimeCategory,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub combo: Combination,
    #[serde(default)]
    pub mood: Mood,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    #[serde(flatten)]
    pub signal: WeatherSignal,
    pub time_category: TimeCategory,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub mood: Mood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accepted,
    Rejected,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: Option<String>,
    pub combo: Combination,
    pub verdict: Verdict,
    /// The restaurant the verdict was about; accepts save it
    pub restaurant: Option<RestaurantCandidate>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub weights: FeedbackWeights,
    pub history_len: usize,
    pub saved_count: usize,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub layer: Layer,
    pub label: &'static str,
    pub options: &'static [crate::models::CategoryOption],
}

#[derive(Debug, Deserialize)]
pub struct RotationStartRequest {
    pub user_id: Option<String>,
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub combo: Combination,
    #[serde(default)]
    pub mood: Mood,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Premium sessions are not reroll-capped
    #[serde(default)]
    pub premium: bool,
}

#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub session_id: Uuid,
    pub current: Option<RestaurantCandidate>,
    pub rerolls_used: u32,
    pub reroll_cap: u32,
    pub advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<SearchMeta>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Static taxonomy catalog, one entry per layer
pub async fn get_options() -> Json<Vec<OptionsResponse>> {
    let catalog = Layer::ALL
        .iter()
        .map(|layer| OptionsResponse {
            layer: *layer,
            label: layer.label(),
            options: taxonomy::options(*layer),
        })
        .collect();
    Json(catalog)
}

/// Full recommendation flow: pick a combination, then search venues for it
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<RecommendResponse>> {
    let user_id = request.user_id.as_deref().unwrap_or(ANONYMOUS_USER);
    let (lat, lng) = coords(&state, request.lat, request.lng)?;

    let signals = gather_signals(&state, user_id, request.mood, lat, lng).await;
    let weights: FeedbackWeights = state
        .kv
        .get_or_default(&StoreKey::FeedbackWeights(user_id.to_string()))
        .await;
    let history: Vec<Combination> = state
        .kv
        .get_or_default(&StoreKey::RerollHistory(user_id.to_string()))
        .await;
    let saved: Vec<RestaurantCandidate> = state
        .kv
        .get_or_default(&StoreKey::SavedRestaurants(user_id.to_string()))
        .await;

    // Free-tier quota: once combination rerolls run out, re-present the
    // previous pick instead of drawing a new one.
    let quota_spent = !request.premium && request.reroll_count >= state.config.combo_reroll_cap;
    let suggestion = match (&request.previous, quota_spent) {
        (Some(previous), true) => {
            tracing::debug!(user_id = %user_id, "Combo reroll quota spent; echoing previous");
            state
                .recommender
                .appraise(previous, &signals, &weights, &saved, &history)
        }
        _ => {
            let mut rng = match request.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            state.recommender.suggest_avoiding(
                &request.filters,
                &signals,
                &weights,
                &saved,
                &history,
                request.previous.as_ref(),
                &mut rng,
            )
        }
    };

    let plan = query::build_plan(&suggestion.combo, &request.filters, &signals);
    let outcome = search::run_search(state.places.as_ref(), lat, lng, &plan).await;

    Ok(Json(RecommendResponse {
        suggestion,
        restaurants: outcome.results,
        meta: outcome.meta,
        weather: signals.weather.clone().unwrap_or_else(|| {
            WeatherSignal::unknown("unconfigured")
        }),
        time_category: signals.time_category,
    }))
}

/// Venue search for an explicit combination, without rolling a new one
pub async fn search_places(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Json<SearchOutcome>> {
    let user_id = request.user_id.as_deref().unwrap_or(ANONYMOUS_USER);
    let (lat, lng) = coords(&state, request.lat, request.lng)?;

    let signals = gather_signals(&state, user_id, request.mood, lat, lng).await;
    let plan = query::build_plan(&request.combo, &request.filters, &signals);
    let outcome = search::run_search(state.places.as_ref(), lat, lng, &plan).await;
    Ok(Json(outcome))
}

/// Current weather signal with the time-of-day category
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> AppResult<Json<WeatherResponse>> {
    let (lat, lng) = coords(&state, params.lat, params.lng)
        .map_err(|_| AppError::BadRequest("invalid_coordinates".to_string()))?;
    let signal = state.weather.get(lat, lng).await;
    Ok(Json(WeatherResponse {
        signal,
        time_category: signals::current_time_category(),
    }))
}

/// Free-text dining suggestions for the user's current context
pub async fn suggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Json<SuggestResponse> {
    let user_id = request.user_id.as_deref().unwrap_or(ANONYMOUS_USER);
    let (lat, lng) = (state.config.default_lat, state.config.default_lng);
    let signals = gather_signals(&state, user_id, request.mood, lat, lng).await;
    Json(state.suggest.suggest(user_id, &signals).await)
}

/// Stored taste preferences for a user
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<UserPreferences> {
    let prefs: UserPreferences = state
        .kv
        .get_or_default(&StoreKey::Preferences(user_id))
        .await;
    Json(prefs)
}

/// Replaces a user's stored preferences
pub async fn put_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(prefs): Json<UserPreferences>,
) -> Json<UserPreferences> {
    state
        .kv
        .set_in_background(&StoreKey::Preferences(user_id), &prefs);
    Json(prefs)
}

/// Records accept/reject feedback for a combination.
///
/// Accepts adjust the stored weights up, rejects adjust them down and
/// append to the reroll history that drives the recency penalty.
pub async fn post_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Json<FeedbackResponse> {
    let user_id = request
        .user_id
        .as_deref()
        .unwrap_or(ANONYMOUS_USER)
        .to_string();

    let mut weights: FeedbackWeights = state
        .kv
        .get_or_default(&StoreKey::FeedbackWeights(user_id.clone()))
        .await;
    let mut history: Vec<Combination> = state
        .kv
        .get_or_default(&StoreKey::RerollHistory(user_id.clone()))
        .await;
    let mut saved: Vec<RestaurantCandidate> = state
        .kv
        .get_or_default(&StoreKey::SavedRestaurants(user_id.clone()))
        .await;

    match request.verdict {
        Verdict::Accepted => {
            weights.record_accept(&request.combo);
            if let Some(restaurant) = request.restaurant {
                let key = restaurant.identity_key();
                if !saved.iter().any(|r| r.identity_key() == key) {
                    saved.push(restaurant);
                    state
                        .kv
                        .set_in_background(&StoreKey::SavedRestaurants(user_id.clone()), &saved);
                }
            }
        }
        Verdict::Rejected => {
            weights.record_reject(&request.combo);
            feedback::push_history(&mut history, request.combo.clone());
            state
                .kv
                .set_in_background(&StoreKey::RerollHistory(user_id.clone()), &history);
        }
    }
    state
        .kv
        .set_in_background(&StoreKey::FeedbackWeights(user_id), &weights);

    Json(FeedbackResponse {
        weights,
        history_len: history.len(),
        saved_count: saved.len(),
    })
}

/// Starts a presentation rotation over a fresh venue search
pub async fn start_rotation(
    State(state): State<AppState>,
    Json(request): Json<RotationStartRequest>,
) -> AppResult<Json<RotationResponse>> {
    let user_id = request.user_id.as_deref().unwrap_or(ANONYMOUS_USER);
    let (lat, lng) = coords(&state, request.lat, request.lng)?;

    let signals = gather_signals(&state, user_id, request.mood, lat, lng).await;
    let plan = query::build_plan(&request.combo, &request.filters, &signals);
    let outcome = search::run_search(state.places.as_ref(), lat, lng, &plan).await;

    let reroll_cap = if request.premium {
        u32::MAX
    } else {
        state.config.rotation_reroll_cap
    };
    let engine = RotationEngine::new(outcome.results, reroll_cap);
    let session_id = Uuid::new_v4();
    let response = RotationResponse {
        session_id,
        current: engine.current().cloned(),
        rerolls_used: engine.rerolls_used(),
        reroll_cap,
        advanced: true,
        reason: None,
        meta: Some(outcome.meta),
    };

    let mut rotations = state.rotations.write().await;
    state::evict_sessions(&mut rotations, Instant::now());
    rotations.insert(
        session_id,
        RotationSession {
            engine,
            lat,
            lng,
            plan,
            touched_at: Instant::now(),
        },
    );
    drop(rotations);

    tracing::info!(session_id = %session_id, "Rotation started");
    Ok(Json(response))
}

/// Advances a rotation to the next candidate.
///
/// An exhausted list triggers a refetch when allowed; the cap makes the
/// call a no-op that re-serves the current candidate.
pub async fn reroll_rotation(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<RotationResponse>> {
    let mut rotations = state.rotations.write().await;
    let session = rotations
        .get_mut(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown rotation session {}", session_id)))?;
    session.touch();

    let mut advanced = true;
    let mut reason = None;
    let mut meta = None;
    match session.engine.reroll() {
        RerollOutcome::Next(_) | RerollOutcome::Wrapped(_) => {}
        RerollOutcome::CapReached => {
            advanced = false;
            reason = Some("quota");
        }
        RerollOutcome::RefreshNeeded => {
            let outcome =
                search::run_search(state.places.as_ref(), session.lat, session.lng, &session.plan)
                    .await;
            session.engine.replace_list(outcome.results);
            meta = Some(outcome.meta);
        }
    }

    Ok(Json(RotationResponse {
        session_id,
        current: session.engine.current().cloned(),
        rerolls_used: session.engine.rerolls_used(),
        reroll_cap: session.engine.reroll_cap(),
        advanced,
        reason,
        meta,
    }))
}

// Shared plumbing

/// Resolves the request coordinate, falling back to the configured
/// default market. Out-of-range coordinates are rejected.
fn coords(state: &AppState, lat: Option<f64>, lng: Option<f64>) -> AppResult<(f64, f64)> {
    let lat = lat.unwrap_or(state.config.default_lat);
    let lng = lng.unwrap_or(state.config.default_lng);
    if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(AppError::InvalidInput("invalid_coordinates".to_string()));
    }
    Ok((lat, lng))
}

/// Assembles the contextual signal bundle for one request
async fn gather_signals(
    state: &AppState,
    user_id: &str,
    mood: Mood,
    lat: f64,
    lng: f64,
) -> SignalBundle {
    let prefs: UserPreferences = state
        .kv
        .get_or_default(&StoreKey::Preferences(user_id.to_string()))
        .await;
    let weather = state.weather.get(lat, lng).await;
    SignalBundle {
        mood,
        weather: Some(weather),
        time_category: signals::current_time_category(),
        prefs,
    }
}
