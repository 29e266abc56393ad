use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::db::KvStore;
use crate::services::providers::{
    google_places::GooglePlacesSource, open_weather::OpenWeatherSource, RestaurantSource,
    WeatherSource,
};
use crate::services::query::QueryPlan;
use crate::services::recommender::Recommender;
use crate::services::rotation::RotationEngine;
use crate::services::signals::WeatherCache;
use crate::services::suggest::SuggestService;

/// How long an untouched rotation session stays alive
const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Hard cap on live rotation sessions; oldest-touched go first
const MAX_SESSIONS: usize = 1024;

/// One live presentation rotation plus what we need to refetch its list
pub struct RotationSession {
    pub engine: RotationEngine,
    pub lat: f64,
    pub lng: f64,
    pub plan: QueryPlan,
    pub touched_at: Instant,
}

impl RotationSession {
    pub fn touch(&mut self) {
        self.touched_at = Instant::now();
    }
}

/// Drops sessions idle past the TTL, then enforces the session cap by
/// evicting the least recently touched. Run on every session insert so
/// the map cannot grow without bound.
pub(crate) fn evict_sessions(sessions: &mut HashMap<Uuid, RotationSession>, now: Instant) {
    sessions.retain(|_, session| now.duration_since(session.touched_at) < SESSION_IDLE_TTL);

    while sessions.len() >= MAX_SESSIONS {
        let oldest = sessions
            .iter()
            .min_by_key(|(_, session)| session.touched_at)
            .map(|(id, _)| *id);
        match oldest {
            Some(id) => {
                sessions.remove(&id);
            }
            None => break,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub kv: KvStore,
    pub places: Option<Arc<dyn RestaurantSource>>,
    pub weather: Arc<WeatherCache>,
    pub suggest: Arc<SuggestService>,
    pub recommender: Arc<Recommender>,
    pub rotations: Arc<RwLock<HashMap<Uuid, RotationSession>>>,
}

impl AppState {
    /// Wires up state from configuration.
    ///
    /// A missing Places key leaves `places` unset, which routes searches
    /// to the built-in sample venues; a missing weather key leaves the
    /// weather cache serving unknown signals.
    pub fn new(config: Config, kv: KvStore) -> Self {
        let places: Option<Arc<dyn RestaurantSource>> =
            config.places_api_key.clone().map(|key| {
                Arc::new(GooglePlacesSource::new(key, config.places_api_url.clone()))
                    as Arc<dyn RestaurantSource>
            });

        let weather_source: Option<Arc<dyn WeatherSource>> =
            config.weather_api_key.clone().map(|key| {
                Arc::new(OpenWeatherSource::new(key, config.weather_api_url.clone()))
                    as Arc<dyn WeatherSource>
            });

        let suggest = Arc::new(SuggestService::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
        ));

        Self {
            config: Arc::new(config),
            kv,
            places,
            weather: Arc::new(WeatherCache::new(weather_source)),
            suggest,
            recommender: Arc::new(Recommender::default()),
            rotations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(touched_at: Instant) -> RotationSession {
        RotationSession {
            engine: RotationEngine::new(Vec::new(), 6),
            lat: 30.3322,
            lng: -81.6557,
            plan: QueryPlan {
                radius_m: 5_000,
                keyword: "Casual Thai".to_string(),
                hints: Vec::new(),
            },
            touched_at,
        }
    }

    #[test]
    fn test_idle_sessions_are_evicted_after_ttl() {
        let base = Instant::now();
        let mut sessions = HashMap::new();
        let stale_id = Uuid::new_v4();
        let fresh_id = Uuid::new_v4();
        sessions.insert(stale_id, session_at(base));
        sessions.insert(fresh_id, session_at(base + SESSION_IDLE_TTL));

        evict_sessions(&mut sessions, base + SESSION_IDLE_TTL);
        assert!(!sessions.contains_key(&stale_id));
        assert!(sessions.contains_key(&fresh_id));
    }

    #[test]
    fn test_session_cap_evicts_least_recently_touched() {
        let base = Instant::now();
        let mut sessions = HashMap::new();
        let mut ids = Vec::new();
        for i in 0..(MAX_SESSIONS + 5) {
            let id = Uuid::new_v4();
            sessions.insert(id, session_at(base + Duration::from_secs(i as u64)));
            ids.push(id);
        }

        // Latest touch as "now" so nothing here is TTL-stale
        evict_sessions(
            &mut sessions,
            base + Duration::from_secs((MAX_SESSIONS + 4) as u64),
        );

        assert_eq!(sessions.len(), MAX_SESSIONS - 1);
        assert!(!sessions.contains_key(&ids[0]));
        assert!(sessions.contains_key(ids.last().unwrap()));
    }
}
