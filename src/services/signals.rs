use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, Local, Timelike, Weekday};
use tokio::sync::Mutex;

use crate::models::{TimeCategory, WeatherSignal};
use crate::services::providers::WeatherSource;

/// How long a successful weather reading stays fresh
const WEATHER_TTL: Duration = Duration::from_secs(30 * 60);
/// How long a failed lookup is remembered before retrying
const NEGATIVE_TTL: Duration = Duration::from_secs(10 * 60);

/// Maps an hour of day (and weekend-ness) to a time category.
///
/// Brunch only exists on weekends and shadows the breakfast/lunch overlap
/// in its window. Hours before 3 still belong to the previous night.
pub fn time_category_at(hour: u32, is_weekend: bool) -> TimeCategory {
    match hour {
        0..=2 => TimeCategory::LateNight,
        3..=5 => TimeCategory::EarlyRiser,
        9..=13 if is_weekend => TimeCategory::Brunch,
        6..=10 => TimeCategory::Breakfast,
        11..=14 => TimeCategory::Lunch,
        15..=16 => TimeCategory::Snack,
        17..=21 => TimeCategory::Dinner,
        _ => TimeCategory::LateNight,
    }
}

/// Time category for the server's local clock
pub fn current_time_category() -> TimeCategory {
    let now = Local::now();
    let is_weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
    time_category_at(now.hour(), is_weekend)
}

struct CacheEntry {
    signal: WeatherSignal,
    fetched_at: Instant,
    negative: bool,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        let ttl = if self.negative {
            NEGATIVE_TTL
        } else {
            WEATHER_TTL
        };
        now.duration_since(self.fetched_at) < ttl
    }
}

/// Memoizing front for the weather source.
///
/// Keys on the coordinate rounded to two decimals (about a kilometer), so
/// nearby requests share one reading. Concurrent misses for the same key
/// coalesce onto a single upstream call via a per-key lock. Failures are
/// cached negatively with a shorter TTL and never surface as errors.
pub struct WeatherCache {
    source: Option<Arc<dyn WeatherSource>>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WeatherCache {
    pub fn new(source: Option<Arc<dyn WeatherSource>>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(lat: f64, lng: f64) -> String {
        format!("{:.2},{:.2}", lat, lng)
    }

    pub async fn get(&self, lat: f64, lng: f64) -> WeatherSignal {
        let Some(source) = self.source.clone() else {
            return WeatherSignal::unknown("unconfigured");
        };

        let key = Self::cache_key(lat, lng);
        let now = Instant::now();

        if let Some(entry) = self.entries.lock().await.get(&key) {
            if entry.is_fresh(now) {
                return entry.signal.clone();
            }
        }

        let key_lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = key_lock.lock().await;

        // A coalesced peer may have filled the entry while we waited
        if let Some(entry) = self.entries.lock().await.get(&key) {
            if entry.is_fresh(Instant::now()) {
                return entry.signal.clone();
            }
        }

        let (signal, negative) = match source.fetch(lat, lng).await {
            Ok(signal) => (signal, false),
            Err(err) => {
                tracing::warn!(error = %err, key = %key, "Weather fetch failed");
                (WeatherSignal::unknown(source.name()), true)
            }
        };

        {
            let mut entries = self.entries.lock().await;
            entries.insert(
                key,
                CacheEntry {
                    signal: signal.clone(),
                    fetched_at: Instant::now(),
                    negative,
                },
            );
            let mut locks = self.locks.lock().await;
            sweep(&mut entries, &mut locks, Instant::now());
        }

        signal
    }
}

/// Drops expired cache entries and any lock stub whose entry is gone, so
/// neither map grows past the set of live keys. Run on every insert.
fn sweep(
    entries: &mut HashMap<String, CacheEntry>,
    locks: &mut HashMap<String, Arc<Mutex<()>>>,
    now: Instant,
) {
    entries.retain(|_, entry| entry.is_fresh(now));
    locks.retain(|key, _| entries.contains_key(key));
}
