use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub mod preferences;
pub mod taxonomy;

pub use preferences::UserPreferences;
pub use taxonomy::Layer;

/// One option in the static taxonomy catalog.
///
/// Ids are unique within their layer; labels are what users see and what
/// keyword/boost matching runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryOption {
    pub id: &'static str,
    pub label: &'static str,
}

impl CategoryOption {
    pub const fn new(id: &'static str, label: &'static str) -> Self {
        Self { id, label }
    }
}

/// Selection mode of a single filter layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Wildcard: the full option set is in play
    #[default]
    Any,
    /// An explicit, non-empty strict subset of the layer's options
    Custom,
}

/// Per-layer filter selection.
///
/// The ambiguous shapes the frontend used to send (bare arrays, sets,
/// partial objects) are all normalized into this one tagged form at the
/// ingestion boundary; nothing downstream accepts anything else.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerFilterState {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub selected: BTreeSet<String>,
}

impl LayerFilterState {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn custom<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: FilterMode::Custom,
            selected: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.mode == FilterMode::Any
    }

    /// Normalizes the selection against the layer's catalog.
    ///
    /// Unknown ids are dropped. A custom selection that is empty, or that
    /// covers every option of the layer, collapses back to wildcard so the
    /// weighting behavior stays consistent with `mode = any`.
    pub fn normalized(&self, layer: Layer) -> Self {
        if self.mode == FilterMode::Any {
            return Self::any();
        }

        let known: BTreeSet<String> = self
            .selected
            .iter()
            .filter(|id| taxonomy::contains(layer, id))
            .cloned()
            .collect();

        let total = taxonomy::options(layer).len();
        if known.is_empty() || known.len() == total {
            return Self::any();
        }

        Self {
            mode: FilterMode::Custom,
            selected: known,
        }
    }

    /// Candidate pool for this layer: the custom subset, or the full
    /// catalog when wildcard. Catalog order is preserved either way.
    pub fn pool(&self, layer: Layer) -> Vec<&'static str> {
        taxonomy::options(layer)
            .iter()
            .filter(|opt| self.is_wildcard() || self.selected.contains(opt.id))
            .map(|opt| opt.id)
            .collect()
    }
}

/// Filter state across all four layers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub region: LayerFilterState,
    #[serde(default)]
    pub experience: LayerFilterState,
    #[serde(default)]
    pub specialized: LayerFilterState,
    #[serde(default)]
    pub distance: LayerFilterState,
}

impl FilterState {
    pub fn layer(&self, layer: Layer) -> &LayerFilterState {
        match layer {
            Layer::Region => &self.region,
            Layer::Experience => &self.experience,
            Layer::Specialized => &self.specialized,
            Layer::Distance => &self.distance,
        }
    }

    /// Applies `LayerFilterState::normalized` to every layer
    pub fn normalized(&self) -> Self {
        Self {
            region: self.region.normalized(Layer::Region),
            experience: self.experience.normalized(Layer::Experience),
            specialized: self.specialized.normalized(Layer::Specialized),
            distance: self.distance.normalized(Layer::Distance),
        }
    }

    pub fn pool(&self, layer: Layer) -> Vec<&'static str> {
        self.layer(layer).pool(layer)
    }

    /// Number of layers currently in wildcard mode
    pub fn wildcard_layers(&self) -> usize {
        Layer::ALL
            .iter()
            .filter(|layer| self.layer(**layer).is_wildcard())
            .count()
    }
}

/// One concrete pick per layer. `None` means the layer stayed wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    pub region: Option<String>,
    pub experience: Option<String>,
    pub specialized: Option<String>,
    pub distance: Option<String>,
}

impl Combination {
    pub fn get(&self, layer: Layer) -> Option<&str> {
        match layer {
            Layer::Region => self.region.as_deref(),
            Layer::Experience => self.experience.as_deref(),
            Layer::Specialized => self.specialized.as_deref(),
            Layer::Distance => self.distance.as_deref(),
        }
    }

    /// Display labels with "Any" standing in for wildcard layers
    pub fn labels(&self) -> CombinationLabels {
        let label = |id: Option<&str>| {
            id.and_then(taxonomy::label_for)
                .unwrap_or("Any")
                .to_string()
        };
        CombinationLabels {
            region: label(self.region.as_deref()),
            experience: label(self.experience.as_deref()),
            specialized: label(self.specialized.as_deref()),
            distance: label(self.distance.as_deref()),
        }
    }
}

/// Human-readable rendering of a combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationLabels {
    pub region: String,
    pub experience: String,
    pub specialized: String,
    pub distance: String,
}

/// User mood, an optional nudge on top of the filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Any,
    Comfort,
    Adventurous,
    Healthy,
    Fast,
    Celebration,
}

impl Mood {
    /// Search term contributed to the keyword string, if the mood is set
    pub fn keyword_term(&self) -> Option<&'static str> {
        match self {
            Mood::Any => None,
            Mood::Comfort => Some("comfort"),
            Mood::Adventurous => Some("adventurous"),
            Mood::Healthy => Some("healthy"),
            Mood::Fast => Some("fast"),
            Mood::Celebration => Some("celebration"),
        }
    }
}

/// Fine-grained time-of-day category shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCategory {
    EarlyRiser,
    Breakfast,
    Brunch,
    Lunch,
    Snack,
    Dinner,
    LateNight,
}

impl TimeCategory {
    /// Coarse bucket the recommender's boost tables key on
    pub fn bucket(&self) -> TimeBucket {
        match self {
            TimeCategory::EarlyRiser | TimeCategory::Breakfast | TimeCategory::Brunch => {
                TimeBucket::Morning
            }
            TimeCategory::Lunch | TimeCategory::Snack => TimeBucket::Afternoon,
            TimeCategory::Dinner => TimeBucket::Evening,
            TimeCategory::LateNight => TimeBucket::Late,
        }
    }
}

impl std::fmt::Display for TimeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            TimeCategory::EarlyRiser => "Early Riser",
            TimeCategory::Breakfast => "Breakfast",
            TimeCategory::Brunch => "Brunch",
            TimeCategory::Lunch => "Lunch",
            TimeCategory::Snack => "Snack",
            TimeCategory::Dinner => "Dinner",
            TimeCategory::LateNight => "Late Night",
        };
        write!(f, "{}", text)
    }
}

/// Coarse time-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Morning,
    Afternoon,
    Evening,
    Late,
}

/// Weather classification buckets the boost tables key on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherBucket {
    Cold,
    Hot,
    Humid,
    Rain,
}

/// Resolved weather signal for a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSignal {
    pub bucket: Option<WeatherBucket>,
    pub condition: String,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub humidity: Option<u8>,
    pub hint: Option<String>,
    pub source: String,
}

impl WeatherSignal {
    /// Placeholder signal used when no weather key is configured
    pub fn unknown(source: &str) -> Self {
        Self {
            bucket: None,
            condition: "Unknown".to_string(),
            temperature_c: None,
            temperature_f: None,
            humidity: None,
            hint: None,
            source: source.to_string(),
        }
    }
}

/// Contextual signal bundle the recommender and query builder consume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBundle {
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub weather: Option<WeatherSignal>,
    pub time_category: TimeCategory,
    #[serde(default)]
    pub prefs: UserPreferences,
}

impl Default for SignalBundle {
    fn default() -> Self {
        Self {
            mood: Mood::Any,
            weather: None,
            time_category: TimeCategory::Dinner,
            prefs: UserPreferences::default(),
        }
    }
}

/// Why a fallback sentinel was synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoResults,
    ApiError,
    MissingApiKey,
}

/// Vetted restaurant candidate returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantCandidate {
    #[serde(default)]
    pub place_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub open_now: bool,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub trigger_reroll: bool,
}

impl RestaurantCandidate {
    /// Dedup/rotation identity: the stable source id when present,
    /// otherwise a name+address composite.
    pub fn identity_key(&self) -> String {
        match self.place_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{}|{}", self.name, self.address.as_deref().unwrap_or("")),
        }
    }

    /// The single synthetic item shown when no real candidate qualifies
    pub fn fallback_sentinel() -> Self {
        Self {
            place_id: Some("food-oracle-fallback".to_string()),
            name: "The Food Oracle came up empty".to_string(),
            rating: None,
            address: Some("Loosen a filter or two and re-roll.".to_string()),
            open_now: false,
            business_status: None,
            types: Vec::new(),
            photo_url: None,
            website: None,
            is_fallback: true,
            trigger_reroll: true,
        }
    }
}

/// Raw venue payload from a Places-style nearby search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVenue {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<RawOpeningHours>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub photos: Vec<RawPhoto>,
}

impl RawVenue {
    pub fn open_now(&self) -> bool {
        self.opening_hours
            .as_ref()
            .and_then(|hours| hours.open_now)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPhoto {
    pub photo_reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_selecting_every_id_collapses_to_any() {
        let all_ids: Vec<&str> = taxonomy::ids(Layer::Distance).collect();
        let state = LayerFilterState::custom(all_ids);
        let normalized = state.normalized(Layer::Distance);
        assert!(normalized.is_wildcard());
        assert!(normalized.selected.is_empty());
    }

    #[test]
    fn test_custom_strict_subset_survives_normalization() {
        let state = LayerFilterState::custom(["near", "drive"]);
        let normalized = state.normalized(Layer::Distance);
        assert_eq!(normalized.mode, FilterMode::Custom);
        assert_eq!(normalized.selected.len(), 2);
    }

    #[test]
    fn test_unknown_ids_dropped_during_normalization() {
        let state = LayerFilterState::custom(["near", "warp_speed"]);
        let normalized = state.normalized(Layer::Distance);
        assert_eq!(normalized.pool(Layer::Distance), vec!["near"]);
    }

    #[test]
    fn test_custom_with_only_unknown_ids_collapses_to_any() {
        let state = LayerFilterState::custom(["warp_speed"]);
        assert!(state.normalized(Layer::Distance).is_wildcard());
    }

    #[test]
    fn test_wildcard_pool_is_full_catalog() {
        let state = LayerFilterState::any();
        assert_eq!(
            state.pool(Layer::Region).len(),
            taxonomy::options(Layer::Region).len()
        );
    }

    #[test]
    fn test_identity_key_prefers_place_id() {
        let candidate = RestaurantCandidate {
            place_id: Some("abc123".to_string()),
            name: "Joe's Diner".to_string(),
            address: Some("1 Main St".to_string()),
            ..RestaurantCandidate::fallback_sentinel()
        };
        assert_eq!(candidate.identity_key(), "abc123");
    }

    #[test]
    fn test_identity_key_composite_without_place_id() {
        let candidate = RestaurantCandidate {
            place_id: None,
            name: "Joe's Diner".to_string(),
            address: Some("1 Main St".to_string()),
            ..RestaurantCandidate::fallback_sentinel()
        };
        assert_eq!(candidate.identity_key(), "Joe's Diner|1 Main St");
    }

    #[test]
    fn test_fallback_sentinel_is_flagged() {
        let sentinel = RestaurantCandidate::fallback_sentinel();
        assert!(sentinel.is_fallback);
        assert!(sentinel.trigger_reroll);
    }

    #[test]
    fn test_raw_venue_deserializes_places_payload() {
        let json = r#"{
            "place_id": "ChIJabc",
            "name": "Bella Vita",
            "rating": 4.6,
            "vicinity": "123 Main St",
            "business_status": "OPERATIONAL",
            "opening_hours": { "open_now": true },
            "types": ["restaurant", "food"],
            "photos": [{ "photo_reference": "ref1" }]
        }"#;

        let venue: RawVenue = serde_json::from_str(json).unwrap();
        assert_eq!(venue.place_id.as_deref(), Some("ChIJabc"));
        assert!(venue.open_now());
        assert_eq!(venue.photos.len(), 1);
    }

    #[test]
    fn test_raw_venue_open_now_defaults_false() {
        let venue: RawVenue = serde_json::from_str(r#"{ "name": "No Hours" }"#).unwrap();
        assert!(!venue.open_now());
    }

    #[test]
    fn test_combination_labels_fall_back_to_any() {
        let combo = Combination {
            specialized: Some("sushi".to_string()),
            ..Combination::default()
        };
        let labels = combo.labels();
        assert_eq!(labels.specialized, "Sushi");
        assert_eq!(labels.region, "Any");
    }

    #[test]
    fn test_time_category_buckets() {
        assert_eq!(TimeCategory::Breakfast.bucket(), TimeBucket::Morning);
        assert_eq!(TimeCategory::Snack.bucket(), TimeBucket::Afternoon);
        assert_eq!(TimeCategory::LateNight.bucket(), TimeBucket::Late);
    }
}
