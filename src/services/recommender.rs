use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use crate::models::{
    taxonomy, Combination, CombinationLabels, FilterState, Layer, Mood, RestaurantCandidate,
    SignalBundle, TimeBucket, WeatherBucket,
};
use crate::services::feedback::FeedbackWeights;

/// Additive boost for a specialized candidate hinted at by a saved restaurant
const SAVED_HINT_BOOST: f64 = 1.5;

/// Redraw attempts for the anti-repeat nudge on mostly-wildcard filters
const ANTI_REPEAT_ATTEMPTS: usize = 5;

/// One multiplicative boost rule: a label fragment and its multiplier.
///
/// Fragments match case-insensitively as substrings of the candidate's
/// display label, with underscores standing in for spaces (so the key
/// `dessert_bar` matches the label "Dessert Bar").
#[derive(Debug, Clone)]
pub struct BoostRule {
    pub key: &'static str,
    pub multiplier: f64,
}

impl BoostRule {
    const fn new(key: &'static str, multiplier: f64) -> Self {
        Self { key, multiplier }
    }

    fn matches(&self, label: &str) -> bool {
        let needle = self.key.replace('_', " ").to_lowercase();
        label.to_lowercase().contains(&needle)
    }
}

/// Calibration tables for the contextual boosts.
///
/// The mechanism (ordered multiplicative label matching) is contractual;
/// the specific multipliers are tuning knobs.
#[derive(Debug, Clone)]
pub struct BoostConfig {
    pub mood: Vec<(Mood, Vec<BoostRule>)>,
    pub weather: Vec<(WeatherBucket, Vec<BoostRule>)>,
    pub time: Vec<(TimeBucket, Vec<BoostRule>)>,
    /// Multiplier for candidates matching a stored like term
    pub like_multiplier: f64,
    /// Multiplier for candidates matching a stored dislike term
    pub dislike_multiplier: f64,
    /// Lowest weight a dislike can push a candidate to
    pub dislike_floor: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            mood: vec![
                (
                    Mood::Comfort,
                    vec![
                        BoostRule::new("noodles", 1.3),
                        BoostRule::new("bbq", 1.2),
                        BoostRule::new("pizza", 1.2),
                        BoostRule::new("diner", 1.2),
                    ],
                ),
                (
                    Mood::Adventurous,
                    vec![
                        BoostRule::new("thai", 1.3),
                        BoostRule::new("korean", 1.3),
                        BoostRule::new("indian", 1.2),
                        BoostRule::new("sushi", 1.2),
                    ],
                ),
                (
                    Mood::Healthy,
                    vec![
                        BoostRule::new("vegan", 1.4),
                        BoostRule::new("mediterranean", 1.3),
                        BoostRule::new("sushi", 1.1),
                    ],
                ),
                (
                    Mood::Fast,
                    vec![
                        BoostRule::new("takeout", 1.4),
                        BoostRule::new("pizza", 1.2),
                        BoostRule::new("casual", 1.1),
                    ],
                ),
                (
                    Mood::Celebration,
                    vec![
                        BoostRule::new("fine_dining", 1.4),
                        BoostRule::new("steak", 1.3),
                        BoostRule::new("rooftop", 1.3),
                    ],
                ),
            ],
            weather: vec![
                (
                    WeatherBucket::Cold,
                    vec![
                        BoostRule::new("noodles", 1.3),
                        BoostRule::new("bbq", 1.2),
                        BoostRule::new("coffee", 1.2),
                    ],
                ),
                (
                    WeatherBucket::Hot,
                    vec![
                        BoostRule::new("dessert_bar", 1.3),
                        BoostRule::new("sushi", 1.1),
                        BoostRule::new("cafe", 1.1),
                    ],
                ),
                (
                    WeatherBucket::Humid,
                    vec![BoostRule::new("cafe", 1.2), BoostRule::new("dessert", 1.2)],
                ),
                (
                    WeatherBucket::Rain,
                    vec![
                        BoostRule::new("takeout", 1.4),
                        BoostRule::new("noodles", 1.2),
                    ],
                ),
            ],
            time: vec![
                (
                    TimeBucket::Morning,
                    vec![
                        BoostRule::new("cafe", 1.5),
                        BoostRule::new("coffee", 1.5),
                        BoostRule::new("brunch", 1.4),
                        BoostRule::new("dessert", 1.2),
                    ],
                ),
                (
                    TimeBucket::Afternoon,
                    vec![
                        BoostRule::new("casual", 1.1),
                        BoostRule::new("takeout", 1.1),
                    ],
                ),
                (
                    TimeBucket::Evening,
                    vec![
                        BoostRule::new("fine_dining", 1.2),
                        BoostRule::new("steak", 1.1),
                    ],
                ),
                (
                    TimeBucket::Late,
                    vec![
                        BoostRule::new("takeout", 1.4),
                        BoostRule::new("dessert", 1.3),
                        BoostRule::new("noodles", 1.2),
                    ],
                ),
            ],
            like_multiplier: 1.3,
            dislike_multiplier: 0.4,
            dislike_floor: 0.1,
        }
    }
}

/// A suggested combination with its confidence estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub combo: Combination,
    pub labels: CombinationLabels,
    pub confidence: f64,
}

/// Weighted-random combination picker.
///
/// Picks one id per layer independently by weighted sampling over the
/// caller's candidate pools, blending stored feedback, saved-restaurant
/// hints, a recent-rejection penalty, and the contextual boost tables.
/// Randomness is threaded in by the caller so runs replay under a seed.
pub struct Recommender {
    boosts: BoostConfig,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new(BoostConfig::default())
    }
}

impl Recommender {
    pub fn new(boosts: BoostConfig) -> Self {
        Self { boosts }
    }

    /// Runs one full recommendation pass.
    ///
    /// `weights` is read through an immutable snapshot; the history
    /// penalty only ever touches the per-call copy. Never fails: a
    /// degenerate pool degrades to wildcard, degenerate weights to a
    /// uniform draw.
    pub fn suggest<R: Rng>(
        &self,
        filters: &FilterState,
        signals: &SignalBundle,
        weights: &FeedbackWeights,
        saved: &[RestaurantCandidate],
        history: &[Combination],
        rng: &mut R,
    ) -> Suggestion {
        let filters = filters.normalized();
        let snapshot = weights.penalized_snapshot(history);
        let hints = saved_hint_ids(saved);

        let region = self.pick_layer(Layer::Region, &filters, signals, &snapshot, &hints, rng);
        let experience =
            self.pick_layer(Layer::Experience, &filters, signals, &snapshot, &hints, rng);
        let specialized =
            self.pick_layer(Layer::Specialized, &filters, signals, &snapshot, &hints, rng);
        let distance = self.pick_layer(Layer::Distance, &filters, signals, &snapshot, &hints, rng);

        let hint_matched = specialized
            .as_deref()
            .map(|id| hints.contains(id))
            .unwrap_or(false);

        let confidence = confidence_score(
            region
                .as_deref()
                .map(|id| snapshot.weight_for(Layer::Region, id))
                .unwrap_or(0.0),
            specialized
                .as_deref()
                .map(|id| snapshot.weight_for(Layer::Specialized, id))
                .unwrap_or(0.0),
            hint_matched,
            signals.time_category.bucket(),
        );

        let combo = Combination {
            region,
            experience,
            specialized,
            distance,
        };
        let labels = combo.labels();

        tracing::debug!(
            region = %labels.region,
            experience = %labels.experience,
            specialized = %labels.specialized,
            distance = %labels.distance,
            confidence,
            "Combination suggested"
        );

        Suggestion {
            combo,
            labels,
            confidence,
        }
    }

    /// Scores an already-chosen combination without redrawing it.
    /// Used when the reroll quota is exhausted and the previous pick is
    /// simply re-presented.
    pub fn appraise(
        &self,
        combo: &Combination,
        signals: &SignalBundle,
        weights: &FeedbackWeights,
        saved: &[RestaurantCandidate],
        history: &[Combination],
    ) -> Suggestion {
        let snapshot = weights.penalized_snapshot(history);
        let hints = saved_hint_ids(saved);
        let hint_matched = combo
            .get(Layer::Specialized)
            .map(|id| hints.contains(id))
            .unwrap_or(false);

        let confidence = confidence_score(
            combo
                .get(Layer::Region)
                .map(|id| snapshot.weight_for(Layer::Region, id))
                .unwrap_or(0.0),
            combo
                .get(Layer::Specialized)
                .map(|id| snapshot.weight_for(Layer::Specialized, id))
                .unwrap_or(0.0),
            hint_matched,
            signals.time_category.bucket(),
        );

        Suggestion {
            combo: combo.clone(),
            labels: combo.labels(),
            confidence,
        }
    }

    /// `suggest`, re-drawn up to a handful of times to avoid handing back
    /// the previous combination when two or more layers are wildcard.
    /// Policy nudge only; the core sampling contract is unchanged.
    pub fn suggest_avoiding<R: Rng>(
        &self,
        filters: &FilterState,
        signals: &SignalBundle,
        weights: &FeedbackWeights,
        saved: &[RestaurantCandidate],
        history: &[Combination],
        avoid: Option<&Combination>,
        rng: &mut R,
    ) -> Suggestion {
        let mut suggestion = self.suggest(filters, signals, weights, saved, history, rng);

        let nudge_applies = filters.normalized().wildcard_layers() >= 2;
        if let Some(previous) = avoid {
            if nudge_applies {
                let mut attempts = 0;
                while &suggestion.combo == previous && attempts < ANTI_REPEAT_ATTEMPTS {
                    suggestion = self.suggest(filters, signals, weights, saved, history, rng);
                    attempts += 1;
                }
            }
        }

        suggestion
    }

    fn pick_layer<R: Rng>(
        &self,
        layer: Layer,
        filters: &FilterState,
        signals: &SignalBundle,
        snapshot: &FeedbackWeights,
        hints: &HashSet<&'static str>,
        rng: &mut R,
    ) -> Option<String> {
        let candidates = self.weighted_candidates(layer, filters, signals, snapshot, hints);
        pick_weighted(&candidates, rng).map(str::to_string)
    }

    /// Builds the weighted candidate list for one layer
    pub(crate) fn weighted_candidates(
        &self,
        layer: Layer,
        filters: &FilterState,
        signals: &SignalBundle,
        snapshot: &FeedbackWeights,
        hints: &HashSet<&'static str>,
    ) -> Vec<(&'static str, f64)> {
        filters
            .pool(layer)
            .into_iter()
            .map(|id| {
                let label = taxonomy::label_for(id).unwrap_or(id);
                let weight = self.score_candidate(layer, id, label, signals, snapshot, hints);
                (id, weight)
            })
            .collect()
    }

    fn score_candidate(
        &self,
        layer: Layer,
        id: &str,
        label: &str,
        signals: &SignalBundle,
        snapshot: &FeedbackWeights,
        hints: &HashSet<&'static str>,
    ) -> f64 {
        // The distance layer is always a plain uniform draw
        if layer == Layer::Distance {
            return 1.0;
        }

        let mut weight = 1.0 + snapshot.weight_for(layer, id);

        if layer == Layer::Specialized && hints.contains(id) {
            weight += SAVED_HINT_BOOST;
        }

        // Multiplicative boosts, in contract order: mood, weather, time,
        // then explicit likes/dislikes.
        for rule in self.mood_rules(signals.mood) {
            if rule.matches(label) {
                weight *= rule.multiplier;
            }
        }

        if let Some(bucket) = signals.weather.as_ref().and_then(|w| w.bucket) {
            for rule in self.weather_rules(bucket) {
                if rule.matches(label) {
                    weight *= rule.multiplier;
                }
            }
        }

        for rule in self.time_rules(signals.time_category.bucket()) {
            if rule.matches(label) {
                weight *= rule.multiplier;
            }
        }

        let lowered = label.to_lowercase();
        for like in &signals.prefs.likes {
            if lowered.contains(&like.to_lowercase()) {
                weight *= self.boosts.like_multiplier;
            }
        }
        for dislike in &signals.prefs.dislikes {
            if lowered.contains(&dislike.to_lowercase()) {
                weight = (weight * self.boosts.dislike_multiplier).max(self.boosts.dislike_floor);
            }
        }

        weight
    }

    fn mood_rules(&self, mood: Mood) -> &[BoostRule] {
        self.boosts
            .mood
            .iter()
            .find(|(m, _)| *m == mood)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    fn weather_rules(&self, bucket: WeatherBucket) -> &[BoostRule] {
        self.boosts
            .weather
            .iter()
            .find(|(b, _)| *b == bucket)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    fn time_rules(&self, bucket: TimeBucket) -> &[BoostRule] {
        self.boosts
            .time
            .iter()
            .find(|(b, _)| *b == bucket)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }
}

/// Specialized ids whose label appears in a saved restaurant's name or
/// address (case-insensitive substring match).
fn saved_hint_ids(saved: &[RestaurantCandidate]) -> HashSet<&'static str> {
    let mut hints = HashSet::new();
    for restaurant in saved {
        let haystack = format!(
            "{} {}",
            restaurant.name.to_lowercase(),
            restaurant
                .address
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
        );
        for opt in taxonomy::options(Layer::Specialized) {
            if haystack.contains(&opt.label.to_lowercase()) {
                hints.insert(opt.id);
            }
        }
    }
    hints
}

/// Weighted random draw: walk the candidates subtracting each weight from
/// a uniform draw in `[0, total)` until it crosses zero. A non-positive
/// total degrades to a uniform pick; an empty pool yields `None`.
pub(crate) fn pick_weighted<'a, R: Rng>(
    candidates: &[(&'a str, f64)],
    rng: &mut R,
) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }

    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        let idx = rng.gen_range(0..candidates.len());
        return Some(candidates[idx].0);
    }

    let mut remainder = rng.gen::<f64>() * total;
    for (id, weight) in candidates {
        remainder -= weight;
        if remainder <= 0.0 {
            return Some(id);
        }
    }
    // Floating-point residue: the draw landed past the last bucket
    candidates.last().map(|(id, _)| *id)
}

fn confidence_score(
    region_weight: f64,
    specialized_weight: f64,
    hint_matched: bool,
    bucket: TimeBucket,
) -> f64 {
    let mut confidence = 0.5;
    confidence += f64::min(0.3, region_weight * 0.1);
    confidence += f64::min(0.3, specialized_weight * 0.1);
    if hint_matched {
        confidence += 0.1;
    }
    if matches!(bucket, TimeBucket::Morning | TimeBucket::Late) {
        confidence += 0.05;
    }
    confidence
}
