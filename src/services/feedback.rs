use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Combination, Layer};

/// Per-run penalty applied to recently rejected region/specialized picks
const HISTORY_PENALTY: f64 = 0.2;

/// How many of the most recent rejected combinations are penalized
const RECENT_WINDOW: usize = 50;

/// Hard cap on the persisted reroll history
pub const MAX_HISTORY: usize = 100;

/// Accumulated accept/reject adjustments, keyed by category id.
///
/// Only the region and specialized layers carry feedback weight; the
/// experience and distance layers stay contextual-only. Weights grow
/// without decay; the sampler clamps the damage at weighting time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedbackWeights {
    #[serde(default)]
    pub region: HashMap<String, f64>,
    #[serde(default)]
    pub specialized: HashMap<String, f64>,
}

impl FeedbackWeights {
    /// Stored adjustment for a candidate, zero when the layer carries no
    /// feedback or the id has never been rated.
    pub fn weight_for(&self, layer: Layer, id: &str) -> f64 {
        let map = match layer {
            Layer::Region => &self.region,
            Layer::Specialized => &self.specialized,
            Layer::Experience | Layer::Distance => return 0.0,
        };
        map.get(id).copied().unwrap_or(0.0)
    }

    /// +1 on the accepted combination's region and specialized picks
    pub fn record_accept(&mut self, combo: &Combination) {
        self.adjust(combo, 1.0);
    }

    /// -1 on the rejected combination's region and specialized picks
    pub fn record_reject(&mut self, combo: &Combination) {
        self.adjust(combo, -1.0);
    }

    fn adjust(&mut self, combo: &Combination, delta: f64) {
        if let Some(region) = &combo.region {
            *self.region.entry(region.clone()).or_insert(0.0) += delta;
        }
        if let Some(specialized) = &combo.specialized {
            *self.specialized.entry(specialized.clone()).or_insert(0.0) += delta;
        }
    }

    /// Working copy for one recommendation pass: each of the last
    /// `RECENT_WINDOW` rejected combinations knocks `HISTORY_PENALTY` off
    /// the entries it names. Only already-rated ids are touched, and the
    /// persisted map is never mutated from this read path.
    pub fn penalized_snapshot(&self, history: &[Combination]) -> Self {
        let mut snapshot = self.clone();
        let start = history.len().saturating_sub(RECENT_WINDOW);
        for combo in &history[start..] {
            if let Some(region) = &combo.region {
                if let Some(weight) = snapshot.region.get_mut(region) {
                    *weight -= HISTORY_PENALTY;
                }
            }
            if let Some(specialized) = &combo.specialized {
                if let Some(weight) = snapshot.specialized.get_mut(specialized) {
                    *weight -= HISTORY_PENALTY;
                }
            }
        }
        snapshot
    }
}

/// Appends a rejected combination, keeping the newest `MAX_HISTORY`
pub fn push_history(history: &mut Vec<Combination>, combo: Combination) {
    history.push(combo);
    if history.len() > MAX_HISTORY {
        let overflow = history.len() - MAX_HISTORY;
        history.drain(..overflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(region: &str, specialized: &str) -> Combination {
        Combination {
            region: Some(region.to_string()),
            specialized: Some(specialized.to_string()),
            ..Combination::default()
        }
    }

    #[test]
    fn test_accept_then_reject_cancels_out() {
        let mut weights = FeedbackWeights::default();
        let c = combo("italian", "pizza");
        weights.record_accept(&c);
        assert_eq!(weights.weight_for(Layer::Region, "italian"), 1.0);
        weights.record_reject(&c);
        assert_eq!(weights.weight_for(Layer::Region, "italian"), 0.0);
        assert_eq!(weights.weight_for(Layer::Specialized, "pizza"), 0.0);
    }

    #[test]
    fn test_experience_and_distance_carry_no_weight() {
        let mut weights = FeedbackWeights::default();
        weights.record_accept(&combo("thai", "noodles"));
        assert_eq!(weights.weight_for(Layer::Experience, "cafe"), 0.0);
        assert_eq!(weights.weight_for(Layer::Distance, "near"), 0.0);
    }

    #[test]
    fn test_penalized_snapshot_leaves_original_untouched() {
        let mut weights = FeedbackWeights::default();
        weights.record_accept(&combo("thai", "noodles"));
        let history = vec![combo("thai", "noodles")];

        let snapshot = weights.penalized_snapshot(&history);
        assert_eq!(snapshot.weight_for(Layer::Region, "thai"), 0.8);
        // Read path never writes back
        assert_eq!(weights.weight_for(Layer::Region, "thai"), 1.0);
    }

    #[test]
    fn test_penalty_skips_unrated_ids() {
        let weights = FeedbackWeights::default();
        let snapshot = weights.penalized_snapshot(&[combo("thai", "noodles")]);
        assert_eq!(snapshot.weight_for(Layer::Region, "thai"), 0.0);
        assert!(snapshot.region.is_empty());
    }

    #[test]
    fn test_penalty_window_is_bounded_to_recent_entries() {
        let mut weights = FeedbackWeights::default();
        weights.region.insert("thai".to_string(), 100.0);

        let history: Vec<Combination> = (0..80).map(|_| combo("thai", "noodles")).collect();
        let snapshot = weights.penalized_snapshot(&history);
        // Only the last 50 entries count: 100 - 50 * 0.2
        assert!((snapshot.weight_for(Layer::Region, "thai") - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_push_history_caps_length() {
        let mut history = Vec::new();
        for i in 0..(MAX_HISTORY + 10) {
            push_history(&mut history, combo(&format!("r{}", i), "pizza"));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history[0].region.as_deref(), Some("r10"));
    }

    #[test]
    fn test_malformed_payload_parses_to_default() {
        let parsed: FeedbackWeights = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, FeedbackWeights::default());
    }
}
