use serde::Serialize;

use crate::models::{taxonomy, Combination, FilterState, Layer, SignalBundle};

/// Default search radius when nothing narrows the distance, in meters
const DEFAULT_RADIUS_M: u32 = 5_000;

/// Keyword token count above which the plan is probably over-constrained
const COMPLEXITY_WARN_THRESHOLD: usize = 10;

/// Broad anchor terms used when no experience narrows the search.
/// Without these a bare keyword returns mostly fast-food noise.
const ANCHOR_TERMS: [&str; 4] = ["steakhouse", "seafood", "cocktail bar", "chef table"];

/// A concrete venue-search request derived from a combination, the filter
/// state, and the contextual signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub radius_m: u32,
    pub keyword: String,
    /// Context strings surfaced in search metadata, not sent upstream
    pub hints: Vec<String>,
}

impl QueryPlan {
    /// Whitespace token count of the keyword string
    pub fn complexity(&self) -> usize {
        self.keyword.split_whitespace().count()
    }
}

/// Search radius implied by a distance id, in meters
fn radius_for(distance_id: &str) -> u32 {
    match distance_id {
        "near" => 3_000,
        "close" => 8_000,
        "city" => 25_000,
        "explore" => 25_000,
        "drive" => 60_000,
        "hidden" => 10_000,
        "trending" => 20_000,
        "budget" => 8_000,
        _ => DEFAULT_RADIUS_M,
    }
}

/// Builds the venue-search plan for one recommendation.
///
/// Radius comes from the combination's distance pick; absent that, the
/// widest radius across the custom distance selection, so a search never
/// excludes a venue the user said was acceptable. Keyword assembly is
/// ordered and deduplicating, and tokens matching a dislike are dropped.
pub fn build_plan(combo: &Combination, filters: &FilterState, signals: &SignalBundle) -> QueryPlan {
    let filters = filters.normalized();

    let radius_m = match combo.distance.as_deref() {
        Some(id) => radius_for(id),
        None => {
            let distance = filters.layer(Layer::Distance);
            if distance.is_wildcard() {
                DEFAULT_RADIUS_M
            } else {
                distance
                    .selected
                    .iter()
                    .map(|id| radius_for(id))
                    .max()
                    .unwrap_or(DEFAULT_RADIUS_M)
            }
        }
    };

    // Experience terms lead; they anchor what kind of venue comes back.
    let experience_terms = layer_terms(combo, &filters, Layer::Experience);
    let mut terms: Vec<String> = if experience_terms.is_empty() {
        ANCHOR_TERMS.iter().map(|t| t.to_string()).collect()
    } else {
        experience_terms
    };

    let experience_haystack = terms.join(" ").to_lowercase();

    for layer in [Layer::Region, Layer::Specialized, Layer::Distance] {
        terms.extend(layer_terms(combo, &filters, layer));
    }

    terms.extend(signals.prefs.likes.iter().cloned());

    if let Some(mood_term) = signals.mood.keyword_term() {
        if !experience_haystack.contains(mood_term) {
            terms.push(mood_term.to_string());
        }
    }

    let mut seen: Vec<String> = Vec::new();
    let mut keyword_terms: Vec<String> = Vec::new();
    for term in terms {
        let lowered = term.to_lowercase();
        let disliked = signals
            .prefs
            .dislikes
            .iter()
            .any(|dislike| lowered.contains(&dislike.to_lowercase()));
        if disliked || seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        keyword_terms.push(term);
    }

    let keyword = keyword_terms.join(" ");

    let mut hints = Vec::new();
    if let Some(hint) = signals.weather.as_ref().and_then(|w| w.hint.clone()) {
        hints.push(hint);
    }
    hints.push(signals.time_category.to_string());

    let plan = QueryPlan {
        radius_m,
        keyword,
        hints,
    };

    if plan.complexity() > COMPLEXITY_WARN_THRESHOLD {
        tracing::warn!(
            complexity = plan.complexity(),
            keyword = %plan.keyword,
            "Search keyword is heavily constrained; results may be sparse"
        );
    }

    plan
}

/// Display labels contributing to the keyword for one layer: the
/// combination's pick when made, otherwise the custom filter selection.
fn layer_terms(combo: &Combination, filters: &FilterState, layer: Layer) -> Vec<String> {
    if let Some(id) = combo.get(layer) {
        return taxonomy::label_for(id)
            .map(|label| vec![label.to_string()])
            .unwrap_or_default();
    }

    let state = filters.layer(layer);
    if state.is_wildcard() {
        return Vec::new();
    }
    taxonomy::options(layer)
        .iter()
        .filter(|opt| state.selected.contains(opt.id))
        .map(|opt| opt.label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LayerFilterState, Mood, UserPreferences};

    #[test]
    fn test_combo_distance_sets_radius() {
        let combo = Combination {
            distance: Some("drive".to_string()),
            ..Combination::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &SignalBundle::default());
        assert_eq!(plan.radius_m, 60_000);
    }

    #[test]
    fn test_custom_distance_selection_takes_widest_radius() {
        let filters = FilterState {
            distance: LayerFilterState::custom(["near", "explore"]),
            ..FilterState::default()
        };
        let plan = build_plan(&Combination::default(), &filters, &SignalBundle::default());
        assert_eq!(plan.radius_m, 25_000);
    }

    #[test]
    fn test_default_radius_without_distance_input() {
        let plan = build_plan(
            &Combination::default(),
            &FilterState::default(),
            &SignalBundle::default(),
        );
        assert_eq!(plan.radius_m, DEFAULT_RADIUS_M);
    }

    #[test]
    fn test_unknown_distance_id_uses_default_radius() {
        let combo = Combination {
            distance: Some("teleport".to_string()),
            ..Combination::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &SignalBundle::default());
        assert_eq!(plan.radius_m, DEFAULT_RADIUS_M);
    }

    #[test]
    fn test_anchor_terms_fill_empty_experience() {
        let plan = build_plan(
            &Combination::default(),
            &FilterState::default(),
            &SignalBundle::default(),
        );
        assert!(plan.keyword.contains("steakhouse"));
        assert!(plan.keyword.contains("cocktail bar"));
    }

    #[test]
    fn test_experience_pick_replaces_anchor_terms() {
        let combo = Combination {
            experience: Some("fine_dining".to_string()),
            ..Combination::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &SignalBundle::default());
        assert!(plan.keyword.starts_with("Fine Dining"));
        assert!(!plan.keyword.contains("steakhouse"));
    }

    #[test]
    fn test_layer_labels_follow_experience() {
        let combo = Combination {
            experience: Some("casual".to_string()),
            region: Some("thai".to_string()),
            specialized: Some("noodles".to_string()),
            ..Combination::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &SignalBundle::default());
        assert_eq!(plan.keyword, "Casual Thai Noodles");
    }

    #[test]
    fn test_likes_append_verbatim() {
        let combo = Combination {
            experience: Some("casual".to_string()),
            ..Combination::default()
        };
        let signals = SignalBundle {
            prefs: UserPreferences::new(vec!["hand-pulled noodles".to_string()], vec![]),
            ..SignalBundle::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &signals);
        assert!(plan.keyword.ends_with("hand-pulled noodles"));
    }

    #[test]
    fn test_disliked_tokens_are_dropped() {
        let combo = Combination {
            experience: Some("casual".to_string()),
            specialized: Some("sushi".to_string()),
            ..Combination::default()
        };
        let signals = SignalBundle {
            prefs: UserPreferences::new(vec![], vec!["sushi".to_string()]),
            ..SignalBundle::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &signals);
        assert_eq!(plan.keyword, "Casual");
    }

    #[test]
    fn test_mood_term_appended_when_experience_lacks_it() {
        let signals = SignalBundle {
            mood: Mood::Fast,
            ..SignalBundle::default()
        };
        let filters = FilterState {
            experience: LayerFilterState::custom(["casual", "takeout"]),
            ..FilterState::default()
        };
        let plan = build_plan(&Combination::default(), &filters, &signals);
        assert!(plan.keyword.to_lowercase().contains("fast"));
    }

    #[test]
    fn test_keyword_dedupes_case_insensitively() {
        let combo = Combination {
            experience: Some("casual".to_string()),
            ..Combination::default()
        };
        let signals = SignalBundle {
            prefs: UserPreferences::new(vec!["CASUAL".to_string()], vec![]),
            ..SignalBundle::default()
        };
        let plan = build_plan(&combo, &FilterState::default(), &signals);
        assert_eq!(plan.keyword, "Casual");
    }

    #[test]
    fn test_complexity_counts_whitespace_tokens() {
        let plan = QueryPlan {
            radius_m: 5_000,
            keyword: "Fine Dining Thai Noodles".to_string(),
            hints: Vec::new(),
        };
        assert_eq!(plan.complexity(), 4);
    }

    #[test]
    fn test_time_category_always_present_in_hints() {
        let plan = build_plan(
            &Combination::default(),
            &FilterState::default(),
            &SignalBundle::default(),
        );
        assert!(plan.hints.contains(&"Dinner".to_string()));
    }
}
