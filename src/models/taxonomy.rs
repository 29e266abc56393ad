use serde::{Deserialize, Serialize};

use super::CategoryOption;

/// The four independent filter dimensions every pick is made across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Region,
    Experience,
    Specialized,
    Distance,
}

impl Layer {
    pub const ALL: [Layer; 4] = [
        Layer::Region,
        Layer::Experience,
        Layer::Specialized,
        Layer::Distance,
    ];

    /// Display label for the layer itself (not its options)
    pub fn label(&self) -> &'static str {
        match self {
            Layer::Region => "Region",
            Layer::Experience => "Experience",
            Layer::Specialized => "Specialized",
            Layer::Distance => "Location",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match self {
            Layer::Region => "region",
            Layer::Experience => "experience",
            Layer::Specialized => "specialized",
            Layer::Distance => "distance",
        };
        write!(f, "{}", key)
    }
}

const REGION: &[CategoryOption] = &[
    CategoryOption::new("mexican", "Mexican"),
    CategoryOption::new("italian", "Italian"),
    CategoryOption::new("japanese", "Japanese"),
    CategoryOption::new("chinese", "Chinese"),
    CategoryOption::new("thai", "Thai"),
    CategoryOption::new("indian", "Indian"),
    CategoryOption::new("mediterranean", "Mediterranean"),
    CategoryOption::new("american", "American"),
    CategoryOption::new("korean", "Korean"),
    CategoryOption::new("vietnamese", "Vietnamese"),
];

const EXPERIENCE: &[CategoryOption] = &[
    CategoryOption::new("fine_dining", "Fine Dining"),
    CategoryOption::new("casual", "Casual"),
    CategoryOption::new("cafe", "Cafe"),
    CategoryOption::new("dessert_bar", "Dessert Bar"),
    CategoryOption::new("takeout", "Takeout"),
    CategoryOption::new("food_hall", "Food Hall"),
    CategoryOption::new("rooftop", "Rooftop"),
    CategoryOption::new("diner", "Diner"),
];

const SPECIALIZED: &[CategoryOption] = &[
    CategoryOption::new("sushi", "Sushi"),
    CategoryOption::new("bbq", "BBQ"),
    CategoryOption::new("pizza", "Pizza"),
    CategoryOption::new("noodles", "Noodles"),
    CategoryOption::new("seafood", "Seafood"),
    CategoryOption::new("steak", "Steak"),
    CategoryOption::new("coffee", "Coffee"),
    CategoryOption::new("dessert", "Dessert"),
    CategoryOption::new("vegan", "Vegan"),
    CategoryOption::new("brunch", "Brunch"),
];

const DISTANCE: &[CategoryOption] = &[
    CategoryOption::new("near", "Walking Distance"),
    CategoryOption::new("close", "Close By"),
    CategoryOption::new("city", "In the City"),
    CategoryOption::new("explore", "Worth Exploring"),
    CategoryOption::new("drive", "Road Trip"),
    CategoryOption::new("hidden", "Hidden Gem"),
    CategoryOption::new("trending", "Trending Now"),
    CategoryOption::new("budget", "Budget Friendly"),
];

/// Static option catalog for one layer
pub fn options(layer: Layer) -> &'static [CategoryOption] {
    match layer {
        Layer::Region => REGION,
        Layer::Experience => EXPERIENCE,
        Layer::Specialized => SPECIALIZED,
        Layer::Distance => DISTANCE,
    }
}

/// All ids of a layer, in catalog order
pub fn ids(layer: Layer) -> impl Iterator<Item = &'static str> {
    options(layer).iter().map(|opt| opt.id)
}

/// Resolves an option id to its display label, searching all layers
pub fn label_for(id: &str) -> Option<&'static str> {
    Layer::ALL
        .iter()
        .flat_map(|layer| options(*layer).iter())
        .find(|opt| opt.id == id)
        .map(|opt| opt.label)
}

/// True if `id` belongs to the given layer's catalog
pub fn contains(layer: Layer, id: &str) -> bool {
    options(layer).iter().any(|opt| opt.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_within_layer() {
        for layer in Layer::ALL {
            let all: Vec<&str> = ids(layer).collect();
            let unique: HashSet<&str> = all.iter().copied().collect();
            assert_eq!(all.len(), unique.len(), "duplicate id in {}", layer);
        }
    }

    #[test]
    fn test_label_for_known_ids() {
        assert_eq!(label_for("drive"), Some("Road Trip"));
        assert_eq!(label_for("sushi"), Some("Sushi"));
        assert_eq!(label_for("cafe"), Some("Cafe"));
    }

    #[test]
    fn test_label_for_unknown_id() {
        assert_eq!(label_for("zeppelin"), None);
    }

    #[test]
    fn test_contains_respects_layer() {
        assert!(contains(Layer::Distance, "near"));
        assert!(!contains(Layer::Region, "near"));
    }

    #[test]
    fn test_layer_serde_lowercase() {
        let json = serde_json::to_string(&Layer::Specialized).unwrap();
        assert_eq!(json, r#""specialized""#);
    }
}
