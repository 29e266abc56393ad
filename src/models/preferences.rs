use serde::{Deserialize, Serialize};

/// Stored taste preferences: free-text like/dislike terms.
///
/// Likes are appended verbatim to search keywords and multiplicatively
/// boost matching candidates; dislikes suppress keyword tokens and
/// down-weight matching candidates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
}

impl UserPreferences {
    pub fn new(likes: Vec<String>, dislikes: Vec<String>) -> Self {
        Self { likes, dislikes }
    }

    /// Case-insensitive exact match against the dislike list
    pub fn is_disliked(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.dislikes
            .iter()
            .any(|dislike| dislike.to_lowercase() == needle)
    }

    /// Adds a like term, ignoring case-insensitive duplicates
    pub fn add_like(&mut self, term: impl Into<String>) {
        let term = term.into();
        let lowered = term.to_lowercase();
        if !self.likes.iter().any(|like| like.to_lowercase() == lowered) {
            self.likes.push(term);
        }
    }

    /// Adds a dislike term, ignoring case-insensitive duplicates
    pub fn add_dislike(&mut self, term: impl Into<String>) {
        let term = term.into();
        if !self.is_disliked(&term) {
            self.dislikes.push(term);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let prefs = UserPreferences::default();
        assert!(prefs.likes.is_empty());
        assert!(prefs.dislikes.is_empty());
    }

    #[test]
    fn test_is_disliked_case_insensitive() {
        let prefs = UserPreferences::new(vec![], vec!["Sushi".to_string()]);
        assert!(prefs.is_disliked("sushi"));
        assert!(prefs.is_disliked("SUSHI"));
        assert!(!prefs.is_disliked("ramen"));
    }

    #[test]
    fn test_add_like_ignores_duplicates() {
        let mut prefs = UserPreferences::default();
        prefs.add_like("ramen");
        prefs.add_like("Ramen");
        assert_eq!(prefs.likes, vec!["ramen".to_string()]);
    }

    #[test]
    fn test_add_dislike_ignores_duplicates() {
        let mut prefs = UserPreferences::default();
        prefs.add_dislike("cilantro");
        prefs.add_dislike("CILANTRO");
        assert_eq!(prefs.dislikes.len(), 1);
    }

    #[test]
    fn test_serde_round_trip() {
        let prefs = UserPreferences::new(
            vec!["ramen".to_string()],
            vec!["cilantro".to_string()],
        );
        let json = serde_json::to_string(&prefs).unwrap();
        let parsed: UserPreferences = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, prefs);
    }
}
