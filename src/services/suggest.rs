use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::{taxonomy, Layer, SignalBundle, TimeBucket};

/// How long a generated suggestion set is reused
const SUGGEST_TTL: Duration = Duration::from_secs(10 * 60);

/// Number of suggestion lines in a response
const SUGGESTION_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
    pub insight: String,
    pub source: String,
}

/// Free-text dining suggestions.
///
/// Uses a chat-completions backend when a key is configured; any failure
/// or missing key falls back to a deterministic local composer so the
/// endpoint never errors. Responses are cached per context for a few
/// minutes since the inputs change slowly.
pub struct SuggestService {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    cache: Mutex<HashMap<String, (Instant, SuggestResponse)>>,
}

impl SuggestService {
    pub fn new(api_key: Option<String>, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(user_id: &str, signals: &SignalBundle) -> String {
        format!(
            "{}:{:?}:{:?}",
            user_id,
            signals.mood,
            signals.time_category.bucket()
        )
    }

    pub async fn suggest(&self, user_id: &str, signals: &SignalBundle) -> SuggestResponse {
        let key = Self::cache_key(user_id, signals);
        if let Some((at, cached)) = self.cache.lock().await.get(&key) {
            if at.elapsed() < SUGGEST_TTL {
                return cached.clone();
            }
        }

        let response = match &self.api_key {
            Some(api_key) => match self.suggest_remote(api_key, signals).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(error = %err, "Suggestion backend failed; composing locally");
                    compose_local(signals)
                }
            },
            None => compose_local(signals),
        };

        let mut cache = self.cache.lock().await;
        prune(&mut cache, Instant::now());
        cache.insert(key, (Instant::now(), response.clone()));
        response
    }

    async fn suggest_remote(
        &self,
        api_key: &str,
        signals: &SignalBundle,
    ) -> AppResult<SuggestResponse> {
        let url = format!("{}/chat/completions", self.api_url);

        let context = format!(
            "Time of day: {}. Mood: {:?}. Likes: {}. Dislikes: {}.",
            signals.time_category,
            signals.mood,
            signals.prefs.likes.join(", "),
            signals.prefs.dislikes.join(", "),
        );

        let body = json!({
            "model": "gpt-4o-mini",
            "messages": [
                {
                    "role": "system",
                    "content": "You suggest restaurants. Reply with exactly three short \
                                suggestion lines, then one line starting with 'Insight:'."
                },
                { "role": "user", "content": context }
            ],
            "max_tokens": 200
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Suggestion API returned status {}: {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessage,
        }
        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AppError::ExternalApi("Empty suggestion response".to_string()))?;

        Ok(parse_remote(content))
    }
}

/// Drops cached responses past their TTL; run on every insert so the
/// map stays bounded by the set of active context keys
fn prune(cache: &mut HashMap<String, (Instant, SuggestResponse)>, now: Instant) {
    cache.retain(|_, (at, _)| now.duration_since(*at) < SUGGEST_TTL);
}

/// Splits the model's reply into suggestion lines and the insight line.
/// A malformed reply still yields something usable.
fn parse_remote(content: &str) -> SuggestResponse {
    let mut suggestions = Vec::new();
    let mut insight = String::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix("Insight:") {
            insight = rest.trim().to_string();
        } else if suggestions.len() < SUGGESTION_COUNT {
            suggestions.push(line.trim_start_matches(['-', '*', ' ']).to_string());
        }
    }
    if insight.is_empty() {
        insight = "Trust the first pick that sounds good.".to_string();
    }
    SuggestResponse {
        suggestions,
        insight,
        source: "remote".to_string(),
    }
}

/// Deterministic composer used without a backend.
///
/// Leans on the user's likes first, then fills from the specialized
/// catalog, skipping anything disliked.
pub fn compose_local(signals: &SignalBundle) -> SuggestResponse {
    let mut topics: Vec<String> = signals.prefs.likes.clone();
    for opt in taxonomy::options(Layer::Specialized) {
        if topics.len() >= SUGGESTION_COUNT {
            break;
        }
        if signals.prefs.is_disliked(opt.label)
            || topics
                .iter()
                .any(|t| t.to_lowercase() == opt.label.to_lowercase())
        {
            continue;
        }
        topics.push(opt.label.to_string());
    }
    topics.truncate(SUGGESTION_COUNT);

    let setting = match signals.time_category.bucket() {
        TimeBucket::Morning => "to start the day",
        TimeBucket::Afternoon => "for a midday break",
        TimeBucket::Evening => "tonight",
        TimeBucket::Late => "for a late bite",
    };

    let suggestions = topics
        .into_iter()
        .map(|topic| format!("A {} spot could be just right {}.", topic, setting))
        .collect();

    SuggestResponse {
        suggestions,
        insight: format!("It's {} somewhere. Here, actually.", signals.time_category),
        source: "local".to_string(),
    }
}
