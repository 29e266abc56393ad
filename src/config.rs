use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL (feedback weights, histories, preferences)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Google Places API key; when absent, searches serve mock venues
    #[serde(default)]
    pub places_api_key: Option<String>,

    /// Google Places API base URL
    #[serde(default = "default_places_api_url")]
    pub places_api_url: String,

    /// OpenWeather API key; when absent, weather resolves to "unknown"
    #[serde(default)]
    pub weather_api_key: Option<String>,

    /// OpenWeather API base URL
    #[serde(default = "default_weather_api_url")]
    pub weather_api_url: String,

    /// OpenAI API key for contextual suggestions (optional)
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Fallback latitude when the client provides no location
    #[serde(default = "default_lat")]
    pub default_lat: f64,

    /// Fallback longitude when the client provides no location
    #[serde(default = "default_lng")]
    pub default_lng: f64,

    /// Free-tier cap on combination rerolls
    #[serde(default = "default_combo_reroll_cap")]
    pub combo_reroll_cap: u32,

    /// Free-tier cap on restaurant rotation rerolls
    #[serde(default = "default_rotation_reroll_cap")]
    pub rotation_reroll_cap: u32,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_places_api_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

fn default_weather_api_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

// Jacksonville, FL, the launch market
fn default_lat() -> f64 {
    30.3322
}

fn default_lng() -> f64 {
    -81.6557
}

fn default_combo_reroll_cap() -> u32 {
    3
}

fn default_rotation_reroll_cap() -> u32 {
    6
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

impl Default for Config {
    fn default() -> Self {
        // envy fills every field from defaults when the map is empty
        envy::from_iter::<_, Config>(std::iter::empty::<(String, String)>())
            .expect("default config must deserialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.combo_reroll_cap, 3);
        assert_eq!(config.rotation_reroll_cap, 6);
        assert!(config.places_api_key.is_none());
    }
}
