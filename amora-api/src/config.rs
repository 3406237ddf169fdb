use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db")]
    pub database_url: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl: i64,
    #[serde(default = "default_refresh_ttl")]
    pub jwt_refresh_ttl: i64,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Weights and thresholds for the match scorer. A per-direction score is
/// `text * text_weight + visual * visual_weight`; the mutual score for a
/// pair is the minimum of the two directions and must clear
/// `min_mutual_score` to be kept.
#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    #[serde(default = "default_text_weight")]
    pub text_weight: f64,
    #[serde(default = "default_visual_weight")]
    pub visual_weight: f64,
    #[serde(default = "default_min_mutual_score")]
    pub min_mutual_score: f64,
    #[serde(default = "default_match_limit")]
    pub match_limit: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 { 8000 }
fn default_db() -> String { "./amora.db".into() }
fn default_upload_dir() -> String { "./static/uploads".into() }
fn default_backup_dir() -> String { "./backups".into() }
fn default_jwt_secret() -> String { "development-secret-change-in-production".into() }
fn default_access_ttl() -> i64 { 3600 }
fn default_refresh_ttl() -> i64 { 2592000 }
fn default_cors_origins() -> String { "*".into() }
fn default_openai_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_chat_model() -> String { "gpt-4o-mini".into() }
fn default_text_weight() -> f64 { 0.7 }
fn default_visual_weight() -> f64 { 0.3 }
fn default_min_mutual_score() -> f64 { 0.7 }
fn default_match_limit() -> usize { 5 }
fn default_request_timeout() -> u64 { 30 }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            text_weight: default_text_weight(),
            visual_weight: default_visual_weight(),
            min_mutual_score: default_min_mutual_score(),
            match_limit: default_match_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: default_db(),
            upload_dir: default_upload_dir(),
            backup_dir: default_backup_dir(),
            jwt_secret: default_jwt_secret(),
            jwt_access_ttl: default_access_ttl(),
            jwt_refresh_ttl: default_refresh_ttl(),
            cors_origins: default_cors_origins(),
            openai_base_url: default_openai_base_url(),
            openai_api_key: String::new(),
            chat_model: default_chat_model(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AMORA_API").separator("__"))
            .build()?;
        let mut loaded: Self = config.try_deserialize().unwrap_or_default();

        // Token validation in the auth extractor reads JWT_SECRET; signing
        // has to agree with it when the variable is set.
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            loaded.jwt_secret = secret;
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scoring_weights() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.text_weight, 0.7);
        assert_eq!(scoring.visual_weight, 0.3);
        assert_eq!(scoring.min_mutual_score, 0.7);
        assert_eq!(scoring.match_limit, 5);
    }

    #[test]
    fn default_config_is_self_consistent() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert!((config.scoring.text_weight + config.scoring.visual_weight - 1.0).abs() < 1e-9);
    }
}
