use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub supabase: SupabaseSettings,
    pub table: TableSettings,
    pub matching: MatchingSettings,
    pub scoring: ScoringConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Shared bearer token required on matching requests. When unset, any
    /// non-empty bearer token is accepted.
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSettings {
    pub profiles: String,
    pub connections: String,
    pub declines: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: i64,
    #[serde(default = "default_min_tenure_days")]
    pub min_tenure_days: i64,
    /// "fixed" (365-day minimum) or "proportional" (twice the requester's
    /// tenure).
    #[serde(default = "default_threshold_strategy")]
    pub threshold_strategy: String,
    /// "overlap" (label-set intersection) or "commitment" (single
    /// commitment-level label).
    #[serde(default = "default_availability_model")]
    pub availability_model: String,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            result_cap: default_result_cap(),
            cooldown_days: default_cooldown_days(),
            min_tenure_days: default_min_tenure_days(),
            threshold_strategy: default_threshold_strategy(),
            availability_model: default_availability_model(),
        }
    }
}

fn default_result_cap() -> usize { 20 }
fn default_cooldown_days() -> i64 { 30 }
fn default_min_tenure_days() -> i64 { 365 }
fn default_threshold_strategy() -> String { "fixed".to_string() }
fn default_availability_model() -> String { "overlap".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_program_weight")]
    pub program: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_experience_weight")]
    pub experience: f64,
    #[serde(default = "default_approach_weight")]
    pub approach: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            program: default_program_weight(),
            availability: default_availability_weight(),
            location: default_location_weight(),
            experience: default_experience_weight(),
            approach: default_approach_weight(),
        }
    }
}

fn default_program_weight() -> f64 { 0.35 }
fn default_availability_weight() -> f64 { 0.25 }
fn default_location_weight() -> f64 { 0.20 }
fn default_experience_weight() -> f64 { 0.15 }
fn default_approach_weight() -> f64 { 0.05 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with ANCHOR_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with ANCHOR_)
            // e.g., ANCHOR_SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("ANCHOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Apply bare env-var fallbacks for the Supabase connection
        let settings = apply_env_fallbacks(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ANCHOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Fall back to the conventional SUPABASE_URL / SUPABASE_SERVICE_KEY
/// variables when the prefixed forms are not set.
fn apply_env_fallbacks(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let supabase_url = env::var("SUPABASE_URL")
        .or_else(|_| env::var("ANCHOR_SUPABASE__URL"))
        .ok();
    let service_key = env::var("SUPABASE_SERVICE_KEY")
        .or_else(|_| env::var("ANCHOR_SUPABASE__SERVICE_KEY"))
        .ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = supabase_url {
        builder = builder.set_override("supabase.url", url)?;
    }
    if let Some(key) = service_key {
        builder = builder.set_override("supabase.service_key", key)?;
    }

    builder.build()
}
