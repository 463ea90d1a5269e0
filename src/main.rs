mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::Settings;
use core::{AvailabilityModel, MatchConfig, Matcher, ScoringSettings, ThresholdStrategy};
use models::ScoringWeights;
use routes::matches::AppState;
use services::{SupabaseClient, SupabaseTables};
use std::sync::Arc;
use tracing::{error, info};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Build the matcher configuration from settings, validating the weight
/// vector and the strategy names.
fn build_match_config(settings: &Settings) -> Result<MatchConfig, String> {
    let weights = ScoringWeights {
        program: settings.scoring.weights.program,
        availability: settings.scoring.weights.availability,
        location: settings.scoring.weights.location,
        experience: settings.scoring.weights.experience,
        approach: settings.scoring.weights.approach,
    };
    weights.validate()?;

    let threshold_strategy = match settings.matching.threshold_strategy.as_str() {
        "fixed" => ThresholdStrategy::Fixed,
        "proportional" => ThresholdStrategy::Proportional,
        other => return Err(format!("Unknown threshold strategy: {}", other)),
    };

    let availability_model = match settings.matching.availability_model.as_str() {
        "overlap" => AvailabilityModel::Overlap,
        "commitment" => AvailabilityModel::Commitment,
        other => return Err(format!("Unknown availability model: {}", other)),
    };

    Ok(MatchConfig {
        scoring: ScoringSettings {
            weights,
            min_tenure_days: settings.matching.min_tenure_days,
            threshold_strategy,
            availability_model,
        },
        cooldown_days: settings.matching.cooldown_days,
        result_cap: settings.matching.result_cap,
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration before logging so the logging section applies
    let settings = Settings::load()
        .unwrap_or_else(|e| panic!("Configuration error: {}", e));

    // Initialize logging; RUST_LOG overrides the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Anchor matching service...");
    info!("Configuration loaded successfully");

    // Initialize the data store client
    let tables = SupabaseTables {
        profiles: settings.table.profiles.clone(),
        connections: settings.table.connections.clone(),
        declines: settings.table.declines.clone(),
    };

    let supabase = Arc::new(SupabaseClient::new(
        settings.supabase.url.clone(),
        settings.supabase.service_key.clone(),
        tables,
    ));

    info!("Supabase client initialized");

    // Build the matcher; an invalid weight table is a startup error
    let match_config = build_match_config(&settings).unwrap_or_else(|e| {
        error!("Invalid matcher configuration: {}", e);
        panic!("Matcher configuration error: {}", e);
    });

    let matcher = Matcher::new(match_config);

    info!("Matcher initialized with config: {:?}", matcher.config());

    // Build application state
    let app_state = AppState {
        supabase,
        matcher,
        api_token: settings.server.api_token.clone(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
