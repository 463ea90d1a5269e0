use crate::core::Matcher;
use crate::models::{ErrorResponse, Exclusions, FindMatchesRequest, FindMatchesResponse, HealthResponse};
use crate::services::{SupabaseClient, SupabaseError};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Duration;
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub supabase: Arc<SupabaseClient>,
    pub matcher: Matcher,
    /// Expected bearer token; None accepts any non-empty token.
    pub api_token: Option<String>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

fn error_response(status_code: u16, error: &str, message: String) -> HttpResponse {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
        status_code,
    };
    match status_code {
        400 => HttpResponse::BadRequest().json(body),
        401 => HttpResponse::Unauthorized().json(body),
        404 => HttpResponse::NotFound().json(body),
        422 => HttpResponse::UnprocessableEntity().json(body),
        502 => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Extract and check the bearer token on the request.
fn authorize(req: &HttpRequest, expected: &Option<String>) -> bool {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match (token, expected) {
        (Some(token), Some(expected)) => token == expected,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "requester_id": "string",
///   "limit": 20
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
    http_req: HttpRequest,
) -> impl Responder {
    if !authorize(&http_req, &state.api_token) {
        return error_response(
            401,
            "unauthorized",
            "Missing or invalid bearer token".to_string(),
        );
    }

    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return error_response(400, "bad_request", errors.to_string());
    }

    let requester_id = &req.requester_id;
    let limit = req.limit as usize;
    let started = Instant::now();
    let now = chrono::Utc::now();

    tracing::info!("Finding matches for requester: {}, limit: {}", requester_id, limit);

    // Fetch requester profile first; nothing else is useful without it
    let requester = match state.supabase.get_profile(requester_id).await {
        Ok(profile) => profile,
        Err(SupabaseError::NotFound(msg)) => {
            tracing::info!("Requester not found: {}", requester_id);
            return error_response(404, "not_found", msg);
        }
        Err(e) => {
            tracing::error!("Failed to fetch requester {}: {}", requester_id, e);
            return error_response(502, "upstream_error", e.to_string());
        }
    };

    // Profiles missing program, location, or sobriety date cannot be
    // scored; tell the client to direct the user to finish their profile
    if !requester.is_complete_for_matching() {
        return error_response(
            422,
            "incomplete_profile",
            "Profile is missing fields required for matching (program, city/state, sobriety date)"
                .to_string(),
        );
    }

    // Candidate pool and exclusion sets are independent reads; fetch them
    // concurrently before the synchronous scoring pass
    let cooldown = Duration::days(state.matcher.config().cooldown_days);
    let (pool, relationships, declines) = tokio::join!(
        state.supabase.get_candidate_pool(requester.role),
        state.supabase.get_relationships(requester_id),
        state.supabase.get_recent_declines(requester_id, now - cooldown),
    );

    let (candidates, connected, declines) = match (pool, relationships, declines) {
        (Ok(c), Ok(r), Ok(d)) => (c, r, d),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            tracing::error!("Failed to fetch matching inputs for {}: {}", requester_id, e);
            return error_response(502, "upstream_error", e.to_string());
        }
    };

    tracing::debug!(
        "Fetched {} candidates, {} relationships, {} recent declines for {}",
        candidates.len(),
        connected.len(),
        declines.len(),
        requester_id
    );

    let exclusions = Exclusions {
        connected: connected.into_iter().collect(),
        declines,
    };

    let result = state
        .matcher
        .find_matches(&requester, candidates, &exclusions, now, limit);

    let response = FindMatchesResponse {
        matches: result.matches,
        execution_time_ms: started.elapsed().as_millis() as u64,
    };

    tracing::info!(
        "Returning {} matches for requester {} (from {} candidates, {}ms)",
        response.matches.len(),
        requester_id,
        result.total_candidates,
        response.execution_time_ms
    );

    HttpResponse::Ok().json(response)
}
