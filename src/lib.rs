//! Anchor Match - compatibility scoring service for the Anchor recovery app
//!
//! This library provides the sponsor/sponsee matching core used by the
//! Anchor mobile app: a deterministic, weighted multi-factor scorer with
//! eligibility filtering, decline cooldowns, and ranked output.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{haversine_distance, MatchConfig, Matcher};
pub use models::{
    Exclusions, FindMatchesRequest, FindMatchesResponse, Profile, Role, ScoreBreakdown,
    ScoredMatch, ScoringWeights,
};
