// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    DeclineRecord, Exclusions, Profile, Role, ScoreBreakdown, ScoredMatch, ScoringWeights,
};
pub use requests::FindMatchesRequest;
pub use responses::{ErrorResponse, FindMatchesResponse, HealthResponse};
