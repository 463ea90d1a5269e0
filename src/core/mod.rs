// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use distance::haversine_distance;
pub use filters::{filter_candidates, is_eligible, is_excluded};
pub use matcher::{MatchConfig, MatchResult, Matcher};
pub use scoring::{
    calculate_compatibility, AvailabilityModel, ScoringSettings, ThresholdStrategy,
};
