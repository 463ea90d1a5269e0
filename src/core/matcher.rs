use crate::core::filters::filter_candidates;
use crate::core::scoring::{calculate_compatibility, ScoringSettings};
use crate::models::{Exclusions, Profile, ScoredMatch};
use chrono::{DateTime, Utc};

/// Configuration for one matcher instance. All thresholds and caps live
/// here rather than in module constants so deployments can tune them.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    pub scoring: ScoringSettings,
    /// Days a declined candidate stays suppressed.
    pub cooldown_days: i64,
    /// Maximum number of matches returned.
    pub result_cap: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringSettings::default(),
            cooldown_days: 30,
            result_cap: 20,
        }
    }
}

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<ScoredMatch>,
    pub total_candidates: usize,
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Eligibility filtering (self, soft-deleted, role compatibility)
/// 2. Exclusion filtering (existing relationships, decline cooldown)
/// 3. Per-candidate factor scoring and weighted aggregation
/// 4. Ranking and truncation
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self {
            config: MatchConfig::default(),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Find matches for a requester against a candidate pool snapshot.
    ///
    /// Pure function of its inputs: no state is carried between calls, and
    /// `now` is passed in so cooldown and tenure arithmetic is testable.
    ///
    /// # Arguments
    /// * `requester` - Profile on whose behalf matches are computed
    /// * `candidates` - Raw candidate pool from the data store
    /// * `exclusions` - Permanent and temporary exclusion sets
    /// * `now` - Evaluation instant
    /// * `limit` - Caller's requested result count, capped by config
    ///
    /// # Returns
    /// MatchResult with scored matches sorted descending by score; ties
    /// keep their original pool order.
    pub fn find_matches(
        &self,
        requester: &Profile,
        candidates: Vec<Profile>,
        exclusions: &Exclusions,
        now: DateTime<Utc>,
        limit: usize,
    ) -> MatchResult {
        let total_candidates = candidates.len();

        let eligible = filter_candidates(
            requester,
            candidates,
            exclusions,
            now,
            self.config.cooldown_days,
        );

        let mut scored_matches: Vec<ScoredMatch> = eligible
            .into_iter()
            .map(|candidate| {
                let (score, breakdown) =
                    calculate_compatibility(requester, &candidate, now, &self.config.scoring);

                ScoredMatch {
                    candidate_id: candidate.id,
                    compatibility_score: score,
                    score_breakdown: breakdown,
                }
            })
            .collect();

        // Stable sort: equal scores keep pool order
        scored_matches.sort_by(|a, b| b.compatibility_score.cmp(&a.compatibility_score));

        scored_matches.truncate(limit.min(self.config.result_cap));

        MatchResult {
            matches: scored_matches,
            total_candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
