use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role a participant plays in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sponsor,
    Sponsee,
    Both,
}

impl Role {
    /// Whether a candidate with this role can be matched against a
    /// requester with `requester` role.
    pub fn complements(self, requester: Role) -> bool {
        match requester {
            Role::Sponsor => matches!(self, Role::Sponsee | Role::Both),
            Role::Sponsee => matches!(self, Role::Sponsor | Role::Both),
            Role::Both => true,
        }
    }
}

/// Participant profile as stored in the data store.
///
/// Role and program are authoritative for matching; geographic, temporal,
/// and free-text fields are optional and degrade the affected factor to a
/// zero sub-score when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Sobriety/clean date establishing tenure.
    #[serde(default)]
    pub sobriety_date: Option<NaiveDate>,
    /// Free text describing the participant's approach to the work.
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub availability: Vec<String>,
    /// Single commitment label ("low"/"medium"/"high"), used only by the
    /// alternate commitment-level availability model.
    #[serde(default)]
    pub commitment: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Structured preference bag, reserved for future matching.
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Profile {
    pub fn program(&self) -> Option<&str> {
        self.program.as_deref().filter(|p| !p.is_empty())
    }

    /// Days of tenure elapsed as of `now`, if a sobriety date is recorded.
    pub fn tenure_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.sobriety_date
            .map(|d| (now.date_naive() - d).num_days().max(0))
    }

    /// Whether the profile carries every field the scorer requires of a
    /// requester (program, city+state, sobriety date).
    pub fn is_complete_for_matching(&self) -> bool {
        self.program().is_some()
            && self.city.as_deref().is_some_and(|c| !c.is_empty())
            && self.state.as_deref().is_some_and(|s| !s.is_empty())
            && self.sobriety_date.is_some()
    }
}

/// A decline recorded against a candidate, with its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclineRecord {
    pub candidate_id: String,
    pub declined_at: DateTime<Utc>,
}

/// Exclusion sets fetched alongside the candidate pool.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    /// Candidates with an existing active or pending relationship.
    pub connected: HashSet<String>,
    /// Candidates declined by the requester, with decline timestamps.
    pub declines: Vec<DeclineRecord>,
}

/// Per-factor sub-scores on an independent 0-100 integer scale.
///
/// `preferences` is the reserved structured-preference placeholder; it is
/// reported for transparency but carries no weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub program: u8,
    pub availability: u8,
    pub location: u8,
    pub experience: u8,
    pub approach: u8,
    pub preferences: u8,
}

/// Scored match result for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub candidate_id: String,
    pub compatibility_score: u8,
    pub score_breakdown: ScoreBreakdown,
}

/// Weights for the five scoring factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub program: f64,
    pub availability: f64,
    pub location: f64,
    pub experience: f64,
    /// Approach/preference text similarity.
    pub approach: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.program + self.availability + self.location + self.experience + self.approach
    }

    /// Configuration invariant: the weight vector must sum to 1.0.
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("scoring weights must sum to 1.0, got {}", sum));
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            program: 0.35,
            availability: 0.25,
            location: 0.20,
            experience: 0.15,
            approach: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_profile(id: &str, role: Role) -> Profile {
        Profile {
            id: id.to_string(),
            role,
            program: None,
            city: None,
            state: None,
            latitude: None,
            longitude: None,
            sobriety_date: None,
            approach: None,
            availability: vec![],
            commitment: None,
            bio: None,
            preferences: None,
            is_deleted: false,
        }
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let weights = ScoringWeights {
            program: 0.5,
            ..ScoringWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn role_complements() {
        assert!(Role::Sponsor.complements(Role::Sponsee));
        assert!(Role::Both.complements(Role::Sponsee));
        assert!(!Role::Sponsee.complements(Role::Sponsee));
        assert!(Role::Sponsee.complements(Role::Both));
        assert!(Role::Sponsor.complements(Role::Both));
    }

    #[test]
    fn tenure_missing_date_is_none() {
        let profile = bare_profile("p1", Role::Sponsor);
        assert_eq!(profile.tenure_days(Utc::now()), None);
        assert!(!profile.is_complete_for_matching());
    }

    #[test]
    fn empty_program_counts_as_missing() {
        let mut profile = bare_profile("p1", Role::Sponsee);
        profile.program = Some(String::new());
        assert_eq!(profile.program(), None);
    }
}
