use crate::core::distance::haversine_distance;
use crate::models::{Profile, Role, ScoreBreakdown, ScoringWeights};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Strategy for deriving the minimum tenure a sponsor must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdStrategy {
    /// Fixed minimum tenure in days (default: one year).
    Fixed,
    /// Twice the requester's own tenure, compared in years.
    Proportional,
}

/// How availability is interpreted when scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityModel {
    /// Set overlap over availability labels (primary model).
    Overlap,
    /// Single commitment-level label mapped to a weekly day count.
    Commitment,
}

/// Settings the factor scorers need beyond the raw profiles.
#[derive(Debug, Clone, Copy)]
pub struct ScoringSettings {
    pub weights: ScoringWeights,
    pub min_tenure_days: i64,
    pub threshold_strategy: ThresholdStrategy,
    pub availability_model: AvailabilityModel,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            min_tenure_days: 365,
            threshold_strategy: ThresholdStrategy::Fixed,
            availability_model: AvailabilityModel::Overlap,
        }
    }
}

/// Neutral score for the structured-preference factor, which is reserved
/// for future matching and not yet computed.
const NEUTRAL_PREFERENCE_SCORE: f64 = 0.5;

/// Program match: exact string equality, no normalization (0.0 or 1.0)
#[inline]
pub fn score_program(requester: &Profile, candidate: &Profile) -> f64 {
    match (requester.program(), candidate.program()) {
        (Some(a), Some(b)) if a == b => 1.0,
        _ => 0.0,
    }
}

/// Availability overlap: |intersection| / max(|A|, |B|) over the label sets.
/// Either side empty scores 0.0.
pub fn score_availability(requester: &[String], candidate: &[String]) -> f64 {
    if requester.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let a: HashSet<&str> = requester.iter().map(|s| s.as_str()).collect();
    let b: HashSet<&str> = candidate.iter().map(|s| s.as_str()).collect();

    let intersection = a.intersection(&b).count() as f64;
    let larger = a.len().max(b.len()) as f64;

    intersection / larger
}

/// Weekly day count for a commitment-level label.
fn commitment_days(label: &str) -> Option<f64> {
    match label {
        "low" => Some(2.0),
        "medium" => Some(4.0),
        "high" => Some(7.0),
        _ => None,
    }
}

/// Alternate availability model for profiles carrying a single commitment
/// label rather than a label set. A candidate meeting or exceeding the
/// requester's day count scores full; otherwise proportional.
pub fn score_commitment(requester: Option<&str>, candidate: Option<&str>) -> f64 {
    let (Some(required), Some(offered)) = (
        requester.and_then(commitment_days),
        candidate.and_then(commitment_days),
    ) else {
        return 0.0;
    };

    if offered >= required {
        1.0
    } else {
        offered / required
    }
}

/// Location proximity, mileage-gated:
/// - < 10 miles and same city+state: full credit
/// - < 100 miles and same state: 0.6
/// - < 100 miles, different state: 0.4
/// - >= 100 miles, or missing coordinates/city/state on either side: 0.0
pub fn score_location(requester: &Profile, candidate: &Profile) -> f64 {
    let (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) = (
        requester.latitude,
        requester.longitude,
        candidate.latitude,
        candidate.longitude,
    ) else {
        return 0.0;
    };

    let (Some(city1), Some(state1), Some(city2), Some(state2)) = (
        requester.city.as_deref(),
        requester.state.as_deref(),
        candidate.city.as_deref(),
        candidate.state.as_deref(),
    ) else {
        return 0.0;
    };

    let distance_mi = haversine_distance(lat1, lon1, lat2, lon2);

    if distance_mi >= 100.0 {
        return 0.0;
    }

    if distance_mi < 10.0 && city1 == city2 && state1 == state2 {
        1.0
    } else if state1 == state2 {
        0.6
    } else {
        0.4
    }
}

/// Experience/eligibility: only computed for the sponsee -> sponsor
/// direction; other role pairings are neutral. Candidate tenure is
/// compared against the configured minimum, capped at full credit.
pub fn score_experience(
    requester: &Profile,
    candidate: &Profile,
    now: DateTime<Utc>,
    settings: &ScoringSettings,
) -> f64 {
    let asymmetric = requester.role == Role::Sponsee
        && matches!(candidate.role, Role::Sponsor | Role::Both);
    if !asymmetric {
        return 1.0;
    }

    let Some(tenure_days) = candidate.tenure_days(now) else {
        return 0.0;
    };

    let required_days = match settings.threshold_strategy {
        ThresholdStrategy::Fixed => settings.min_tenure_days as f64,
        ThresholdStrategy::Proportional => {
            // Twice the requester's tenure, expressed in years.
            let requester_years = requester.tenure_days(now).unwrap_or(0) as f64 / 365.25;
            requester_years * 2.0 * 365.25
        }
    };

    if required_days <= 0.0 {
        return 1.0;
    }

    (tenure_days as f64 / required_days).min(1.0)
}

/// Lowercase, strip punctuation, split on whitespace, drop tokens of
/// length <= 2.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}

/// Approach text similarity: bag-of-words cosine over term-frequency
/// vectors built on the shared vocabulary. Either side reducing to zero
/// tokens scores 0.0.
pub fn score_approach(requester: Option<&str>, candidate: Option<&str>) -> f64 {
    let tokens_a = tokenize(requester.unwrap_or(""));
    let tokens_b = tokenize(candidate.unwrap_or(""));

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut freq_a: HashMap<&str, f64> = HashMap::new();
    for t in &tokens_a {
        *freq_a.entry(t.as_str()).or_insert(0.0) += 1.0;
    }
    let mut freq_b: HashMap<&str, f64> = HashMap::new();
    for t in &tokens_b {
        *freq_b.entry(t.as_str()).or_insert(0.0) += 1.0;
    }

    let vocabulary: HashSet<&str> = freq_a.keys().chain(freq_b.keys()).copied().collect();

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for term in vocabulary {
        let a = freq_a.get(term).copied().unwrap_or(0.0);
        let b = freq_b.get(term).copied().unwrap_or(0.0);
        dot += a * b;
        norm_a += a * a;
        norm_b += b * b;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Structured-preference factor. Placeholder until structured preference
/// matching ships; always neutral.
#[inline]
pub fn score_preferences(_requester: &Profile, _candidate: &Profile) -> f64 {
    NEUTRAL_PREFERENCE_SCORE
}

fn to_percent(sub_score: f64) -> u8 {
    (sub_score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Calculate the compatibility score (0-100) and per-factor breakdown for
/// one requester/candidate pair.
///
/// Scoring formula:
/// score = round(100 * (
///     program * 0.35 +        # same program/fellowship
///     availability * 0.25 +   # overlapping availability labels
///     location * 0.20 +       # tiered distance credit
///     experience * 0.15 +     # sponsor tenure vs. required minimum
///     approach * 0.05         # approach text similarity
/// ))
///
/// The structured-preference stub is reported in the breakdown but is not
/// part of the weighted sum until it computes something.
pub fn calculate_compatibility(
    requester: &Profile,
    candidate: &Profile,
    now: DateTime<Utc>,
    settings: &ScoringSettings,
) -> (u8, ScoreBreakdown) {
    let program = score_program(requester, candidate);

    let availability = match settings.availability_model {
        AvailabilityModel::Overlap => {
            score_availability(&requester.availability, &candidate.availability)
        }
        AvailabilityModel::Commitment => {
            score_commitment(requester.commitment.as_deref(), candidate.commitment.as_deref())
        }
    };

    let location = score_location(requester, candidate);
    let experience = score_experience(requester, candidate, now, settings);
    let approach = score_approach(requester.approach.as_deref(), candidate.approach.as_deref());
    let preferences = score_preferences(requester, candidate);

    let weights = &settings.weights;
    let weighted_sum = program * weights.program
        + availability * weights.availability
        + location * weights.location
        + experience * weights.experience
        + approach * weights.approach;

    let score = (weighted_sum.clamp(0.0, 1.0) * 100.0).round() as u8;

    let breakdown = ScoreBreakdown {
        program: to_percent(program),
        availability: to_percent(availability),
        location: to_percent(location),
        experience: to_percent(experience),
        approach: to_percent(approach),
        preferences: to_percent(preferences),
    };

    (score, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn create_profile(id: &str, role: Role, program: &str) -> Profile {
        Profile {
            id: id.to_string(),
            role,
            program: Some(program.to_string()),
            city: Some("Austin".to_string()),
            state: Some("TX".to_string()),
            latitude: Some(30.2672),
            longitude: Some(-97.7431),
            sobriety_date: NaiveDate::from_ymd_opt(2020, 1, 15),
            approach: Some("Working the steps with weekly check-ins".to_string()),
            availability: vec!["Weekday Evenings".to_string()],
            commitment: None,
            bio: None,
            preferences: None,
            is_deleted: false,
        }
    }

    #[test]
    fn test_program_exact_match() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let b = create_profile("b", Role::Sponsor, "AA");
        assert_eq!(score_program(&a, &b), 1.0);
        // Symmetric
        assert_eq!(score_program(&b, &a), 1.0);
    }

    #[test]
    fn test_program_case_sensitive() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let b = create_profile("b", Role::Sponsor, "aa");
        assert_eq!(score_program(&a, &b), 0.0);
    }

    #[test]
    fn test_program_missing() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.program = None;
        assert_eq!(score_program(&a, &b), 0.0);
    }

    #[test]
    fn test_availability_identical_sets() {
        let labels = vec!["Weekday Evenings".to_string(), "Flexible".to_string()];
        assert_eq!(score_availability(&labels, &labels), 1.0);
    }

    #[test]
    fn test_availability_empty_side() {
        let labels = vec!["Flexible".to_string()];
        assert_eq!(score_availability(&labels, &[]), 0.0);
        assert_eq!(score_availability(&[], &labels), 0.0);
    }

    #[test]
    fn test_availability_partial_overlap() {
        let a = vec![
            "Weekday Evenings".to_string(),
            "Weekend Mornings".to_string(),
        ];
        let b = vec![
            "Weekday Evenings".to_string(),
            "Weekend Mornings".to_string(),
            "Flexible".to_string(),
        ];
        let score = score_availability(&a, &b);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_commitment_model() {
        // Candidate meets requirement
        assert_eq!(score_commitment(Some("medium"), Some("high")), 1.0);
        // Proportional shortfall: 2 days offered vs 7 required
        assert!((score_commitment(Some("high"), Some("low")) - 2.0 / 7.0).abs() < 1e-9);
        // Unknown or missing labels
        assert_eq!(score_commitment(Some("daily"), Some("high")), 0.0);
        assert_eq!(score_commitment(None, Some("high")), 0.0);
    }

    #[test]
    fn test_location_same_city() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let b = create_profile("b", Role::Sponsor, "AA");
        assert_eq!(score_location(&a, &b), 1.0);
    }

    #[test]
    fn test_location_same_state_nearby() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        // San Marcos, TX: ~30 miles from Austin
        b.city = Some("San Marcos".to_string());
        b.latitude = Some(29.8833);
        b.longitude = Some(-97.9414);
        assert_eq!(score_location(&a, &b), 0.6);
    }

    #[test]
    fn test_location_different_state_nearby() {
        // Texarkana TX vs Texarkana AR, about a mile apart across the line
        let mut a = create_profile("a", Role::Sponsee, "AA");
        a.city = Some("Texarkana".to_string());
        a.state = Some("TX".to_string());
        a.latitude = Some(33.4251);
        a.longitude = Some(-94.0477);
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.city = Some("Texarkana".to_string());
        b.state = Some("AR".to_string());
        b.latitude = Some(33.4418);
        b.longitude = Some(-94.0377);
        assert_eq!(score_location(&a, &b), 0.4);
    }

    #[test]
    fn test_location_too_far() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        // El Paso, TX: same state but ~520 miles away
        b.city = Some("El Paso".to_string());
        b.latitude = Some(31.7619);
        b.longitude = Some(-106.4850);
        assert_eq!(score_location(&a, &b), 0.0);
    }

    #[test]
    fn test_location_missing_coordinates() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.latitude = None;
        assert_eq!(score_location(&a, &b), 0.0);
    }

    #[test]
    fn test_location_missing_city() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.city = None;
        assert_eq!(score_location(&a, &b), 0.0);
    }

    #[test]
    fn test_experience_meets_minimum() {
        let now = Utc::now();
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.sobriety_date = Some(now.date_naive() - Duration::days(5 * 365));
        let settings = ScoringSettings::default();
        assert_eq!(score_experience(&a, &b, now, &settings), 1.0);
    }

    #[test]
    fn test_experience_partial() {
        let now = Utc::now();
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.sobriety_date = Some(now.date_naive() - Duration::days(100));
        let settings = ScoringSettings::default();
        let score = score_experience(&a, &b, now, &settings);
        assert!((score - 100.0 / 365.0).abs() < 1e-9);
    }

    #[test]
    fn test_experience_missing_date_is_zero() {
        let now = Utc::now();
        let a = create_profile("a", Role::Sponsee, "AA");
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.sobriety_date = None;
        let settings = ScoringSettings::default();
        assert_eq!(score_experience(&a, &b, now, &settings), 0.0);
    }

    #[test]
    fn test_experience_neutral_for_reversed_roles() {
        let now = Utc::now();
        let a = create_profile("a", Role::Sponsor, "AA");
        let mut b = create_profile("b", Role::Sponsee, "AA");
        b.sobriety_date = None;
        let settings = ScoringSettings::default();
        assert_eq!(score_experience(&a, &b, now, &settings), 1.0);
    }

    #[test]
    fn test_experience_proportional_threshold() {
        let now = Utc::now();
        let mut a = create_profile("a", Role::Sponsee, "AA");
        // Requester two years in: sponsor needs four years
        a.sobriety_date = Some(now.date_naive() - Duration::days(730));
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.sobriety_date = Some(now.date_naive() - Duration::days(730));
        let settings = ScoringSettings {
            threshold_strategy: ThresholdStrategy::Proportional,
            ..ScoringSettings::default()
        };
        let score = score_experience(&a, &b, now, &settings);
        assert!((score - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_approach_identical_text() {
        let text = "One day at a time, working through the steps together";
        let score = score_approach(Some(text), Some(text));
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_approach_empty_text() {
        assert_eq!(score_approach(None, Some("anything here")), 0.0);
        assert_eq!(score_approach(Some(""), Some("anything here")), 0.0);
        // All tokens filtered out by the length cutoff
        assert_eq!(score_approach(Some("a of to"), Some("anything here")), 0.0);
    }

    #[test]
    fn test_approach_disjoint_text() {
        let score = score_approach(Some("meditation mornings quiet"), Some("service meetings sponsor"));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_approach_partial_overlap() {
        let score = score_approach(
            Some("daily meetings and step work"),
            Some("step work with weekly calls"),
        );
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_tokenize_filters_short_tokens() {
        let tokens = tokenize("I am ON a 12-step PATH!");
        assert_eq!(tokens, vec!["step", "path"]);
    }

    #[test]
    fn test_preferences_neutral() {
        let a = create_profile("a", Role::Sponsee, "AA");
        let b = create_profile("b", Role::Sponsor, "AA");
        assert_eq!(score_preferences(&a, &b), 0.5);
    }

    #[test]
    fn test_compatibility_in_range_with_breakdown() {
        let now = Utc::now();
        let a = create_profile("a", Role::Sponsee, "AA");
        let b = create_profile("b", Role::Sponsor, "AA");
        let settings = ScoringSettings::default();

        let (score, breakdown) = calculate_compatibility(&a, &b, now, &settings);

        assert!(score <= 100);
        assert_eq!(breakdown.program, 100);
        // Identical approach text
        assert_eq!(breakdown.approach, 100);
        // Reserved stub, reported but unweighted
        assert_eq!(breakdown.preferences, 50);
        assert!(breakdown.location <= 100);
    }

    #[test]
    fn test_approach_text_affects_score() {
        let now = Utc::now();
        let a = create_profile("a", Role::Sponsee, "AA");

        let mut aligned = create_profile("b", Role::Sponsor, "AA");
        aligned.approach = a.approach.clone();
        let mut disjoint = create_profile("c", Role::Sponsor, "AA");
        disjoint.approach = Some("Sponsorship through service commitments".to_string());

        let settings = ScoringSettings::default();
        let (aligned_score, aligned_breakdown) =
            calculate_compatibility(&a, &aligned, now, &settings);
        let (disjoint_score, disjoint_breakdown) =
            calculate_compatibility(&a, &disjoint, now, &settings);

        assert_eq!(aligned_breakdown.approach, 100);
        assert_eq!(disjoint_breakdown.approach, 0);
        assert!(
            aligned_score > disjoint_score,
            "approach similarity must move the final score: {} vs {}",
            aligned_score,
            disjoint_score
        );
    }

    #[test]
    fn test_compatibility_commitment_model() {
        let now = Utc::now();
        let mut a = create_profile("a", Role::Sponsee, "AA");
        a.availability = vec![];
        a.commitment = Some("medium".to_string());
        let mut b = create_profile("b", Role::Sponsor, "AA");
        b.availability = vec![];
        b.commitment = Some("high".to_string());
        let settings = ScoringSettings {
            availability_model: AvailabilityModel::Commitment,
            ..ScoringSettings::default()
        };

        let (_, breakdown) = calculate_compatibility(&a, &b, now, &settings);
        assert_eq!(breakdown.availability, 100);
    }
}
