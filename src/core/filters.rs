use crate::models::{Exclusions, Profile};
use chrono::{DateTime, Duration, Utc};

/// Check hard eligibility for one candidate against a requester.
///
/// Drops the requester themselves, soft-deleted profiles, and candidates
/// whose role does not complement the requester's.
#[inline]
pub fn is_eligible(requester: &Profile, candidate: &Profile) -> bool {
    if candidate.id == requester.id {
        return false;
    }

    if candidate.is_deleted {
        return false;
    }

    candidate.role.complements(requester.role)
}

/// Check whether a candidate is excluded, either permanently (existing
/// active/pending relationship) or temporarily (declined within the
/// cooldown window).
///
/// The cooldown boundary is exclusive: a decline exactly `cooldown_days`
/// old is eligible again.
#[inline]
pub fn is_excluded(
    candidate_id: &str,
    exclusions: &Exclusions,
    now: DateTime<Utc>,
    cooldown_days: i64,
) -> bool {
    if exclusions.connected.contains(candidate_id) {
        return true;
    }

    let cooldown = Duration::days(cooldown_days);
    exclusions
        .declines
        .iter()
        .any(|d| d.candidate_id == candidate_id && now - d.declined_at < cooldown)
}

/// Narrow a raw candidate pool to the eligible, non-excluded candidates,
/// preserving pool order.
pub fn filter_candidates(
    requester: &Profile,
    candidates: Vec<Profile>,
    exclusions: &Exclusions,
    now: DateTime<Utc>,
    cooldown_days: i64,
) -> Vec<Profile> {
    candidates
        .into_iter()
        .filter(|c| is_eligible(requester, c))
        .filter(|c| !is_excluded(&c.id, exclusions, now, cooldown_days))
        .collect()
}
