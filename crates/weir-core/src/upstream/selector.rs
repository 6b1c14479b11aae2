//! Pure scoring heuristic for picking the next endpoint to try.
//!
//! Scores are computed over immutable [`EndpointSnapshot`]s so the heuristic
//! can be unit-tested in isolation from timing and I/O. Token availability
//! dominates: an endpoint holding a whole token always outranks one that is
//! starved, regardless of history. Among ready endpoints, utilization and
//! historical failure rate push the score down and idle time pushes it up
//! (capped) to spread load across otherwise-equal endpoints.
//!
//! Ties keep the current pointer, which makes round-robin rotation the
//! deterministic fallback whenever scores do not separate the candidates.

use serde::{Deserialize, Serialize};

use crate::upstream::endpoint::EndpointSnapshot;

/// Weights for each scoring term.
///
/// Defaults keep the token term strictly dominant: the worst-scoring ready
/// endpoint (full failure rate, full utilization, no idle bonus) still beats
/// the best-scoring starved one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Flat bonus for holding at least one whole token (default: 100.0).
    #[serde(default = "default_ready_bonus")]
    pub ready_bonus: f64,

    /// Per-token bonus on top of the flat bonus (default: 5.0).
    #[serde(default = "default_token_weight")]
    pub token_weight: f64,

    /// Flat penalty for sitting below one token (default: 100.0).
    #[serde(default = "default_starved_penalty")]
    pub starved_penalty: f64,

    /// Penalty per percentage point of bucket utilization (default: 0.25).
    #[serde(default = "default_utilization_weight")]
    pub utilization_weight: f64,

    /// Penalty scaled by historical failure rate (default: 50.0).
    #[serde(default = "default_failure_weight")]
    pub failure_weight: f64,

    /// Bonus per idle second since last use (default: 1.0).
    #[serde(default = "default_idle_weight")]
    pub idle_weight: f64,

    /// Cap on the idle bonus (default: 10.0).
    #[serde(default = "default_idle_bonus_cap")]
    pub idle_bonus_cap: f64,
}

fn default_ready_bonus() -> f64 {
    100.0
}
fn default_token_weight() -> f64 {
    5.0
}
fn default_starved_penalty() -> f64 {
    100.0
}
fn default_utilization_weight() -> f64 {
    0.25
}
fn default_failure_weight() -> f64 {
    50.0
}
fn default_idle_weight() -> f64 {
    1.0
}
fn default_idle_bonus_cap() -> f64 {
    10.0
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ready_bonus: 100.0,
            token_weight: 5.0,
            starved_penalty: 100.0,
            utilization_weight: 0.25,
            failure_weight: 50.0,
            idle_weight: 1.0,
            idle_bonus_cap: 10.0,
        }
    }
}

/// Scores one endpoint snapshot. Pure; higher is better.
#[must_use]
pub fn score(snapshot: &EndpointSnapshot, weights: &ScoreWeights) -> f64 {
    let token_term = if snapshot.tokens >= 1.0 {
        weights.ready_bonus + snapshot.tokens * weights.token_weight
    } else {
        -weights.starved_penalty
    };

    let utilization_term = snapshot.utilization_pct * weights.utilization_weight;
    let failure_term = snapshot.failure_rate() * weights.failure_weight;
    let idle_term = (snapshot.idle.as_secs_f64() * weights.idle_weight).min(weights.idle_bonus_cap);

    token_term - utilization_term - failure_term + idle_term
}

/// Picks the best index from a set of snapshots.
///
/// The scan is seeded at `current` and only a strictly greater score moves
/// the choice, so ties keep the current pointer. `current` is clamped into
/// range defensively; the set guarantees it by construction.
#[must_use]
pub fn select_best(snapshots: &[EndpointSnapshot], current: usize, weights: &ScoreWeights) -> usize {
    if snapshots.len() <= 1 {
        return 0;
    }

    let current = current % snapshots.len();
    let mut best_index = current;
    let mut best_score = score(&snapshots[current], weights);

    for (index, snapshot) in snapshots.iter().enumerate() {
        if index == current {
            continue;
        }
        let candidate = score(snapshot, weights);
        if candidate > best_score {
            best_index = index;
            best_score = candidate;
        }
    }

    best_index
}
