//! Per-position training record and the scheduling weight derived from it.

use serde::{Deserialize, Serialize};

use crate::profile::TrainingProfile;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Starting rating of every trained position.
pub const DEFAULT_POSITION_ELO: f64 = 1000.0;

/// Attempt history of one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTraining {
    /// Shared with the exercise it trains.
    pub id: String,
    /// Node the drilled line starts from.
    pub node_root: u32,
    /// Last node of the drilled line.
    pub node_leaf: u32,
    /// Ply depth of `node_root`, see [`chess::fen::ply_depth`].
    pub root_depth: u32,
    pub successes: u32,
    pub failures: u32,
    pub tries: u32,
    /// Unix seconds of the last attempt.
    pub last_try: Option<u64>,
    /// Unix seconds.
    pub created_at: u64,
    pub elo: f64,
}

impl PositionTraining {
    pub fn new(id: String, node_root: u32, node_leaf: u32, root_depth: u32, created_at: u64) -> Self {
        Self {
            id,
            node_root,
            node_leaf,
            root_depth,
            successes: 0,
            failures: 0,
            tries: 0,
            last_try: None,
            created_at,
            elo: DEFAULT_POSITION_ELO,
        }
    }

    /// 1 for an untried position, then drifts towards 0.5 as the record
    /// evens out. Above 0.5 when failures outnumber successes.
    pub fn failure_ratio(&self) -> f64 {
        if self.tries == 0 {
            return 1.0;
        }
        let balance = f64::from(self.failures) - f64::from(self.successes);
        0.5 * (1.0 + balance / (f64::from(self.tries) + 1.0))
    }

    /// Share of the record's lifetime spent since the last attempt.
    ///
    /// Clamped to `[0, 1]`; a record created this very second counts as
    /// fully inactive.
    pub fn inactivity_ratio(&self, now: u64) -> f64 {
        let lifetime = days_between(self.created_at, now);
        if lifetime <= 0.0 {
            return 1.0;
        }
        let idle = days_between(self.last_try.unwrap_or(self.created_at), now);
        (idle / lifetime).clamp(0.0, 1.0)
    }

    /// Larger for lines that start early in the game.
    pub fn ease_ratio(&self) -> f64 {
        let moves_in = (self.root_depth / 2).saturating_sub(1).min(10);
        f64::from(10 - moves_in) / 10.0
    }

    /// Coefficient-weighted average of the three ratios.
    pub fn training_weight(&self, profile: &TrainingProfile, now: u64) -> f64 {
        let coefs = profile.failure_coef + profile.inactivity_coef + profile.ease_coef;
        if coefs <= 0.0 {
            return 0.0;
        }
        (profile.failure_coef * self.failure_ratio()
            + profile.inactivity_coef * self.inactivity_ratio(now)
            + profile.ease_coef * self.ease_ratio())
            / coefs
    }
}

/// Fractional days from `from` to `to`, 0 if `to` is earlier.
fn days_between(from: u64, to: u64) -> f64 {
    to.saturating_sub(from) as f64 / SECONDS_PER_DAY
}
