use serde::{Deserialize, Serialize};

/// File stem the profile is stored under. There is only ever one profile.
pub const PROFILE_ID: &str = "profile";

/// The player's rating and the scheduler's tuning knobs.
///
/// Loaded once per process, updated in place and written back after every
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingProfile {
    pub elo: f64,
    pub failure_coef: f64,
    pub inactivity_coef: f64,
    pub ease_coef: f64,
    /// Rating difference at which the stronger side is expected to score
    /// about 91%.
    pub elo_spreading: f64,
    /// Largest possible rating change after one attempt.
    pub elo_volatility: f64,
}

impl Default for TrainingProfile {
    fn default() -> Self {
        Self {
            elo: 1000.0,
            failure_coef: 1.0,
            inactivity_coef: 1.0,
            ease_coef: 1.0,
            elo_spreading: 400.0,
            elo_volatility: 32.0,
        }
    }
}

/// Partial update of the tuning knobs. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub failure_coef: Option<f64>,
    pub inactivity_coef: Option<f64>,
    pub ease_coef: Option<f64>,
    pub elo_spreading: Option<f64>,
    pub elo_volatility: Option<f64>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.failure_coef.is_none()
            && self.inactivity_coef.is_none()
            && self.ease_coef.is_none()
            && self.elo_spreading.is_none()
            && self.elo_volatility.is_none()
    }

    pub fn apply(&self, profile: &mut TrainingProfile) {
        let fields = [
            (self.failure_coef, &mut profile.failure_coef),
            (self.inactivity_coef, &mut profile.inactivity_coef),
            (self.ease_coef, &mut profile.ease_coef),
            (self.elo_spreading, &mut profile.elo_spreading),
            (self.elo_volatility, &mut profile.elo_volatility),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}
