//! Position evaluation values and their text encoding.
//!
//! Encoding: `"+0.35"`, `"-1.20"`, `"0.00"` for scores in pawns from White's
//! point of view, `"M3"` / `"-M2"` for forced mates for White / Black, and
//! `"M0"` / `"-M0"` for positions where the mate has already been delivered.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Ordering value that every mate for White collapses to.
pub const MATE_VALUE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Advantage in pawns, positive when White is better.
    Numeric(f64),
    /// White mates in this many moves (0 = already mated).
    MateForWhite(u32),
    /// Black mates in this many moves (0 = already mated).
    MateForBlack(u32),
    Stalemate,
}

impl Evaluation {
    /// Build from a White-relative centipawn score.
    pub fn from_centipawns(cp: i32) -> Self {
        Self::Numeric(f64::from(cp) / 100.0)
    }

    /// Scalar used for ordering. Mate distances are discarded: any mate for
    /// White is worth [`MATE_VALUE`] and any mate for Black its negation.
    pub fn order_value(&self) -> f64 {
        match *self {
            Self::Numeric(pawns) => pawns,
            Self::MateForWhite(_) => MATE_VALUE,
            Self::MateForBlack(_) => -MATE_VALUE,
            Self::Stalemate => 0.0,
        }
    }

    /// Total order, worst for White first.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.order_value().total_cmp(&other.order_value())
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Numeric(pawns) if pawns > 0.0 => write!(f, "+{:.2}", pawns),
            Self::Numeric(pawns) if pawns < 0.0 => write!(f, "{:.2}", pawns),
            Self::Numeric(_) | Self::Stalemate => f.write_str("0.00"),
            Self::MateForWhite(n) => write!(f, "M{}", n),
            Self::MateForBlack(n) => write!(f, "-M{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid evaluation: {0:?}")]
pub struct InvalidEvaluation(pub String);

impl FromStr for Evaluation {
    type Err = InvalidEvaluation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || InvalidEvaluation(s.to_string());

        if let Some(pos) = text.find('M') {
            let (sign, rest) = text.split_at(pos);
            let moves: u32 = rest[1..].parse().map_err(|_| invalid())?;
            return match sign {
                "" | "+" => Ok(Self::MateForWhite(moves)),
                "-" => Ok(Self::MateForBlack(moves)),
                _ => Err(invalid()),
            };
        }

        match text.parse::<f64>() {
            Ok(pawns) if pawns.is_finite() => Ok(Self::Numeric(pawns)),
            _ => Err(invalid()),
        }
    }
}

/// Ordering value of an encoded evaluation, see [`Evaluation::order_value`].
pub fn evaluation_to_float(evaluation: &str) -> Result<f64, InvalidEvaluation> {
    Ok(evaluation.parse::<Evaluation>()?.order_value())
}

/// Ordering for optional evaluations. Missing evaluations count as level.
pub fn cmp_optional(a: Option<&Evaluation>, b: Option<&Evaluation>) -> Ordering {
    let value = |e: Option<&Evaluation>| e.map_or(0.0, Evaluation::order_value);
    value(a).total_cmp(&value(b))
}
