use rand::Rng;

use crate::TrainingError;

/// Pick one value with probability proportional to its weight.
///
/// Draws `u` in `[0, 1)` and returns the first candidate, in iteration
/// order, whose cumulative normalized weight reaches `u`. Candidates with a
/// non-positive weight are never picked, unless no weight is positive, in
/// which case the first candidate is returned.
pub fn weighted_choice<T, R>(
    candidates: impl IntoIterator<Item = (f64, T)>,
    rng: &mut R,
) -> Result<T, TrainingError>
where
    R: Rng,
{
    let candidates: Vec<(f64, T)> = candidates.into_iter().collect();
    if candidates.is_empty() {
        return Err(TrainingError::NoExercisesAvailable);
    }

    let total: f64 = candidates
        .iter()
        .map(|(w, _)| *w)
        .filter(|w| *w > 0.0)
        .sum();
    if total <= 0.0 || !total.is_finite() {
        return first(candidates);
    }

    let draw: f64 = rng.random();
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (index, (weight, _)) in candidates.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        cumulative += weight / total;
        last_positive = Some(index);
        if cumulative >= draw {
            return take(candidates, index);
        }
    }
    // Rounding can leave the last sum just below the draw.
    match last_positive {
        Some(index) => take(candidates, index),
        None => first(candidates),
    }
}

fn first<T>(candidates: Vec<(f64, T)>) -> Result<T, TrainingError> {
    take(candidates, 0)
}

fn take<T>(candidates: Vec<(f64, T)>, index: usize) -> Result<T, TrainingError> {
    candidates
        .into_iter()
        .nth(index)
        .map(|(_, value)| value)
        .ok_or(TrainingError::NoExercisesAvailable)
}
