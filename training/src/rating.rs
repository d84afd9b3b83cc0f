//! Paired Elo update between the player and a trained position.

/// Expected score of a side that is `gap` points above its opponent.
pub fn expected(gap: f64, spreading: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-gap / spreading))
}

/// New `(player, position)` ratings after one attempt.
///
/// The gap is taken once from the ratings passed in, so both sides move by
/// the same amount in opposite directions.
pub fn rate(
    player_elo: f64,
    position_elo: f64,
    success: bool,
    spreading: f64,
    volatility: f64,
) -> (f64, f64) {
    let gap = player_elo - position_elo;
    let won = if success { 1.0 } else { 0.0 };
    let player = player_elo + volatility * (won - expected(gap, spreading));
    let position = position_elo + volatility * ((1.0 - won) - expected(-gap, spreading));
    (player, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_even_win_gains_half_volatility() {
        let (player, position) = rate(1000.0, 1000.0, true, 400.0, 32.0);
        assert!((player - 1016.0).abs() < EPS);
        assert!((position - 984.0).abs() < EPS);
    }

    #[test]
    fn test_expected_win_gains_almost_nothing() {
        let (player, _) = rate(3000.0, 500.0, true, 400.0, 32.0);
        assert!(player - 3000.0 < 0.01);
        assert!(player > 3000.0);
    }

    #[test]
    fn test_upset_loss_costs_almost_everything() {
        let (player, position) = rate(3000.0, 500.0, false, 400.0, 32.0);
        assert!(3000.0 - player > 31.9);
        assert!(position - 500.0 > 31.9);
    }

    #[test]
    fn test_update_is_zero_sum() {
        for (a, b, success) in [(1200.0, 900.0, true), (800.0, 1500.0, false), (1000.0, 1000.0, false)] {
            let (player, position) = rate(a, b, success, 400.0, 32.0);
            assert!(((player - a) + (position - b)).abs() < EPS);
        }
    }

    #[test]
    fn test_expected_is_symmetric() {
        assert!((expected(0.0, 400.0) - 0.5).abs() < EPS);
        assert!((expected(400.0, 400.0) - 10.0 / 11.0).abs() < EPS);
        assert!((expected(150.0, 400.0) + expected(-150.0, 400.0) - 1.0).abs() < EPS);
    }
}
