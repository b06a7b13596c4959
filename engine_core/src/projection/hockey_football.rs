//! Hockey's closed-form logistic projection. Football reuses the identical
//! formula with a 60-minute clock and its own lead-sign convention; it is
//! not a separate formula (spec §4.6).

const K: f64 = 0.55;
const A: f64 = 0.5;
const THETA: f64 = 4.4;
const ETA: f64 = 1.0;
const LAMBDA: f64 = 1.5;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `(strength in (0,1), time_left_min, lead)` -> home win probability in [0,1].
pub fn projected_odds(strength: f64, time_left_min: f64, lead: f64) -> f64 {
    if time_left_min <= 0.0 {
        return if lead > 0.0 {
            1.0
        } else if lead < 0.0 {
            0.0
        } else {
            0.5
        };
    }

    let strength = strength.clamp(1e-6, 1.0 - 1e-6);
    let logit = (strength / (1.0 - strength)).ln();
    let time_factor = (time_left_min / 60.0).powf(ETA * (-LAMBDA * lead.abs()).exp());
    let lead_term = K * lead * (1.0 + A * (60.0 / (time_left_min + THETA) - 1.0));

    sigmoid(logit * time_factor + lead_term)
}

/// Overtime override: a non-zero lead snaps to a certain outcome.
pub fn projected_odds_with_overtime(strength: f64, time_left_min: f64, lead: f64, is_overtime: bool) -> f64 {
    if is_overtime && lead != 0.0 {
        return if lead > 0.0 { 1.0 } else { 0.0 };
    }
    projected_odds(strength, time_left_min, lead)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_time_snaps_to_certain_outcome() {
        assert_eq!(projected_odds(0.5, 0.0, 1.0), 1.0);
        assert_eq!(projected_odds(0.5, 0.0, -1.0), 0.0);
        assert_eq!(projected_odds(0.5, 0.0, 0.0), 0.5);
    }

    #[test]
    fn full_time_remaining_approximates_pregame_strength() {
        for s in [0.05, 0.2, 0.5, 0.7, 0.95] {
            let p = projected_odds(s, 60.0, 0.0);
            assert!((p - s).abs() < 1e-2, "strength={s} got={p}");
        }
    }

    #[test]
    fn overtime_snap_with_nonzero_lead() {
        let p = projected_odds_with_overtime(0.50, 4.5, 1.0, true);
        assert_eq!(p, 1.0);
        let p2 = projected_odds_with_overtime(0.50, 4.5, -1.0, true);
        assert_eq!(p2, 0.0);
    }

    #[test]
    fn leading_team_probability_increases_as_clock_runs_down() {
        let early = projected_odds(0.5, 55.0, 1.0);
        let late = projected_odds(0.5, 2.0, 1.0);
        assert!(late > early);
    }
}
