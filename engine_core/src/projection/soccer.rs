//! Soccer's two-team Poisson model with dynamic intensity and a
//! Dixon-Coles tau correction for low-scoring remaining-goal lines.

const MAX_GOALS: i64 = 12;
const DC_RHO: f64 = -0.04;
const RAMP_NORM: f64 = 96.75;
const STOPPAGE_BUFFER_MIN: f64 = 3.0;

fn factorial(n: i64) -> f64 {
    (1..=n).fold(1.0f64, |acc, x| acc * x as f64)
}

fn poisson_pmf(k: i64, lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    (-lambda).exp() * lambda.powi(k as i32) / factorial(k)
}

fn poisson_cdf(k: i64, lambda: f64) -> f64 {
    if k < 0 {
        return 0.0;
    }
    (0..=k).map(|i| poisson_pmf(i, lambda)).sum()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Probabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Full-match Poisson-product 1X2 for a given lambda pair, enumerated up to
/// `MAX_GOALS` per side (no Dixon-Coles correction; used by `infer_lambdas`).
fn full_match_1x2(lambda_home: f64, lambda_away: f64) -> Probabilities {
    let mut p = Probabilities::default();
    for i in 0..=MAX_GOALS {
        for j in 0..=MAX_GOALS {
            let mass = poisson_pmf(i, lambda_home) * poisson_pmf(j, lambda_away);
            if i > j {
                p.home += mass;
            } else if i == j {
                p.draw += mass;
            } else {
                p.away += mass;
            }
        }
    }
    p
}

/// Grid-search `lambda_home` in `(0, g0)` (`lambda_away = g0 - lambda_home`)
/// over 400 steps, choosing the pair minimizing squared error against the
/// target vig-free 1X2.
pub fn infer_lambdas(target: Probabilities, g0: f64) -> (f64, f64) {
    const STEPS: u32 = 400;
    let mut best = (g0 / 2.0, g0 / 2.0);
    let mut best_err = f64::MAX;

    for step in 1..STEPS {
        let lambda_home = g0 * (step as f64) / (STEPS as f64);
        let lambda_away = g0 - lambda_home;
        if lambda_home <= 0.0 || lambda_away <= 0.0 {
            continue;
        }
        let p = full_match_1x2(lambda_home, lambda_away);
        let err = (p.home - target.home).powi(2)
            + (p.draw - target.draw).powi(2)
            + (p.away - target.away).powi(2);
        if err < best_err {
            best_err = err;
            best = (lambda_home, lambda_away);
        }
    }
    best
}

fn ramp_integral(t: f64) -> f64 {
    // r(t) = 0.85 + 0.45 * t / 90, integrated from 0 to t.
    0.85 * t + 0.0025 * t * t
}

/// Remaining-time scoring rate for one team, folding in the non-uniform
/// intensity ramp, urgency adjustment, half multiplier, and red cards.
fn remaining_rate(
    lambda_full: f64,
    played: f64,
    is_leading: bool,
    is_trailing_by_one: bool,
    is_trailing_by_more: bool,
    half: u8,
    reds_for: i32,
    reds_against: i32,
) -> f64 {
    let base = lambda_full * (ramp_integral(90.0) - ramp_integral(played)) / RAMP_NORM;
    let u = played / 90.0;

    let mut rate = base;
    if is_leading {
        rate *= 1.0 - 0.20 * u;
    } else if is_trailing_by_one {
        rate *= 1.0 + 0.10 * u;
    } else if is_trailing_by_more {
        rate *= 1.0 + 0.20 * u;
    }

    if half >= 2 {
        rate *= 1.07;
    }

    rate *= 0.75f64.powi(reds_for.max(0));
    rate *= 1.125f64.powi(reds_against.max(0));

    rate.max(0.0)
}

fn dc_tau(x: i64, y: i64, lambda: f64, mu: f64, rho: f64) -> f64 {
    match (x, y) {
        (0, 0) => 1.0 - lambda * mu * rho,
        (0, 1) => 1.0 + lambda * rho,
        (1, 0) => 1.0 + mu * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

/// Live evaluation: given pregame-inferred lambdas and the current match
/// clock/scoreboard, return the Dixon-Coles-corrected home/draw/away
/// probabilities for the rest of the match outcome.
#[allow(clippy::too_many_arguments)]
pub fn inplay_probabilities(
    lambda_home: f64,
    lambda_away: f64,
    time_left_min: f64,
    goal_diff: i32,
    half: u8,
    reds_home: i32,
    reds_away: i32,
    is_live: bool,
) -> Probabilities {
    let time_left = if is_live && time_left_min < STOPPAGE_BUFFER_MIN {
        STOPPAGE_BUFFER_MIN
    } else {
        time_left_min
    };
    let played = (90.0 - time_left).clamp(0.0, 90.0);

    let home_leading = goal_diff > 0;
    let home_trailing_one = goal_diff == -1;
    let home_trailing_more = goal_diff < -1;
    let away_leading = goal_diff < 0;
    let away_trailing_one = goal_diff == 1;
    let away_trailing_more = goal_diff > 1;

    let lambda_home_rem = remaining_rate(
        lambda_home,
        played,
        home_leading,
        home_trailing_one,
        home_trailing_more,
        half,
        reds_home,
        reds_away,
    );
    let lambda_away_rem = remaining_rate(
        lambda_away,
        played,
        away_leading,
        away_trailing_one,
        away_trailing_more,
        half,
        reds_away,
        reds_home,
    );

    let mut grid = vec![vec![0.0f64; (MAX_GOALS + 1) as usize]; (MAX_GOALS + 1) as usize];
    let mut total = 0.0;
    for i in 0..=MAX_GOALS {
        for j in 0..=MAX_GOALS {
            let mut mass = poisson_pmf(i, lambda_home_rem) * poisson_pmf(j, lambda_away_rem);
            if i <= 1 && j <= 1 {
                mass *= dc_tau(i, j, lambda_home_rem, lambda_away_rem, DC_RHO);
            }
            mass = mass.max(0.0);
            grid[i as usize][j as usize] = mass;
            total += mass;
        }
    }

    let mut p = Probabilities::default();
    for i in 0..=MAX_GOALS {
        for j in 0..=MAX_GOALS {
            let mass = grid[i as usize][j as usize] / total;
            let final_diff = goal_diff + (i as i32 - j as i32);
            if final_diff > 0 {
                p.home += mass;
            } else if final_diff == 0 {
                p.draw += mass;
            } else {
                p.away += mass;
            }
        }
    }

    // Renormalize defensively against floating-point drift.
    let sum = p.home + p.draw + p.away;
    if sum > 0.0 {
        p.home /= sum;
        p.draw /= sum;
        p.away /= sum;
    }
    p
}

/// `P(final total goals > line)` using the same remaining-rate math and a
/// Poisson CDF on the summed remaining rate.
#[allow(clippy::too_many_arguments)]
pub fn over_under_probability(
    lambda_home: f64,
    lambda_away: f64,
    time_left_min: f64,
    goal_diff: i32,
    half: u8,
    reds_home: i32,
    reds_away: i32,
    is_live: bool,
    current_total: i32,
    line: f64,
) -> f64 {
    let time_left = if is_live && time_left_min < STOPPAGE_BUFFER_MIN {
        STOPPAGE_BUFFER_MIN
    } else {
        time_left_min
    };
    let played = (90.0 - time_left).clamp(0.0, 90.0);

    let home_leading = goal_diff > 0;
    let home_trailing_one = goal_diff == -1;
    let home_trailing_more = goal_diff < -1;
    let away_leading = goal_diff < 0;
    let away_trailing_one = goal_diff == 1;
    let away_trailing_more = goal_diff > 1;

    let lambda_home_rem = remaining_rate(
        lambda_home,
        played,
        home_leading,
        home_trailing_one,
        home_trailing_more,
        half,
        reds_home,
        reds_away,
    );
    let lambda_away_rem = remaining_rate(
        lambda_away,
        played,
        away_leading,
        away_trailing_one,
        away_trailing_more,
        half,
        reds_away,
        reds_home,
    );

    let rate = lambda_home_rem + lambda_away_rem;
    let needed = line - current_total as f64;
    if needed < 0.0 {
        return 1.0;
    }
    let k = needed.floor() as i64;
    1.0 - poisson_cdf(k, rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_lambdas_reproduces_target_1x2() {
        let target = Probabilities {
            home: 0.45,
            draw: 0.28,
            away: 0.27,
        };
        let (lh, la) = infer_lambdas(target, 2.6);
        let p = full_match_1x2(lh, la);
        assert!((p.home - target.home).abs() < 1e-3, "home {p:?}");
        assert!((p.draw - target.draw).abs() < 1e-3, "draw {p:?}");
        assert!((p.away - target.away).abs() < 1e-3, "away {p:?}");
    }

    #[test]
    fn inplay_probabilities_sum_to_one() {
        let p = inplay_probabilities(1.3, 1.1, 40.0, 0, 2, 0, 0, true);
        assert!((p.home + p.draw + p.away - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stoppage_buffer_keeps_outcomes_non_degenerate() {
        let p = inplay_probabilities(1.3, 1.1, 0.5, 0, 2, 0, 0, true);
        assert!(p.home > 0.0 && p.home < 1.0);
        assert!(p.draw > 0.0 && p.draw < 1.0);
        assert!(p.away > 0.0 && p.away < 1.0);
    }

    #[test]
    fn red_card_reduces_carrying_teams_scoring_rate() {
        let baseline = remaining_rate(1.3, 45.0, false, false, false, 2, 0, 0);
        let with_red = remaining_rate(1.3, 45.0, false, false, false, 2, 1, 0);
        assert!(with_red < baseline);
    }

    #[test]
    fn over_under_probability_decreases_as_line_rises() {
        let p_low = over_under_probability(1.3, 1.1, 45.0, 0, 2, 0, 0, true, 1, 1.5);
        let p_high = over_under_probability(1.3, 1.1, 45.0, 0, 2, 0, 0, true, 1, 4.5);
        assert!(p_low > p_high);
    }
}
