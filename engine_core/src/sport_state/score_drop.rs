//! Score-drop / overturn-confirmation sub-protocol, shared by all three sports.
//!
//! The vendor occasionally emits momentarily-bogus score corrections; a
//! confirmation window (default 15s) collapses spurious overturns while
//! letting genuine referee reversals through after the quarantine.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Accept,
    NewDrop,
    Pending,
    Rejected,
    Confirmed,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    home: i32,
    away: i32,
    first_seen: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreDropTracker {
    pending: bool,
    candidate: Option<Candidate>,
    pub rejected_home: i32,
    pub rejected_away: i32,
}

impl ScoreDropTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn clear(&mut self) {
        self.pending = false;
        self.candidate = None;
    }

    /// Advance the tracker with a new observed score, returning the protocol
    /// outcome. `now` is injected so tests can control elapsed time.
    pub fn check_drop(
        &mut self,
        cur_home: i32,
        cur_away: i32,
        new_home: i32,
        new_away: i32,
        confirm_sec: u64,
        now: Instant,
    ) -> DropOutcome {
        let prev_total = cur_home + cur_away;
        let new_total = new_home + new_away;
        let individual_drop = new_home < cur_home || new_away < cur_away;

        if new_total >= prev_total && !individual_drop {
            if self.pending {
                if let Some(c) = self.candidate {
                    self.rejected_home = c.home;
                    self.rejected_away = c.away;
                }
                self.clear();
                return DropOutcome::Rejected;
            }
            return DropOutcome::Accept;
        }

        match self.candidate {
            None => {
                self.candidate = Some(Candidate {
                    home: new_home,
                    away: new_away,
                    first_seen: now,
                });
                self.pending = true;
                DropOutcome::NewDrop
            }
            Some(c) if c.home == new_home && c.away == new_away => {
                if now.duration_since(c.first_seen) >= Duration::from_secs(confirm_sec) {
                    self.clear();
                    DropOutcome::Confirmed
                } else {
                    DropOutcome::Pending
                }
            }
            Some(_) => {
                self.candidate = Some(Candidate {
                    home: new_home,
                    away: new_away,
                    first_seen: now,
                });
                self.pending = true;
                DropOutcome::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_score_drop_confirmation() {
        let mut t = ScoreDropTracker::new();
        let t0 = Instant::now();
        assert_eq!(t.check_drop(2, 1, 2, 0, 15, t0), DropOutcome::NewDrop);
        assert_eq!(
            t.check_drop(2, 0, 2, 0, 15, t0 + Duration::from_secs(14)),
            DropOutcome::Pending
        );
        assert_eq!(
            t.check_drop(2, 0, 2, 0, 15, t0 + Duration::from_secs(15)),
            DropOutcome::Confirmed
        );
        assert!(!t.is_pending());
    }

    #[test]
    fn scenario_score_drop_rejection() {
        let mut t = ScoreDropTracker::new();
        let t0 = Instant::now();
        assert_eq!(t.check_drop(2, 1, 2, 0, 15, t0), DropOutcome::NewDrop);
        assert_eq!(t.check_drop(2, 0, 2, 1, 15, t0), DropOutcome::Rejected);
        assert_eq!(t.rejected_home, 2);
        assert_eq!(t.rejected_away, 0);
    }

    #[test]
    fn individual_side_drop_with_same_total_is_a_drop() {
        let mut t = ScoreDropTracker::new();
        let t0 = Instant::now();
        // 4-1 -> 3-2: same total, attribution changed
        assert_eq!(t.check_drop(4, 1, 3, 2, 15, t0), DropOutcome::NewDrop);
    }

    #[test]
    fn plain_accept_with_no_pending_state() {
        let mut t = ScoreDropTracker::new();
        assert_eq!(t.check_drop(1, 0, 2, 0, 15, Instant::now()), DropOutcome::Accept);
    }

    #[test]
    fn idempotent_confirmation_never_fires_twice() {
        let mut t = ScoreDropTracker::new();
        let t0 = Instant::now();
        t.check_drop(2, 1, 2, 0, 15, t0);
        let first = t.check_drop(2, 0, 2, 0, 15, t0 + Duration::from_secs(20));
        assert_eq!(first, DropOutcome::Confirmed);
        // same candidate fed again after clearing: starts a fresh drop, never re-confirms immediately
        let second = t.check_drop(2, 0, 2, 0, 15, t0 + Duration::from_secs(21));
        assert_ne!(second, DropOutcome::Confirmed);
    }
}
