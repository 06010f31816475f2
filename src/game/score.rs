// In-memory running score shared by all requests.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::rules::RoundOutcome;

/// Snapshot of the running score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Score {
    pub wins: u64,
    pub losses: u64,
    pub ties: u64,
}

impl Score {
    pub fn total(&self) -> u64 {
        self.wins + self.losses + self.ties
    }
}

/// Thread-safe score store. Starts at zero and lives for the process.
#[derive(Debug, Clone, Default)]
pub struct ScoreStore {
    inner: Arc<Mutex<Score>>,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score.
    pub fn snapshot(&self) -> Score {
        *self.inner.lock().unwrap()
    }

    /// Increment the counter for `outcome` and return the updated score.
    /// The read-modify-write happens under one lock acquisition.
    pub fn apply(&self, outcome: RoundOutcome) -> Score {
        let mut score = self.inner.lock().unwrap();
        match outcome {
            RoundOutcome::PlayerWin => score.wins += 1,
            RoundOutcome::PlayerLoss => score.losses += 1,
            RoundOutcome::Tie => score.ties += 1,
        }
        tracing::debug!(
            "Score updated: wins={} losses={} ties={}",
            score.wins,
            score.losses,
            score.ties
        );
        *score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_starts_at_zero() {
        let store = ScoreStore::new();
        assert_eq!(store.snapshot(), Score::default());
    }

    #[test]
    fn test_apply_increments_one_counter() {
        let store = ScoreStore::new();

        let after = store.apply(RoundOutcome::PlayerWin);
        assert_eq!(after, Score { wins: 1, losses: 0, ties: 0 });

        let after = store.apply(RoundOutcome::Tie);
        assert_eq!(after, Score { wins: 1, losses: 0, ties: 1 });

        let after = store.apply(RoundOutcome::PlayerLoss);
        assert_eq!(after, Score { wins: 1, losses: 1, ties: 1 });
        assert_eq!(store.snapshot(), after);
    }

    #[test]
    fn test_clones_share_state() {
        let store = ScoreStore::new();
        let other = store.clone();
        other.apply(RoundOutcome::PlayerLoss);
        assert_eq!(store.snapshot().losses, 1);
    }

    #[test]
    fn test_concurrent_applies_lose_nothing() {
        let store = ScoreStore::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let outcome = match i % 3 {
                        0 => RoundOutcome::PlayerWin,
                        1 => RoundOutcome::PlayerLoss,
                        _ => RoundOutcome::Tie,
                    };
                    for _ in 0..1000 {
                        store.apply(outcome);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let score = store.snapshot();
        assert_eq!(score.total(), 8000);
        assert_eq!(score.wins, 3000);
        assert_eq!(score.losses, 3000);
        assert_eq!(score.ties, 2000);
    }
}
