// RPSLS game engine: plays a round against a random computer move.

pub mod rules;
pub mod score;

pub use rules::{determine_outcome, InvalidMove, Move, RoundOutcome};
pub use score::{Score, ScoreStore};

use serde::Serialize;

use crate::metrics;
use crate::services::Commentator;

pub const LOSS_FALLBACK: &str = "Victorious, I am... comment, the Force blocks. Hmm.";

/// Everything the client learns about a finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayResult {
    #[serde(flatten)]
    pub score: Score,
    pub player_move: Move,
    pub computer_move: Move,
    pub result: RoundOutcome,
    pub commentary: Option<String>,
}

pub fn win_text(player_move: Move) -> String {
    format!("Strong with {player_move}, you are. Defeated me, you have. Impressive.")
}

pub fn tie_text(player_move: Move) -> String {
    format!("Both chose {player_move}. A tie, it is. Balanced, the Force remains.")
}

#[derive(Clone)]
pub struct Game {
    score: ScoreStore,
    commentator: Commentator,
}

impl Game {
    pub fn new(score: ScoreStore, commentator: Commentator) -> Self {
        Self { score, commentator }
    }

    pub fn score(&self) -> Score {
        self.score.snapshot()
    }

    /// Play one round against a uniformly random computer move.
    pub async fn play_round(&self, player: Move) -> PlayResult {
        let computer = Move::random(&mut rand::thread_rng());
        self.play_round_against(player, computer).await
    }

    /// Play one round against a known computer move.
    pub async fn play_round_against(&self, player: Move, computer: Move) -> PlayResult {
        let outcome = determine_outcome(player, computer);
        let score = self.score.apply(outcome);
        metrics::ROUNDS_PLAYED_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();
        tracing::info!("Round played: {player} vs {computer} -> {}", outcome.as_str());

        let commentary = match outcome {
            RoundOutcome::PlayerLoss => {
                // Yoda comments on the score as it stood before this round.
                let before = Score {
                    losses: score.losses - 1,
                    ..score
                };
                self.commentator
                    .win_commentary(player, computer, before)
                    .await
                    .or_fallback(LOSS_FALLBACK)
            }
            RoundOutcome::PlayerWin => win_text(player),
            RoundOutcome::Tie => tie_text(player),
        };

        PlayResult {
            score,
            player_move: player,
            computer_move: computer,
            result: outcome,
            commentary: Some(commentary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::commentary::testing::StubGenerator;
    use crate::services::gemini::{Generation, GenerationError};
    use std::sync::Arc;

    fn game_with(generator: Arc<StubGenerator>) -> Game {
        Game::new(ScoreStore::new(), Commentator::new(generator))
    }

    #[tokio::test]
    async fn test_win_uses_template_without_generator() {
        let generator = StubGenerator::new(|| Ok(Generation::Text("unused".into())));
        let game = game_with(generator.clone());

        let result = game.play_round_against(Move::Rock, Move::Scissors).await;
        assert_eq!(result.result, RoundOutcome::PlayerWin);
        assert_eq!(
            result.commentary.as_deref(),
            Some("Strong with rock, you are. Defeated me, you have. Impressive.")
        );
        assert_eq!(result.score, Score { wins: 1, losses: 0, ties: 0 });
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_tie_uses_template() {
        let generator = StubGenerator::new(|| Ok(Generation::Text("unused".into())));
        let game = game_with(generator.clone());

        let result = game.play_round_against(Move::Spock, Move::Spock).await;
        assert_eq!(result.result, RoundOutcome::Tie);
        assert_eq!(
            result.commentary.as_deref(),
            Some("Both chose spock. A tie, it is. Balanced, the Force remains.")
        );
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_loss_asks_for_commentary_with_prior_score() {
        let generator = StubGenerator::new(|| Ok(Generation::Text(" Lost, you have. ".into())));
        let game = game_with(generator.clone());

        let result = game.play_round_against(Move::Paper, Move::Scissors).await;
        assert_eq!(result.result, RoundOutcome::PlayerLoss);
        assert_eq!(result.commentary.as_deref(), Some("Lost, you have."));
        assert_eq!(result.score.losses, 1);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Player Wins=0, Your Wins (Losses)=0, Ties=0"));
    }

    #[tokio::test]
    async fn test_loss_falls_back_when_generator_fails() {
        let generator = StubGenerator::new(|| {
            Err(GenerationError::Status {
                status: 503,
                body: String::new(),
            })
        });
        let game = game_with(generator);

        let result = game.play_round_against(Move::Rock, Move::Paper).await;
        assert_eq!(result.commentary.as_deref(), Some(LOSS_FALLBACK));
    }

    #[tokio::test]
    async fn test_score_counts_match_outcomes() {
        let generator = StubGenerator::new(|| Ok(Generation::Empty));
        let game = game_with(generator);

        let mut expected = Score::default();
        for _ in 0..50 {
            let result = game.play_round(Move::Lizard).await;
            match result.result {
                RoundOutcome::PlayerWin => expected.wins += 1,
                RoundOutcome::PlayerLoss => expected.losses += 1,
                RoundOutcome::Tie => expected.ties += 1,
            }
            assert_eq!(result.score, expected);
        }
        assert_eq!(game.score().total(), 50);
        assert_eq!(game.score(), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rounds_lose_no_updates() {
        for rounds in [10usize, 100] {
            let generator = StubGenerator::new(|| Ok(Generation::Empty));
            let game = game_with(generator);

            let tasks: Vec<_> = (0..rounds)
                .map(|i| {
                    let game = game.clone();
                    tokio::spawn(async move { game.play_round(Move::ALL[i % 5]).await })
                })
                .collect();
            let results = futures::future::join_all(tasks).await;

            let losses = results
                .iter()
                .filter(|r| r.as_ref().unwrap().result == RoundOutcome::PlayerLoss)
                .count() as u64;
            let score = game.score();
            assert_eq!(score.total(), rounds as u64);
            assert_eq!(score.losses, losses);
        }
    }

    #[test]
    fn test_play_result_json_shape() {
        let result = PlayResult {
            score: Score { wins: 1, losses: 2, ties: 3 },
            player_move: Move::Rock,
            computer_move: Move::Paper,
            result: RoundOutcome::PlayerLoss,
            commentary: Some("Hmm.".into()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "wins": 1,
                "losses": 2,
                "ties": 3,
                "player_move": "rock",
                "computer_move": "paper",
                "result": "You lose.",
                "commentary": "Hmm."
            })
        );
    }
}
