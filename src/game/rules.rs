// Rock-Paper-Scissors-Lizard-Spock rules: moves, dominance table, outcomes.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One of the five RPSLS moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
    Lizard,
    Spock,
}

impl Move {
    pub const ALL: [Move; 5] = [
        Move::Rock,
        Move::Paper,
        Move::Scissors,
        Move::Lizard,
        Move::Spock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
            Move::Lizard => "lizard",
            Move::Spock => "spock",
        }
    }

    /// The two moves this move defeats.
    pub fn beats(self) -> [Move; 2] {
        match self {
            Move::Scissors => [Move::Paper, Move::Lizard],
            Move::Paper => [Move::Rock, Move::Spock],
            Move::Rock => [Move::Lizard, Move::Scissors],
            Move::Lizard => [Move::Spock, Move::Paper],
            Move::Spock => [Move::Scissors, Move::Rock],
        }
    }

    /// Pick a move uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Move {
        Move::ALL[rng.gen_range(0..Move::ALL.len())]
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the five move names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid move '{0}': expected one of rock, paper, scissors, lizard, spock")]
pub struct InvalidMove(pub String);

impl FromStr for Move {
    type Err = InvalidMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rock" => Ok(Move::Rock),
            "paper" => Ok(Move::Paper),
            "scissors" => Ok(Move::Scissors),
            "lizard" => Ok(Move::Lizard),
            "spock" => Ok(Move::Spock),
            other => Err(InvalidMove(other.to_string())),
        }
    }
}

/// Round outcome from the player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RoundOutcome {
    #[serde(rename = "You win.")]
    PlayerWin,
    #[serde(rename = "You lose.")]
    PlayerLoss,
    #[serde(rename = "Tie.")]
    Tie,
}

impl RoundOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundOutcome::PlayerWin => "You win.",
            RoundOutcome::PlayerLoss => "You lose.",
            RoundOutcome::Tie => "Tie.",
        }
    }

    /// Short label used for metrics.
    pub fn label(self) -> &'static str {
        match self {
            RoundOutcome::PlayerWin => "win",
            RoundOutcome::PlayerLoss => "loss",
            RoundOutcome::Tie => "tie",
        }
    }
}

/// Decide a round. Equal moves tie; otherwise the player wins iff their move
/// beats the computer's.
pub fn determine_outcome(player: Move, computer: Move) -> RoundOutcome {
    if player == computer {
        RoundOutcome::Tie
    } else if player.beats().contains(&computer) {
        RoundOutcome::PlayerWin
    } else {
        RoundOutcome::PlayerLoss
    }
}
