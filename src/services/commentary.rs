// Yoda persona prompts on top of a text generator.

use std::sync::Arc;

use super::gemini::{Generation, TextGenerator};
use crate::game::{Move, Score};

pub const COMMENTARY_BLOCKED: &str = "Blocked by the Force, my words are. Hmm.";
pub const CHAT_BLOCKED: &str = "Meditating on this, I am. Clouded, the answer is.";

/// Result of asking the persona to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Spoken(String),
    /// Nothing usable came back; the caller picks its own fallback.
    Unavailable,
}

impl Reply {
    pub fn or_fallback(self, fallback: &str) -> String {
        match self {
            Reply::Spoken(text) => text,
            Reply::Unavailable => fallback.to_string(),
        }
    }
}

pub fn win_commentary_prompt(player_move: Move, computer_move: Move, score: Score) -> String {
    format!(
        "You are Yoda from Star Wars. You just won a round of Rock Paper Scissors Lizard Spock against a player.
Comment on your victory in 1-2 short sentences, using your characteristic speech pattern (object-subject-verb, wise/cryptic sayings). Be a bit smug about winning.

Round Details:
- Player played: {player_move}
- You (Computer) played: {computer_move} (You won!)
- Current Score: Player Wins={}, Your Wins (Losses)={}, Ties={}

Speak your comment on this victory, you will:",
        score.wins, score.losses, score.ties
    )
}

pub fn chat_prompt(user_message: &str) -> String {
    format!(
        "You are Yoda from Star Wars. Respond to the user's message below.
Speak ONLY in your characteristic style (object-subject-verb order is common, use wise/cryptic sayings, short sentences). Keep your responses relatively brief (1-3 sentences maximum). Do NOT break character.

User says: \"{user_message}\"

Your response as Yoda (normal conversation):"
    )
}

/// Speaks as Yoda through the configured generator.
#[derive(Clone)]
pub struct Commentator {
    generator: Arc<dyn TextGenerator>,
}

impl Commentator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Gloat about a computer win.
    pub async fn win_commentary(&self, player_move: Move, computer_move: Move, score: Score) -> Reply {
        tracing::info!(
            "Requesting Yoda commentary (player: {player_move}, computer: {computer_move})"
        );
        let prompt = win_commentary_prompt(player_move, computer_move, score);
        self.speak(&prompt, COMMENTARY_BLOCKED, "commentary").await
    }

    /// Reply to a conversational chat message.
    pub async fn chat_reply(&self, user_message: &str) -> Reply {
        let prompt = chat_prompt(user_message);
        tracing::debug!("Generated chat prompt:\n{prompt}");
        self.speak(&prompt, CHAT_BLOCKED, "chat").await
    }

    async fn speak(&self, prompt: &str, blocked_text: &str, purpose: &str) -> Reply {
        match self.generator.generate(prompt).await {
            Ok(Generation::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::warn!("Generator returned empty Yoda {purpose}");
                    Reply::Unavailable
                } else {
                    Reply::Spoken(text.to_string())
                }
            }
            Ok(Generation::Blocked(reason)) => {
                tracing::warn!("Yoda {purpose} blocked: {reason}");
                Reply::Spoken(blocked_text.to_string())
            }
            Ok(Generation::Empty) => {
                tracing::warn!("Generator returned empty Yoda {purpose}");
                Reply::Unavailable
            }
            Err(e) => {
                tracing::error!("Error getting Yoda {purpose}: {e}");
                Reply::Unavailable
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::services::gemini::GenerationError;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Generator stub that always answers the same way and records prompts.
    pub struct StubGenerator {
        pub answer: fn() -> Result<Generation, GenerationError>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl StubGenerator {
        pub fn new(answer: fn() -> Result<Generation, GenerationError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TextGenerator for StubGenerator {
        fn generate<'a>(
            &'a self,
            prompt: &'a str,
        ) -> BoxFuture<'a, Result<Generation, GenerationError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            let answer = (self.answer)();
            Box::pin(async move { answer })
        }
    }
}
