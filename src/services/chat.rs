// Chat routing: joke requests go to the joke API, everything else to Yoda.

use std::sync::Arc;

use super::commentary::Commentator;
use super::joke::{JokeError, JokeSource};
use crate::metrics;

/// Substrings that mark a joke request. The leading spaces are significant.
pub const JOKE_KEYWORDS: &[&str] = &[" joke", " funny", " laugh", " humor", " tell me a"];

pub const JOKE_NOT_FOUND: &str = "Find a joke, I could not. Clouded, the source is. Hmm.";
pub const JOKE_DISTURBANCE: &str = "Disturbance in the Force, there is. Fetch the joke, I could not.";
pub const CHAT_FALLBACK: &str = "Meditating, I am. Speak later, we can. Hmm.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIntent {
    Joke,
    Conversation,
}

impl ChatIntent {
    pub fn label(self) -> &'static str {
        match self {
            ChatIntent::Joke => "joke",
            ChatIntent::Conversation => "conversation",
        }
    }
}

/// Classify a message by plain substring match on its lowercase form.
pub fn classify(message: &str) -> ChatIntent {
    let lower = message.to_lowercase();
    if JOKE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ChatIntent::Joke
    } else {
        ChatIntent::Conversation
    }
}

#[derive(Clone)]
pub struct ChatRouter {
    jokes: Arc<dyn JokeSource>,
    commentator: Commentator,
}

impl ChatRouter {
    pub fn new(jokes: Arc<dyn JokeSource>, commentator: Commentator) -> Self {
        Self { jokes, commentator }
    }

    /// Answer a chat message. Always returns non-empty text.
    pub async fn handle(&self, message: &str) -> String {
        let intent = classify(message);
        metrics::CHAT_MESSAGES_TOTAL
            .with_label_values(&[intent.label()])
            .inc();
        tracing::info!("Handling chat message ({})", intent.label());

        match intent {
            ChatIntent::Joke => self.tell_joke().await,
            ChatIntent::Conversation => {
                let reply = self.commentator.chat_reply(message).await;
                reply.or_fallback(CHAT_FALLBACK)
            }
        }
    }

    async fn tell_joke(&self) -> String {
        // Run the fetch as its own task so a panicking source can't take the
        // request down with it.
        let jokes = self.jokes.clone();
        let fetch = tokio::spawn(async move { jokes.fetch_joke().await });

        match fetch.await {
            Ok(Ok(joke)) => joke,
            Ok(Err(e @ JokeError::Status(_))) => {
                tracing::error!("Unexpected error fetching dad joke: {e}");
                JOKE_DISTURBANCE.to_string()
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to fetch dad joke for chat request: {}", e.detail());
                JOKE_NOT_FOUND.to_string()
            }
            Err(e) => {
                tracing::error!("Unexpected error fetching dad joke: {e}");
                JOKE_DISTURBANCE.to_string()
            }
        }
    }
}
