// Outbound integrations: joke API, text generation, and the chat router on top.

pub mod cache;
pub mod chat;
pub mod commentary;
pub mod gemini;
pub mod joke;

pub use chat::ChatRouter;
pub use commentary::{Commentator, Reply};
pub use gemini::{GeminiClient, Generation, GenerationError, TextGenerator};
pub use joke::{CachedJokeSource, DadJokeClient, JokeError, JokeSource};

/// Serve a router on an ephemeral local port and return its base URL.
#[cfg(test)]
pub(crate) async fn spawn_local_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}
