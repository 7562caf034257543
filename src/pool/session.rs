use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by an individual automation session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to launch session: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {0:?} waiting for page content")]
    Timeout(Duration),

    #[error("Session is closed: {0}")]
    Closed(String),
}

impl SessionError {
    /// Whether the session should be thrown away rather than reused
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Launch(_) | Self::Closed(_))
    }
}

/// A stateful, expensive-to-create page renderer
///
/// A session is only ever driven by the consumer holding its lease, which is
/// why every method takes `&mut self`.
#[async_trait]
pub trait Session: Send + 'static {
    /// Navigates to `url` and returns rendered HTML
    ///
    /// With `wait_for` set, waits until that selector has non-empty content
    /// and returns its inner HTML; otherwise returns the full page.
    async fn render(&mut self, url: &str, wait_for: Option<&str>) -> Result<String, SessionError>;

    /// Releases the underlying resources
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Creates sessions for the pool (and overflow sessions on exhaustion)
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Session;

    async fn create(&self, label: &str) -> Result<Self::Session, SessionError>;
}
