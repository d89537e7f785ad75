use crate::domain::model::{Session, SessionStatus};
use crate::domain::ports::SessionSource;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Resolves the current session once and remembers the answer.
pub struct SessionProvider {
    source: Arc<dyn SessionSource>,
    resolved: OnceCell<Option<Session>>,
}

impl SessionProvider {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        Self {
            source,
            resolved: OnceCell::new(),
        }
    }

    /// Concurrent callers share one lookup. A failed lookup counts as anonymous.
    pub async fn resolve(&self) -> SessionStatus {
        let session = self
            .resolved
            .get_or_init(|| async {
                match self.source.get_session().await {
                    Ok(Some(session)) => {
                        tracing::info!("Session resolved for user {}", session.user_id);
                        Some(session)
                    }
                    Ok(None) => {
                        tracing::info!("No active session");
                        None
                    }
                    Err(e) => {
                        tracing::warn!("Session lookup failed, continuing anonymously: {}", e);
                        None
                    }
                }
            })
            .await;
        SessionStatus::from(session.clone())
    }

    pub fn status(&self) -> SessionStatus {
        match self.resolved.get() {
            Some(session) => SessionStatus::from(session.clone()),
            None => SessionStatus::Unresolved,
        }
    }
}
