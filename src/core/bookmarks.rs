use crate::domain::model::{
    Bookmark, BookmarkAction, Exhibition, ExhibitionId, Notification, Session, Severity, UserId,
};
use crate::domain::ports::{BookmarkRepository, Notifier};
use crate::utils::error::{FeedError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const ERROR_TOAST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
struct BookmarkSet {
    owner: Option<UserId>,
    rows: BTreeMap<ExhibitionId, Bookmark>,
    /// Toggles awaiting the store, with the state they are moving to.
    in_flight: HashMap<ExhibitionId, bool>,
    /// Bumped on every local change made by a toggle.
    version: u64,
}

impl BookmarkSet {
    /// The set as the store has confirmed it: optimistic additions are left
    /// out and optimistic removals are still counted.
    fn committed_ids(&self) -> BTreeSet<ExhibitionId> {
        let mut ids: BTreeSet<ExhibitionId> = self
            .rows
            .keys()
            .filter(|id| self.in_flight.get(*id) != Some(&true))
            .copied()
            .collect();
        ids.extend(
            self.in_flight
                .iter()
                .filter(|(_, on)| !**on)
                .map(|(id, _)| *id),
        );
        ids
    }
}

/// The current user's bookmarks, kept in step with the remote store.
pub struct BookmarkStore {
    repository: Arc<dyn BookmarkRepository>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<BookmarkSet>,
}

impl BookmarkStore {
    pub fn new(repository: Arc<dyn BookmarkRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
            state: RwLock::new(BookmarkSet::default()),
        }
    }

    /// Replaces the local set with the user's rows and returns the committed
    /// ids. On error the set is untouched.
    pub async fn load(&self, session: &Session) -> Result<BTreeSet<ExhibitionId>> {
        tracing::debug!("Loading bookmarks for user {}", session.user_id);
        let started = self.state.read().await.version;
        let rows = self.repository.list(session).await?;

        let mut state = self.state.write().await;
        if state.version != started && state.owner.as_ref() == Some(&session.user_id) {
            // A toggle changed the set while the list was in flight.
            tracing::debug!("Discarding bookmark list that predates a local change");
            return Ok(state.committed_ids());
        }
        state.owner = Some(session.user_id.clone());
        state.rows = rows
            .into_iter()
            .filter(|b| b.user_id == session.user_id)
            .filter_map(|b| b.exhibition_id.map(|id| (id, b)))
            .collect();

        // Toggles still running keep their optimistic value.
        let pending: Vec<(ExhibitionId, bool)> =
            state.in_flight.iter().map(|(id, on)| (*id, *on)).collect();
        for (id, on) in pending {
            if on {
                state
                    .rows
                    .entry(id)
                    .or_insert_with(|| Bookmark::new(session.user_id.clone(), id));
            } else {
                state.rows.remove(&id);
            }
        }

        tracing::info!(
            "Loaded {} bookmarks for user {}",
            state.rows.len(),
            session.user_id
        );
        Ok(state.committed_ids())
    }

    pub async fn is_bookmarked(&self, exhibition_id: ExhibitionId) -> bool {
        self.state.read().await.rows.contains_key(&exhibition_id)
    }

    /// Bookmarks the store has confirmed. Toggles still awaiting it are not
    /// reflected until they complete.
    pub async fn committed_ids(&self) -> BTreeSet<ExhibitionId> {
        self.state.read().await.committed_ids()
    }

    pub async fn loaded_for(&self) -> Option<UserId> {
        self.state.read().await.owner.clone()
    }

    /// Adds or removes the bookmark for `exhibition`.
    ///
    /// The local set flips immediately and is restored if the store rejects the
    /// change. A second toggle on the same exhibition while the first is pending
    /// fails with [`FeedError::ToggleInProgress`] and never reaches the store.
    pub async fn toggle(
        &self,
        session: Option<&Session>,
        exhibition: &Exhibition,
    ) -> Result<BookmarkAction> {
        let Some(session) = session else {
            let err = FeedError::auth_required("bookmark an exhibition");
            self.notifier.notify(Notification {
                title: "Sign-in required".to_string(),
                description: "Sign in to add exhibitions to your bookmarks.".to_string(),
                severity: Severity::Error,
                timeout: Some(ERROR_TOAST_TIMEOUT),
            });
            return Err(err);
        };

        if self.loaded_for().await.as_ref() != Some(&session.user_id) {
            if let Err(e) = self.load(session).await {
                self.notify_failure(&e);
                return Err(e);
            }
        }

        let id = exhibition.id;
        let (previous, pending) = {
            let mut state = self.state.write().await;
            if state.in_flight.contains_key(&id) {
                tracing::debug!("Ignoring re-entrant bookmark toggle for exhibition {}", id);
                return Err(FeedError::ToggleInProgress { exhibition_id: id });
            }

            state.version += 1;
            match state.rows.remove(&id) {
                Some(previous) => {
                    state.in_flight.insert(id, false);
                    (Some(previous), None)
                }
                None => {
                    let pending = Bookmark::new(session.user_id.clone(), id);
                    state.rows.insert(id, pending.clone());
                    state.in_flight.insert(id, true);
                    (None, Some(pending))
                }
            }
        };

        let outcome = match &pending {
            Some(bookmark) => self
                .repository
                .insert(session, bookmark)
                .await
                .map(Some),
            None => self.repository.delete(session, id).await.map(|_| None),
        };

        let mut state = self.state.write().await;
        state.in_flight.remove(&id);
        state.version += 1;

        match outcome {
            Ok(stored) => {
                let action = match stored {
                    Some(row) => {
                        state.rows.insert(id, row);
                        BookmarkAction::Added
                    }
                    None => BookmarkAction::Removed,
                };
                drop(state);
                tracing::info!("Bookmark {:?} for exhibition {}", action, id);
                self.notify_success(exhibition, action);
                Ok(action)
            }
            Err(e) => {
                match previous {
                    Some(row) => {
                        state.rows.insert(id, row);
                    }
                    None => {
                        state.rows.remove(&id);
                    }
                }
                drop(state);
                tracing::error!("Bookmark toggle for exhibition {} failed: {}", id, e);
                self.notify_failure(&e);
                Err(e)
            }
        }
    }

    fn notify_success(&self, exhibition: &Exhibition, action: BookmarkAction) {
        let notification = match action {
            BookmarkAction::Added => Notification {
                title: "Bookmark added".to_string(),
                description: format!("{} was added to your bookmarks.", exhibition.title),
                severity: Severity::Success,
                timeout: None,
            },
            BookmarkAction::Removed => Notification {
                title: "Bookmark removed".to_string(),
                description: format!("{} was removed from your bookmarks.", exhibition.title),
                severity: Severity::Warning,
                timeout: None,
            },
        };
        self.notifier.notify(notification);
    }

    fn notify_failure(&self, error: &FeedError) {
        tracing::debug!("Notifying bookmark failure: {}", error);
        self.notifier.notify(Notification {
            title: "Something went wrong".to_string(),
            description: "The bookmark could not be updated.".to_string(),
            severity: Severity::Error,
            timeout: Some(ERROR_TOAST_TIMEOUT),
        });
    }
}
