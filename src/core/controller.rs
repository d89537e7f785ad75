use crate::core::bookmarks::BookmarkStore;
use crate::core::feed::{FeedCoordinator, FeedEvent, FeedSnapshot};
use crate::core::filter::{FilterChange, FilterState};
use crate::core::session::SessionProvider;
use crate::domain::model::{BookmarkAction, Category, Exhibition, Session, SessionStatus};
use crate::domain::ports::{BookmarkRepository, ExhibitionStore, Notifier, SessionSource};
use crate::utils::error::{FeedError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Everything the feed talks to.
pub struct FeedDependencies {
    pub exhibitions: Arc<dyn ExhibitionStore>,
    pub bookmarks: Arc<dyn BookmarkRepository>,
    pub sessions: Arc<dyn SessionSource>,
    pub notifier: Arc<dyn Notifier>,
}

/// Sender side of the event loop; counts what it has submitted so callers can
/// wait for their own events to be handled.
#[derive(Clone)]
struct EventSink {
    tx: mpsc::UnboundedSender<FeedEvent>,
    submitted: Arc<AtomicU64>,
}

impl EventSink {
    fn send(&self, event: FeedEvent) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(event).is_err() {
            tracing::debug!("Feed worker gone, dropping event");
        }
    }

    fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }
}

/// Runs a [`FeedCoordinator`] on its own task and wires it to the store, the
/// session and the bookmark set.
pub struct FeedController {
    sink: EventSink,
    snapshots: watch::Receiver<FeedSnapshot>,
    bookmarks: Arc<BookmarkStore>,
    session: Arc<SessionProvider>,
    worker: JoinHandle<()>,
}

impl FeedController {
    pub fn spawn(deps: FeedDependencies, filter: FilterState) -> Self {
        let coordinator = FeedCoordinator::new(filter);
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(coordinator.snapshot());
        let sink = EventSink {
            tx,
            submitted: Arc::new(AtomicU64::new(0)),
        };

        let worker = tokio::spawn(run_feed_loop(
            coordinator,
            deps.exhibitions,
            rx,
            sink.clone(),
            snapshot_tx,
        ));

        Self {
            sink,
            snapshots,
            bookmarks: Arc::new(BookmarkStore::new(deps.bookmarks, deps.notifier)),
            session: Arc::new(SessionProvider::new(deps.sessions)),
            worker,
        }
    }

    /// Starts the feed: requests page 1, then resolves the session and loads the
    /// user's bookmarks in the background.
    pub fn mount(&self) {
        self.sink.send(FeedEvent::Mounted);

        let sink = self.sink.clone();
        let session = self.session.clone();
        let bookmarks = self.bookmarks.clone();
        tokio::spawn(async move {
            let status = session.resolve().await;
            sink.send(FeedEvent::SessionResolved(status.clone()));
            if let SessionStatus::Authenticated(session) = status {
                load_bookmarks(&bookmarks, &session, &sink).await;
            }
        });
    }

    pub fn set_category(&self, category: Category) {
        self.sink
            .send(FeedEvent::FilterChanged(FilterChange::Category(category)));
    }

    pub fn set_region(&self, region: impl Into<String>) {
        self.sink
            .send(FeedEvent::FilterChanged(FilterChange::Region(region.into())));
    }

    pub fn set_bookmark_only(&self, bookmark_only: bool) {
        self.sink
            .send(FeedEvent::FilterChanged(FilterChange::BookmarkOnly(bookmark_only)));
    }

    pub fn reset_filters(&self) {
        self.sink.send(FeedEvent::FilterChanged(FilterChange::Reset));
    }

    /// Ignored unless the feed is idle with more pages available.
    pub fn load_more(&self) {
        self.sink.send(FeedEvent::PageRequested);
    }

    /// Reloads the bookmark set for the signed-in user, if any.
    pub async fn refresh_bookmarks(&self) {
        if let SessionStatus::Authenticated(session) = self.session.resolve().await {
            load_bookmarks(&self.bookmarks, &session, &self.sink).await;
        }
    }

    /// Toggles the bookmark, then hands the feed the committed set whether or
    /// not the store accepted the change.
    pub async fn toggle_bookmark(&self, exhibition: &Exhibition) -> Result<BookmarkAction> {
        let status = self.session.resolve().await;
        let outcome = self.bookmarks.toggle(status.session(), exhibition).await;

        if let Some(session) = status.session() {
            if self.bookmarks.loaded_for().await.as_ref() == Some(&session.user_id) {
                self.sink.send(FeedEvent::BookmarksUpdated {
                    user_id: session.user_id.clone(),
                    ids: self.bookmarks.committed_ids().await,
                });
            }
        }
        outcome
    }

    pub async fn is_bookmarked(&self, exhibition: &Exhibition) -> bool {
        self.bookmarks.is_bookmarked(exhibition.id).await
    }

    pub fn session_status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until every event sent so far is handled and the feed has nothing
    /// left in flight.
    pub async fn settled(&self) -> Result<FeedSnapshot> {
        let target = self.sink.submitted();
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| s.revision >= target && s.is_settled())
            .await
            .map_err(|_| FeedError::WorkerStopped)?;
        Ok(snapshot.clone())
    }

    pub fn shutdown(self) {
        self.worker.abort();
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn load_bookmarks(bookmarks: &BookmarkStore, session: &Session, sink: &EventSink) {
    match bookmarks.load(session).await {
        Ok(ids) => sink.send(FeedEvent::BookmarksUpdated {
            user_id: session.user_id.clone(),
            ids,
        }),
        Err(e) => {
            tracing::warn!("Failed to load bookmarks for {}: {}", session.user_id, e);
            sink.send(FeedEvent::BookmarksFailed {
                user_id: session.user_id.clone(),
            });
        }
    }
}

async fn run_feed_loop(
    mut coordinator: FeedCoordinator,
    store: Arc<dyn ExhibitionStore>,
    mut events: mpsc::UnboundedReceiver<FeedEvent>,
    sink: EventSink,
    snapshots: watch::Sender<FeedSnapshot>,
) {
    while let Some(event) = events.recv().await {
        if let Some(command) = coordinator.handle(event) {
            let store = store.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                let outcome = store
                    .fetch_page(&command.query, command.cursor, command.session.as_ref())
                    .await;
                sink.send(FeedEvent::QueryResolved {
                    generation: command.generation,
                    cursor: command.cursor,
                    outcome,
                });
            });
        }
        snapshots.send_replace(coordinator.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryStore, StaticSession};
    use crate::adapters::notify::RecordingNotifier;
    use crate::core::feed::{EmptyReason, FeedStatus};
    use crate::domain::model::{Bookmark, ExhibitionId, Gallery};
    use async_trait::async_trait;
    use std::time::Duration;

    fn exhibition(id: i64, address: &str, is_free: bool) -> Exhibition {
        Exhibition {
            id: ExhibitionId(id),
            title: format!("Exhibition {}", id),
            date_range: None,
            location: None,
            is_free,
            is_recommended: id % 3 == 0,
            gallery: Some(Gallery {
                id: None,
                name: None,
                address: Some(address.to_string()),
            }),
        }
    }

    fn controller(
        store: Arc<InMemoryStore>,
        session: StaticSession,
        filter: FilterState,
    ) -> FeedController {
        FeedController::spawn(
            FeedDependencies {
                exhibitions: store.clone(),
                bookmarks: store,
                sessions: Arc::new(session),
                notifier: Arc::new(RecordingNotifier::new()),
            },
            filter,
        )
    }

    /// Rejects inserts for one exhibition after a pause; everything else goes
    /// straight to the wrapped store.
    struct RejectingRepository {
        inner: Arc<InMemoryStore>,
        rejected: ExhibitionId,
        delay: Duration,
    }

    #[async_trait]
    impl BookmarkRepository for RejectingRepository {
        async fn list(&self, session: &Session) -> Result<Vec<Bookmark>> {
            self.inner.list(session).await
        }

        async fn insert(&self, session: &Session, bookmark: &Bookmark) -> Result<Bookmark> {
            if bookmark.exhibition_id == Some(self.rejected) {
                tokio::time::sleep(self.delay).await;
                return Err(FeedError::remote(500, "insert rejected"));
            }
            self.inner.insert(session, bookmark).await
        }

        async fn delete(&self, session: &Session, exhibition_id: ExhibitionId) -> Result<()> {
            self.inner.delete(session, exhibition_id).await
        }
    }

    async fn settle(feed: &FeedController) -> FeedSnapshot {
        tokio::time::timeout(Duration::from_secs(2), feed.settled())
            .await
            .expect("feed did not settle")
            .unwrap()
    }

    #[tokio::test]
    async fn test_mount_loads_first_page_and_more() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=8).map(|i| exhibition(i, "서울", false)).collect(),
        ));
        let feed = controller(store.clone(), StaticSession::anonymous(), FilterState::default());

        feed.mount();
        let snapshot = feed.settled().await.unwrap();
        assert_eq!(snapshot.items.len(), 5);
        assert!(snapshot.has_more);

        feed.load_more();
        let snapshot = feed.settled().await.unwrap();
        assert_eq!(snapshot.items.len(), 8);
        assert!(!snapshot.has_more);
        assert_eq!(snapshot.status(), FeedStatus::AllLoaded);
        assert_eq!(store.query_count().await, 2);
    }

    #[tokio::test]
    async fn test_fast_tab_switch_never_shows_stale_rows() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=6).map(|i| exhibition(i, "서울", i % 2 == 0)).collect(),
        ));
        store
            .delay_queries(Category::All, Duration::from_millis(80))
            .await;
        let feed = controller(store.clone(), StaticSession::anonymous(), FilterState::default());
        let mut updates = feed.subscribe();

        feed.mount();
        feed.set_category(Category::Free);
        let snapshot = feed.settled().await.unwrap();
        assert!(snapshot.items.iter().all(|e| e.is_free));

        // Let the slow "all" response land; it must not replace the list.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.filter.category(), Category::Free);
        assert!(latest.items.iter().all(|e| e.is_free));
        assert_eq!(latest.items.len(), 3);
    }

    #[tokio::test]
    async fn test_bookmark_view_waits_for_late_session() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=4).map(|i| exhibition(i, "서울", false)).collect(),
        ));
        store
            .seed_bookmark(crate::domain::model::Bookmark::new("u-1".into(), ExhibitionId(2)))
            .await;
        let session = StaticSession::user("u-1").with_delay(Duration::from_millis(30));
        let feed = controller(store.clone(), session, FilterState::new(Category::All, "", true));

        feed.mount();
        tokio::task::yield_now().await;
        let early = feed.snapshot();
        assert!(early.items.is_empty());
        assert_ne!(early.empty_reason, Some(EmptyReason::LoginRequired));

        let snapshot = feed.settled().await.unwrap();
        let ids: Vec<i64> = snapshot.items.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(store.query_count().await, 1);
    }

    #[tokio::test]
    async fn test_toggle_in_bookmark_view_refreshes_list() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=4).map(|i| exhibition(i, "서울", false)).collect(),
        ));
        let feed = controller(store.clone(), StaticSession::user("u-1"), FilterState::default());

        feed.mount();
        let snapshot = feed.settled().await.unwrap();
        let target = snapshot.items[1].clone();
        assert_eq!(
            feed.toggle_bookmark(&target).await.unwrap(),
            BookmarkAction::Added
        );
        assert!(feed.is_bookmarked(&target).await);

        feed.set_bookmark_only(true);
        let snapshot = feed.settled().await.unwrap();
        assert_eq!(snapshot.items, vec![target.clone()]);

        assert_eq!(
            feed.toggle_bookmark(&target).await.unwrap(),
            BookmarkAction::Removed
        );
        let snapshot = feed.settled().await.unwrap();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.status(), FeedStatus::Empty(EmptyReason::NoBookmarks));
    }

    #[tokio::test]
    async fn test_toggle_requires_session() {
        let store = Arc::new(InMemoryStore::with_exhibitions(vec![exhibition(1, "서울", false)]));
        let feed = controller(store.clone(), StaticSession::anonymous(), FilterState::default());

        feed.mount();
        let snapshot = feed.settled().await.unwrap();
        let err = feed.toggle_bookmark(&snapshot.items[0]).await.unwrap_err();
        assert!(matches!(err, FeedError::AuthRequired { .. }));
        assert_eq!(store.mutation_count().await, 0);
        assert_eq!(feed.session_status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_failed_bookmark_load_then_bookmark_view_is_unavailable() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=3).map(|i| exhibition(i, "서울", false)).collect(),
        ));
        store.fail_next_lists(1).await;
        let feed = controller(store.clone(), StaticSession::user("u-1"), FilterState::default());

        feed.mount();
        assert_eq!(settle(&feed).await.items.len(), 3);

        feed.set_bookmark_only(true);
        let snapshot = settle(&feed).await;
        assert!(snapshot.items.is_empty());
        assert_eq!(
            snapshot.status(),
            FeedStatus::Empty(EmptyReason::BookmarksUnavailable)
        );

        feed.refresh_bookmarks().await;
        let snapshot = settle(&feed).await;
        assert_eq!(snapshot.status(), FeedStatus::Empty(EmptyReason::NoBookmarks));
        assert_eq!(store.query_count().await, 1);
    }

    #[tokio::test]
    async fn test_filter_change_after_failed_bookmark_load_settles() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=3).map(|i| exhibition(i, "서울", false)).collect(),
        ));
        store.fail_next_lists(1).await;
        let feed = controller(
            store.clone(),
            StaticSession::user("u-1"),
            FilterState::new(Category::All, "", true),
        );

        feed.mount();
        let snapshot = settle(&feed).await;
        assert_eq!(snapshot.empty_reason, Some(EmptyReason::BookmarksUnavailable));

        feed.set_region("서울");
        let snapshot = settle(&feed).await;
        assert_eq!(snapshot.filter.region(), "서울");
        assert_eq!(snapshot.empty_reason, Some(EmptyReason::BookmarksUnavailable));
        assert_eq!(store.query_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_toggle_never_shows_in_bookmark_view() {
        let store = Arc::new(InMemoryStore::with_exhibitions(
            (1..=3).map(|i| exhibition(i, "서울", false)).collect(),
        ));
        let repository = Arc::new(RejectingRepository {
            inner: store.clone(),
            rejected: ExhibitionId(2),
            delay: Duration::from_millis(80),
        });
        let feed = FeedController::spawn(
            FeedDependencies {
                exhibitions: store.clone(),
                bookmarks: repository,
                sessions: Arc::new(StaticSession::user("u-1")),
                notifier: Arc::new(RecordingNotifier::new()),
            },
            FilterState::new(Category::All, "", true),
        );

        feed.mount();
        let snapshot = settle(&feed).await;
        assert_eq!(snapshot.status(), FeedStatus::Empty(EmptyReason::NoBookmarks));

        let (first, second) = (exhibition(1, "서울", false), exhibition(2, "서울", false));
        let (rejected, added) = tokio::join!(feed.toggle_bookmark(&second), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            feed.toggle_bookmark(&first).await
        });
        assert!(rejected.is_err());
        assert_eq!(added.unwrap(), BookmarkAction::Added);

        let snapshot = settle(&feed).await;
        let ids: Vec<i64> = snapshot.items.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1]);
        assert!(!feed.is_bookmarked(&second).await);
        assert_eq!(store.bookmarks_for(&"u-1".into()).await.len(), 1);
    }
}
