use crate::domain::model::{
    Bookmark, Category, Exhibition, ExhibitionId, PageCursor, Session, UserId,
};
use crate::domain::ports::{BookmarkRepository, ExhibitionStore, SessionSource};
use crate::domain::query::ExhibitionQuery;
use crate::utils::error::{FeedError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Failures {
    queries: usize,
    lists: usize,
    mutations: usize,
}

#[derive(Debug, Clone, Copy)]
enum FailureKind {
    Query,
    List,
    Mutation,
}

#[derive(Debug, Default)]
struct Tables {
    exhibitions: Vec<Exhibition>,
    bookmarks: Vec<Bookmark>,
    next_bookmark_id: i64,
}

/// Store held in memory. Evaluates queries with the same predicates the remote
/// store applies, and enforces one bookmark per (user, exhibition).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<Failures>,
    queries: Mutex<Vec<(ExhibitionQuery, PageCursor)>>,
    mutations: Mutex<usize>,
    query_delays: Mutex<HashMap<Category, Duration>>,
    mutation_delay: Mutex<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exhibitions(exhibitions: Vec<Exhibition>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                exhibitions,
                ..Tables::default()
            }),
            ..Self::default()
        }
    }

    pub async fn seed_bookmark(&self, mut bookmark: Bookmark) {
        let mut tables = self.tables.lock().await;
        tables.next_bookmark_id += 1;
        bookmark.id = Some(tables.next_bookmark_id);
        tables.bookmarks.push(bookmark);
    }

    pub async fn bookmarks_for(&self, user_id: &UserId) -> Vec<Bookmark> {
        let tables = self.tables.lock().await;
        tables
            .bookmarks
            .iter()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Every page request received, in order.
    pub async fn queries(&self) -> Vec<(ExhibitionQuery, PageCursor)> {
        self.queries.lock().await.clone()
    }

    pub async fn query_count(&self) -> usize {
        self.queries.lock().await.len()
    }

    /// Insert and delete calls received, failed ones included.
    pub async fn mutation_count(&self) -> usize {
        *self.mutations.lock().await
    }

    pub async fn fail_next_queries(&self, count: usize) {
        self.failures.lock().await.queries = count;
    }

    pub async fn fail_next_lists(&self, count: usize) {
        self.failures.lock().await.lists = count;
    }

    pub async fn fail_next_mutations(&self, count: usize) {
        self.failures.lock().await.mutations = count;
    }

    /// Slows down page requests for one category.
    pub async fn delay_queries(&self, category: Category, delay: Duration) {
        self.query_delays.lock().await.insert(category, delay);
    }

    /// Slows down every insert and delete.
    pub async fn delay_mutations(&self, delay: Duration) {
        *self.mutation_delay.lock().await = Some(delay);
    }

    async fn begin_mutation(&self) {
        *self.mutations.lock().await += 1;
        let delay = *self.mutation_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn take_failure(&self, kind: FailureKind) -> bool {
        let mut failures = self.failures.lock().await;
        let remaining = match kind {
            FailureKind::Query => &mut failures.queries,
            FailureKind::List => &mut failures.lists,
            FailureKind::Mutation => &mut failures.mutations,
        };
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ExhibitionStore for InMemoryStore {
    async fn fetch_page(
        &self,
        query: &ExhibitionQuery,
        cursor: PageCursor,
        _session: Option<&Session>,
    ) -> Result<Vec<Exhibition>> {
        self.queries.lock().await.push((query.clone(), cursor));

        let delay = self.query_delays.lock().await.get(&query.category()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure(FailureKind::Query).await {
            return Err(FeedError::remote(503, "injected query failure"));
        }

        let tables = self.tables.lock().await;
        Ok(tables
            .exhibitions
            .iter()
            .filter(|e| query.matches(e))
            .skip(cursor.offset())
            .take(cursor.limit())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookmarkRepository for InMemoryStore {
    async fn list(&self, session: &Session) -> Result<Vec<Bookmark>> {
        if self.take_failure(FailureKind::List).await {
            return Err(FeedError::remote(503, "injected list failure"));
        }
        Ok(self.bookmarks_for(&session.user_id).await)
    }

    async fn insert(&self, session: &Session, bookmark: &Bookmark) -> Result<Bookmark> {
        self.begin_mutation().await;
        if self.take_failure(FailureKind::Mutation).await {
            return Err(FeedError::remote(500, "injected insert failure"));
        }

        let mut tables = self.tables.lock().await;
        let duplicate = tables.bookmarks.iter().any(|b| {
            b.user_id == session.user_id && b.exhibition_id == bookmark.exhibition_id
        });
        if duplicate {
            return Err(FeedError::remote(
                409,
                "duplicate key value violates unique constraint \"bookmark_user_exhibition\"",
            ));
        }

        tables.next_bookmark_id += 1;
        let stored = Bookmark {
            id: Some(tables.next_bookmark_id),
            user_id: session.user_id.clone(),
            ..bookmark.clone()
        };
        tables.bookmarks.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, session: &Session, exhibition_id: ExhibitionId) -> Result<()> {
        self.begin_mutation().await;
        if self.take_failure(FailureKind::Mutation).await {
            return Err(FeedError::remote(500, "injected delete failure"));
        }

        let mut tables = self.tables.lock().await;
        tables.bookmarks.retain(|b| {
            !(b.user_id == session.user_id && b.exhibition_id == Some(exhibition_id))
        });
        Ok(())
    }
}

/// A session known up front, optionally reported after a delay.
#[derive(Debug, Clone)]
pub struct StaticSession {
    session: Option<Session>,
    delay: Option<Duration>,
}

impl StaticSession {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            delay: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self::new(Some(Session::new(user_id)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl SessionSource for StaticSession {
    async fn get_session(&self) -> Result<Option<Session>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.session.clone())
    }
}
