use crate::domain::query::ExhibitionQuery;
use crate::domain::model::{
    Bookmark, Exhibition, ExhibitionId, Notification, PageCursor, Session,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read side of the remote store.
#[async_trait]
pub trait ExhibitionStore: Send + Sync {
    /// `session` is the signed-in user the page is read for, if any.
    async fn fetch_page(
        &self,
        query: &ExhibitionQuery,
        cursor: PageCursor,
        session: Option<&Session>,
    ) -> Result<Vec<Exhibition>>;
}

/// Bookmark rows owned by a user.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    async fn list(&self, session: &Session) -> Result<Vec<Bookmark>>;
    /// Returns the row as stored.
    async fn insert(&self, session: &Session, bookmark: &Bookmark) -> Result<Bookmark>;
    async fn delete(&self, session: &Session, exhibition_id: ExhibitionId) -> Result<()>;
}

#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub trait StoreConfigProvider: Send + Sync {
    fn store_url(&self) -> &str;
    fn api_key(&self) -> &str;
    fn exhibition_table(&self) -> &str;
    fn bookmark_table(&self) -> &str;
    fn gallery_join(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
}

