//! The feed state machine.
//!
//! [`FeedCoordinator`] owns the visible list and the page cursor. It is a pure
//! transition function over [`FeedEvent`]s: it never performs I/O itself, it
//! returns a [`FetchCommand`] whenever a page has to be requested, and expects the
//! answer back as [`FeedEvent::QueryResolved`] carrying the same generation.

use crate::core::filter::{FilterChange, FilterState};
use crate::domain::model::{
    Exhibition, ExhibitionId, PageCursor, Session, SessionStatus, UserId, PAGE_SIZE,
};
use crate::domain::query::ExhibitionQuery;
use crate::utils::error::{FeedError, Result};
use std::collections::BTreeSet;

pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Loading,
    LoadingMore,
    Ready,
    /// Bookmark-only view waiting for the user's bookmark set.
    BookmarkGateWait,
}

/// Why a settled feed is empty without having queried the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    AwaitingSession,
    LoginRequired,
    NoBookmarks,
    BookmarksUnavailable,
}

/// What the footer of a rendered feed should say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Loading,
    MoreAvailable,
    AllLoaded,
    NoResults,
    Empty(EmptyReason),
}

#[derive(Debug)]
pub enum FeedEvent {
    Mounted,
    FilterChanged(FilterChange),
    SessionResolved(SessionStatus),
    BookmarksUpdated {
        user_id: UserId,
        ids: BTreeSet<ExhibitionId>,
    },
    BookmarksFailed {
        user_id: UserId,
    },
    PageRequested,
    QueryResolved {
        generation: Generation,
        cursor: PageCursor,
        outcome: Result<Vec<Exhibition>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCommand {
    pub generation: Generation,
    pub cursor: PageCursor,
    pub query: ExhibitionQuery,
    /// Signed-in user the page is read for.
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub items: Vec<Exhibition>,
    pub has_more: bool,
    pub is_loading: bool,
    pub phase: FeedPhase,
    pub page: u32,
    pub empty_reason: Option<EmptyReason>,
    pub filter: FilterState,
    /// Number of events handled when this snapshot was taken.
    pub revision: u64,
}

impl FeedSnapshot {
    /// Nothing pending that would change the list without user input.
    pub fn is_settled(&self) -> bool {
        matches!(self.phase, FeedPhase::Ready)
            && self.empty_reason != Some(EmptyReason::AwaitingSession)
    }

    pub fn status(&self) -> FeedStatus {
        if self.is_loading || self.phase == FeedPhase::BookmarkGateWait {
            return FeedStatus::Loading;
        }
        if let Some(reason) = self.empty_reason {
            return FeedStatus::Empty(reason);
        }
        match (self.items.is_empty(), self.has_more) {
            (_, true) => FeedStatus::MoreAvailable,
            (false, false) => FeedStatus::AllLoaded,
            (true, false) => FeedStatus::NoResults,
        }
    }
}

enum Plan {
    Fetch(ExhibitionQuery),
    Wait,
    Empty(EmptyReason),
}

#[derive(Debug)]
pub struct FeedCoordinator {
    filter: FilterState,
    session: SessionStatus,
    bookmarks: Option<(UserId, BTreeSet<ExhibitionId>)>,
    /// User whose last bookmark load failed with no set to fall back on.
    bookmarks_failed: Option<UserId>,
    mounted: bool,
    phase: FeedPhase,
    items: Vec<Exhibition>,
    cursor: PageCursor,
    has_more: bool,
    empty_reason: Option<EmptyReason>,
    active_query: Option<ExhibitionQuery>,
    generation: Generation,
    in_flight: Option<(Generation, PageCursor)>,
    revision: u64,
}

impl FeedCoordinator {
    pub fn new(filter: FilterState) -> Self {
        Self {
            filter,
            session: SessionStatus::Unresolved,
            bookmarks: None,
            bookmarks_failed: None,
            mounted: false,
            phase: FeedPhase::Idle,
            items: Vec::new(),
            cursor: PageCursor::first(),
            has_more: false,
            empty_reason: None,
            active_query: None,
            generation: 0,
            in_flight: None,
            revision: 0,
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn items(&self) -> &[Exhibition] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: self.items.clone(),
            has_more: self.has_more,
            is_loading: matches!(self.phase, FeedPhase::Loading | FeedPhase::LoadingMore),
            phase: self.phase,
            page: self.cursor.page(),
            empty_reason: self.empty_reason,
            filter: self.filter.clone(),
            revision: self.revision,
        }
    }

    pub fn handle(&mut self, event: FeedEvent) -> Option<FetchCommand> {
        self.revision += 1;
        match event {
            FeedEvent::Mounted => {
                if self.mounted {
                    return None;
                }
                self.mounted = true;
                self.restart()
            }
            FeedEvent::FilterChanged(change) => {
                if !self.filter.apply(change) {
                    return None;
                }
                tracing::debug!("Filter changed: {:?}", self.filter);
                self.restart_if_mounted()
            }
            FeedEvent::SessionResolved(status) => {
                if self.session == status {
                    return None;
                }
                self.session = status;
                if self.filter.bookmark_only() {
                    self.restart_if_mounted()
                } else {
                    None
                }
            }
            FeedEvent::BookmarksUpdated { user_id, ids } => {
                let unchanged = matches!(
                    &self.bookmarks,
                    Some((owner, current)) if owner == &user_id && current == &ids
                );
                if self.bookmarks_failed.as_ref() == Some(&user_id) {
                    self.bookmarks_failed = None;
                }
                self.bookmarks = Some((user_id, ids));
                let gated = self.phase == FeedPhase::BookmarkGateWait;
                if self.filter.bookmark_only() && (gated || !unchanged) {
                    self.restart_if_mounted()
                } else {
                    None
                }
            }
            FeedEvent::BookmarksFailed { user_id } => {
                tracing::warn!("Bookmarks for user {} could not be loaded", user_id);
                let known = matches!(&self.bookmarks, Some((owner, _)) if owner == &user_id);
                if !known {
                    self.bookmarks_failed = Some(user_id);
                }
                if self.phase == FeedPhase::BookmarkGateWait {
                    self.restart_if_mounted()
                } else {
                    None
                }
            }
            FeedEvent::PageRequested => self.load_more(),
            FeedEvent::QueryResolved {
                generation,
                cursor,
                outcome,
            } => {
                self.resolve(generation, cursor, outcome);
                None
            }
        }
    }

    fn restart_if_mounted(&mut self) -> Option<FetchCommand> {
        if self.mounted {
            self.restart()
        } else {
            None
        }
    }

    /// Back to page 1 under the current inputs. Anything in flight becomes stale.
    fn restart(&mut self) -> Option<FetchCommand> {
        self.generation += 1;
        self.in_flight = None;
        self.cursor = PageCursor::first();
        self.items.clear();
        self.has_more = false;
        self.empty_reason = None;
        self.active_query = None;

        match self.plan() {
            Plan::Fetch(query) => {
                self.active_query = Some(query.clone());
                Some(self.issue(query, PageCursor::first(), FeedPhase::Loading))
            }
            Plan::Wait => {
                tracing::debug!("Waiting for bookmarks before querying");
                self.phase = FeedPhase::BookmarkGateWait;
                None
            }
            Plan::Empty(reason) => {
                tracing::debug!("Feed is empty without querying: {:?}", reason);
                self.phase = FeedPhase::Ready;
                self.empty_reason = Some(reason);
                None
            }
        }
    }

    fn plan(&self) -> Plan {
        let query = self.filter.base_query();
        if !self.filter.bookmark_only() {
            return Plan::Fetch(query);
        }

        let session = match &self.session {
            SessionStatus::Unresolved => return Plan::Empty(EmptyReason::AwaitingSession),
            SessionStatus::Anonymous => return Plan::Empty(EmptyReason::LoginRequired),
            SessionStatus::Authenticated(session) => session,
        };

        match &self.bookmarks {
            Some((owner, ids)) if owner == &session.user_id => match query.restricted_to(ids) {
                Some(query) => Plan::Fetch(query),
                None => Plan::Empty(EmptyReason::NoBookmarks),
            },
            _ if self.bookmarks_failed.as_ref() == Some(&session.user_id) => {
                Plan::Empty(EmptyReason::BookmarksUnavailable)
            }
            _ => Plan::Wait,
        }
    }

    fn issue(
        &mut self,
        query: ExhibitionQuery,
        cursor: PageCursor,
        phase: FeedPhase,
    ) -> FetchCommand {
        self.generation += 1;
        self.in_flight = Some((self.generation, cursor));
        self.phase = phase;
        tracing::debug!(
            "Requesting page {} (generation {})",
            cursor.page(),
            self.generation
        );
        FetchCommand {
            generation: self.generation,
            cursor,
            query,
            session: self.session.session().cloned(),
        }
    }

    fn load_more(&mut self) -> Option<FetchCommand> {
        if self.phase != FeedPhase::Ready || !self.has_more || self.in_flight.is_some() {
            tracing::debug!(
                "Ignoring load more (phase {:?}, has_more {})",
                self.phase,
                self.has_more
            );
            return None;
        }
        let query = self.active_query.clone()?;
        let next = self.cursor.next();
        Some(self.issue(query, next, FeedPhase::LoadingMore))
    }

    fn resolve(
        &mut self,
        generation: Generation,
        cursor: PageCursor,
        outcome: Result<Vec<Exhibition>>,
    ) {
        if self.in_flight != Some((generation, cursor)) {
            let stale = FeedError::StaleResponse { generation };
            tracing::debug!("{}", stale);
            return;
        }
        self.in_flight = None;
        self.phase = FeedPhase::Ready;

        match outcome {
            Ok(rows) => {
                let count = rows.len();
                if cursor.page() == 1 {
                    self.items = rows;
                } else {
                    self.items.extend(rows);
                }
                // A full page means "maybe more"; only a short page proves the end.
                self.has_more = count == PAGE_SIZE;
                self.cursor = cursor;
                tracing::debug!(
                    "Page {} applied: {} rows, {} total, has_more {}",
                    cursor.page(),
                    count,
                    self.items.len(),
                    self.has_more
                );
            }
            Err(e) => {
                tracing::warn!("Failed to fetch page {}: {}", cursor.page(), e);
            }
        }
    }
}
