use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rows fetched per page. Fixed; `has_more` is derived from it.
pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExhibitionId(pub i64);

impl fmt::Display for ExhibitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExhibitionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ExhibitionId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exhibition {
    pub id: ExhibitionId,
    #[serde(alias = "name", default)]
    pub title: String,
    #[serde(alias = "date_range", default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(alias = "is_free", default)]
    pub is_free: bool,
    #[serde(alias = "is_recommended", default)]
    pub is_recommended: bool,
    #[serde(default)]
    pub gallery: Option<Gallery>,
}

impl Exhibition {
    pub fn gallery_address(&self) -> Option<&str> {
        self.gallery.as_ref().and_then(|g| g.address.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: UserId,
    /// Nullable in the store; such rows never count as bookmarked.
    pub exhibition_id: Option<ExhibitionId>,
    pub created_at: String,
}

impl Bookmark {
    pub fn new(user_id: UserId, exhibition_id: ExhibitionId) -> Self {
        Self {
            id: None,
            user_id,
            exhibition_id: Some(exhibition_id),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Free,
    Recommended,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Free => "free",
            Category::Recommended => "recommended",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Category::All),
            "free" => Ok(Category::Free),
            "recommended" => Ok(Category::Recommended),
            other => Err(format!(
                "unknown category '{}', expected all, free or recommended",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub access_token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            access_token: None,
        }
    }
}

/// "Not resolved yet" and "resolved to nobody" are different states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unresolved,
    Anonymous,
    Authenticated(Session),
}

impl SessionStatus {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionStatus::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.session().map(|s| &s.user_id)
    }
}

impl From<Option<Session>> for SessionStatus {
    fn from(value: Option<Session>) -> Self {
        match value {
            Some(session) => SessionStatus::Authenticated(session),
            None => SessionStatus::Anonymous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageCursor {
    page: u32,
}

impl PageCursor {
    pub fn first() -> Self {
        Self { page: 1 }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * PAGE_SIZE
    }

    pub fn limit(&self) -> usize {
        PAGE_SIZE
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub timeout: Option<std::time::Duration>,
}
