pub mod bookmarks;
pub mod controller;
pub mod feed;
pub mod filter;
pub mod session;

pub use crate::domain::model::{Category, Exhibition, ExhibitionId, Session, SessionStatus};
pub use crate::domain::ports::{
    BookmarkRepository, ExhibitionStore, Notifier, SessionSource, StoreConfigProvider,
};
pub use crate::utils::error::Result;
