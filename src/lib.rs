pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::toml_config::{FeedConfig, StoreConfig};

pub use core::controller::{FeedController, FeedDependencies};
pub use core::feed::{EmptyReason, FeedSnapshot, FeedStatus};
pub use core::filter::{FilterChange, FilterState};
pub use utils::error::{FeedError, Result};
