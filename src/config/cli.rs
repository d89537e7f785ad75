use crate::config::toml_config::{AuthConfig, FeedConfig, FeedDefaults, LoggingConfig, StoreConfig};
use crate::domain::model::{Category, ExhibitionId};
use crate::utils::error::{FeedError, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "exhibition-feed")]
#[command(about = "Browse the exhibition feed and manage bookmarks from the terminal")]
pub struct CliArgs {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "EXHIBITION_STORE_URL")]
    pub url: Option<String>,

    #[arg(long, env = "EXHIBITION_STORE_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "EXHIBITION_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Act as this user without contacting the auth endpoint
    #[arg(long)]
    pub user_id: Option<String>,

    /// Link to seed the bookmark toggle from (reads `isBookmark`)
    #[arg(long)]
    pub link: Option<String>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub region: Option<String>,

    /// Only show bookmarked exhibitions
    #[arg(long)]
    pub bookmarks: bool,

    /// Pages to load, including the first
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Toggle the bookmark on this exhibition before listing
    #[arg(long)]
    pub toggle: Option<ExhibitionId>,

    #[arg(long, help = "Print the region choices and exit")]
    pub list_regions: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliArgs {
    /// Builds the effective configuration: the file (if any) with flags layered on top.
    pub fn resolve_config(&self) -> Result<FeedConfig> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::from_file(path)?,
            None => {
                let url = self.url.clone().ok_or_else(|| FeedError::MissingConfigError {
                    field: "store.url (--url or --config)".to_string(),
                })?;
                FeedConfig::new(StoreConfig {
                    api_key: None,
                    ..StoreConfig::new(url, String::new())
                })
            }
        };

        if let Some(url) = &self.url {
            config.store.url = url.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.store.api_key = Some(api_key.clone());
        }

        if self.access_token.is_some() || self.user_id.is_some() {
            let auth = config.auth.get_or_insert_with(AuthConfig::default);
            if let Some(token) = &self.access_token {
                auth.access_token = Some(token.clone());
            }
            if let Some(user_id) = &self.user_id {
                auth.user_id = Some(user_id.clone());
            }
        }

        if self.link.is_some() || self.category.is_some() || self.region.is_some() || self.bookmarks
        {
            let feed = config.feed.get_or_insert_with(FeedDefaults::default);
            if let Some(link) = &self.link {
                feed.link = Some(link.clone());
            }
            if let Some(category) = self.category {
                feed.category = Some(category);
            }
            if let Some(region) = &self.region {
                feed.region = Some(region.clone());
            }
            if self.bookmarks {
                feed.bookmark_only = Some(true);
            }
        }

        if self.json_logs {
            config
                .logging
                .get_or_insert_with(LoggingConfig::default)
                .json = Some(true);
        }

        Ok(config)
    }
}
