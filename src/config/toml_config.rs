use crate::core::filter::FilterState;
use crate::domain::model::Category;
use crate::domain::ports::StoreConfigProvider;
use crate::utils::error::{FeedError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub store: StoreConfig,
    pub auth: Option<AuthConfig>,
    pub feed: Option<FeedDefaults>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_exhibition_table")]
    pub exhibition_table: String,
    #[serde(default = "default_bookmark_table")]
    pub bookmark_table: String,
    #[serde(default = "default_gallery_join")]
    pub gallery_join: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token: Option<String>,
    /// Fixed user for local runs, bypassing the auth endpoint.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedDefaults {
    pub category: Option<Category>,
    pub region: Option<String>,
    pub bookmark_only: Option<bool>,
    /// Incoming link to seed the bookmark toggle from.
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

fn default_exhibition_table() -> String {
    "exhibition".to_string()
}

fn default_bookmark_table() -> String {
    "bookmark".to_string()
}

fn default_gallery_join() -> String {
    "naver_gallery_url".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"))
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: Some(api_key.into()),
            exhibition_table: default_exhibition_table(),
            bookmark_table: default_bookmark_table(),
            gallery_join: default_gallery_join(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl StoreConfigProvider for StoreConfig {
    fn store_url(&self) -> &str {
        &self.url
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    fn exhibition_table(&self) -> &str {
        &self.exhibition_table
    }

    fn bookmark_table(&self) -> &str {
        &self.bookmark_table
    }

    fn gallery_join(&self) -> &str {
        &self.gallery_join
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl Validate for StoreConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("store.url", &self.url)?;
        let api_key = validation::validate_required_field("store.api_key", &self.api_key)?;
        validation::validate_non_empty_string("store.api_key", api_key)?;
        validation::validate_identifier("store.exhibition_table", &self.exhibition_table)?;
        validation::validate_identifier("store.bookmark_table", &self.bookmark_table)?;
        validation::validate_identifier("store.gallery_join", &self.gallery_join)?;
        validation::validate_positive_number("store.timeout_seconds", self.timeout_seconds, 1)?;
        Ok(())
    }
}

impl FeedConfig {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            auth: None,
            feed: None,
            logging: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FeedError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| FeedError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR}` from the environment. Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let name = &caps[1];
                std::env::var(name).unwrap_or_else(|_| format!("${{{}}}", name))
            })
            .into_owned()
    }

    /// Starting filter: the link decides the bookmark toggle, explicit keys override it.
    pub fn initial_filter(&self) -> Result<FilterState> {
        let Some(feed) = &self.feed else {
            return Ok(FilterState::default());
        };

        let mut filter = match &feed.link {
            Some(link) => FilterState::from_link(link)?,
            None => FilterState::default(),
        };
        if let Some(category) = feed.category {
            filter.set_category(category);
        }
        if let Some(region) = &feed.region {
            filter.set_region(region.as_str());
        }
        if let Some(bookmark_only) = feed.bookmark_only {
            filter.set_bookmark_only(bookmark_only);
        }
        Ok(filter)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.auth.as_ref()?.access_token.as_deref()
    }

    pub fn fixed_user(&self) -> Option<&str> {
        self.auth.as_ref()?.user_id.as_deref()
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref()?.level.as_deref()
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.json)
            .unwrap_or(false)
    }
}

impl Validate for FeedConfig {
    fn validate(&self) -> Result<()> {
        self.store.validate()?;

        if let Some(auth) = &self.auth {
            if let Some(token) = &auth.access_token {
                validation::validate_non_empty_string("auth.access_token", token)?;
            }
            if let Some(user_id) = &auth.user_id {
                validation::validate_non_empty_string("auth.user_id", user_id)?;
            }
        }

        if let Some(link) = self.feed.as_ref().and_then(|f| f.link.as_deref()) {
            validation::validate_url("feed.link", link)?;
        }

        if let Some(level) = self.log_level() {
            const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
            if !LEVELS.contains(&level) {
                return Err(FeedError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", LEVELS.join(", ")),
                });
            }
        }

        Ok(())
    }
}
