use crate::domain::model::{Bookmark, Exhibition, ExhibitionId, PageCursor, Session};
use crate::domain::ports::{BookmarkRepository, ExhibitionStore, SessionSource, StoreConfigProvider};
use crate::domain::query::{ExhibitionQuery, Predicate};
use crate::utils::error::{FeedError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: String,
    #[serde(default)]
    hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

fn base_url(store_url: &str) -> Result<Url> {
    let mut base = Url::parse(store_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn build_client(timeout_seconds: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?)
}

/// Turns a non-2xx response into [`FeedError::RemoteError`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<PostgrestErrorBody>(&body) {
        Ok(PostgrestErrorBody {
            message,
            hint: Some(hint),
        }) => format!("{} ({})", message, hint),
        Ok(parsed) => parsed.message,
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body,
    };
    Err(FeedError::remote(status.as_u16(), message))
}

/// Query string for one page of `query`, in PostgREST filter syntax.
pub fn page_params(
    query: &ExhibitionQuery,
    cursor: PageCursor,
    gallery_join: &str,
) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        format!("*,gallery:{}(*)", gallery_join),
    )];

    for predicate in query.predicates() {
        let (column, filter) = match predicate {
            Predicate::GalleryPresent => ("gallery".to_string(), "not.is.null".to_string()),
            Predicate::IsFree => ("isFree".to_string(), "eq.true".to_string()),
            Predicate::IsRecommended => ("isRecommended".to_string(), "eq.true".to_string()),
            Predicate::AddressContains(region) => {
                ("gallery.address".to_string(), format!("ilike.%{}%", region))
            }
            Predicate::IdIn(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                ("id".to_string(), format!("in.({})", ids.join(",")))
            }
        };
        params.push((column, filter));
    }

    params.push(("offset".to_string(), cursor.offset().to_string()));
    params.push(("limit".to_string(), cursor.limit().to_string()));
    params
}

/// Exhibition and bookmark tables behind a PostgREST endpoint (`/rest/v1`).
pub struct PostgrestStore<C: StoreConfigProvider> {
    config: C,
    client: Client,
    base: Url,
}

impl<C: StoreConfigProvider> PostgrestStore<C> {
    pub fn new(config: C) -> Result<Self> {
        let base = base_url(config.store_url())?;
        let client = build_client(config.timeout_seconds())?;
        Ok(Self {
            config,
            client,
            base,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        Ok(self.base.join(&format!("rest/v1/{}", table))?)
    }

    /// Adds `apikey` and a bearer token: the user's when signed in, else the API key.
    fn authorize(&self, request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        let token = session
            .and_then(|s| s.access_token.as_deref())
            .unwrap_or_else(|| self.config.api_key());
        request
            .header("apikey", self.config.api_key())
            .bearer_auth(token)
    }
}

#[async_trait]
impl<C: StoreConfigProvider + 'static> ExhibitionStore for PostgrestStore<C> {
    async fn fetch_page(
        &self,
        query: &ExhibitionQuery,
        cursor: PageCursor,
        session: Option<&Session>,
    ) -> Result<Vec<Exhibition>> {
        let mut url = self.table_url(self.config.exhibition_table())?;
        url.query_pairs_mut()
            .extend_pairs(page_params(query, cursor, self.config.gallery_join()));

        tracing::debug!("Fetching page {} from: {}", cursor.page(), url);
        let response = self
            .authorize(self.client.get(url), session)
            .send()
            .await?;
        tracing::debug!("Store response status: {}", response.status());

        let rows: Vec<Exhibition> = check_status(response).await?.json().await?;
        tracing::debug!("Page {} returned {} rows", cursor.page(), rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl<C: StoreConfigProvider + 'static> BookmarkRepository for PostgrestStore<C> {
    async fn list(&self, session: &Session) -> Result<Vec<Bookmark>> {
        let mut url = self.table_url(self.config.bookmark_table())?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", session.user_id));

        tracing::debug!("Listing bookmarks from: {}", url);
        let response = self
            .authorize(self.client.get(url), Some(session))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn insert(&self, session: &Session, bookmark: &Bookmark) -> Result<Bookmark> {
        let url = self.table_url(self.config.bookmark_table())?;

        tracing::debug!("Inserting bookmark for exhibition {:?}", bookmark.exhibition_id);
        let response = self
            .authorize(self.client.post(url), Some(session))
            .header("Prefer", "return=representation")
            .json(bookmark)
            .send()
            .await?;
        let status = response.status().as_u16();
        let mut rows: Vec<Bookmark> = check_status(response).await?.json().await?;

        if rows.is_empty() {
            return Err(FeedError::remote(status, "insert returned no row"));
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete(&self, session: &Session, exhibition_id: ExhibitionId) -> Result<()> {
        let mut url = self.table_url(self.config.bookmark_table())?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", session.user_id))
            .append_pair("exhibition_id", &format!("eq.{}", exhibition_id));

        tracing::debug!("Deleting bookmark: {}", url);
        let response = self
            .authorize(self.client.delete(url), Some(session))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Looks up the signed-in user behind an access token (`/auth/v1/user`).
pub struct SupabaseAuth<C: StoreConfigProvider> {
    config: C,
    client: Client,
    base: Url,
    access_token: Option<String>,
}

impl<C: StoreConfigProvider> SupabaseAuth<C> {
    pub fn new(config: C, access_token: Option<String>) -> Result<Self> {
        let base = base_url(config.store_url())?;
        let client = build_client(config.timeout_seconds())?;
        Ok(Self {
            config,
            client,
            base,
            access_token,
        })
    }
}

#[async_trait]
impl<C: StoreConfigProvider + 'static> SessionSource for SupabaseAuth<C> {
    async fn get_session(&self) -> Result<Option<Session>> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(None);
        };

        let url = self.base.join("auth/v1/user")?;
        tracing::debug!("Resolving session from: {}", url);
        let response = self
            .client
            .get(url)
            .header("apikey", self.config.api_key())
            .bearer_auth(token)
            .send()
            .await?;

        if matches!(response.status().as_u16(), 401 | 403) {
            tracing::info!("Access token rejected, treating session as anonymous");
            return Ok(None);
        }

        let user: AuthUser = check_status(response).await?.json().await?;
        Ok(Some(Session {
            user_id: user.id.as_str().into(),
            access_token: Some(token.to_string()),
        }))
    }
}
