use crate::config::AppConfig;
use crate::models::{collect_pages, CommentChild, CommentSort, Listing, ListingQuery, MessageFeed, Message, Post, Thing};
use log::debug;
use reqwest::{Client, Error as ReqwestError};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

mod dispatch;

pub use dispatch::Dispatch;

pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Errors raised by the client, the controllers and the monitors
#[derive(Debug, Error)]
pub enum RedditClientError {
    #[error("Request error: {0}")]
    RequestError(#[from] ReqwestError),
    #[error("Reddit API error: {0}")]
    ApiError(String),
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Unrecognized feed '{0}'")]
    UnrecognizedFeed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
}

#[derive(Clone)]
pub struct RedditClient {
    pub client: Client,
    pub access_token: Option<String>,
    pub user_agent: String,
    api_base: String,
    auth_url: String,
}

impl RedditClient {
    pub fn new() -> Result<Self, RedditClientError> {
        Self::with_user_agent(default_user_agent())
    }

    pub fn with_user_agent(user_agent: String) -> Result<Self, RedditClientError> {
        Ok(Self {
            client: Self::get_client(&user_agent)?,
            access_token: None,
            user_agent,
            api_base: DEFAULT_API_BASE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
        })
    }

    /// Create a client from a configuration object
    pub fn from_config(config: &AppConfig) -> Result<Self, RedditClientError> {
        debug!(
            "Creating RedditClient with user_agent: {}",
            config.user_agent
        );
        let mut client = Self::with_user_agent(config.user_agent.clone())?;
        client.api_base = config.api_base.trim_end_matches('/').to_string();
        client.auth_url = config.auth_url.clone();

        // If we have a direct access token, use it
        if let Some(token) = &config.access_token {
            client.access_token = Some(token.clone());
        }

        Ok(client)
    }

    /// Point the client at another API host (used against mock servers)
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_auth_url(mut self, auth_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn get_client(user_agent: &str) -> Result<Client, RedditClientError> {
        Ok(Client::builder().user_agent(user_agent).build()?)
    }

    /// Make sure the client holds a user token.
    ///
    /// A token already present (from config or `with_access_token`) wins; otherwise the
    /// script-app password grant is used with the configured credentials.
    pub async fn authenticate(&mut self, config: &AppConfig) -> Result<(), RedditClientError> {
        if self.access_token.is_some() {
            debug!("Using access token supplied by configuration");
            return Ok(());
        }

        match (
            &config.client_id,
            &config.client_secret,
            &config.username,
            &config.password,
        ) {
            (Some(id), Some(secret), Some(user), Some(pass)) => {
                self.authenticate_with_api_credentials(id, secret, user, pass)
                    .await?;
                Ok(())
            }
            _ => Err(RedditClientError::AuthError(
                "No access token configured and script app credentials are incomplete \
                 (need REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET, REDDIT_USERNAME, REDDIT_PASSWORD)"
                    .to_string(),
            )),
        }
    }

    /// Authenticate with Reddit using API credentials for a script app.
    ///
    /// # Arguments
    /// * `client_id` - Your Reddit API client ID
    /// * `client_secret` - Your Reddit API client secret
    /// * `username` - Your Reddit username
    /// * `password` - Your Reddit password
    pub async fn authenticate_with_api_credentials(
        &mut self,
        client_id: &str,
        client_secret: &str,
        username: &str,
        password: &str,
    ) -> Result<String, RedditClientError> {
        let params = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("scope", "identity read privatemessages"),
        ];

        // For the Authorization header, use the client_id and client_secret
        let auth = base64::encode(format!("{}:{}", client_id, client_secret));

        let res = self
            .client
            .post(&self.auth_url)
            .header("Authorization", format!("Basic {}", auth))
            .form(&params)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await?;
            return Err(RedditClientError::AuthError(format!(
                "Authentication failed: HTTP {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = res.json().await?;

        if let Some(error) = json["error"].as_str() {
            return Err(RedditClientError::AuthError(format!(
                "Authentication failed: {}",
                error
            )));
        }

        let token = json["access_token"]
            .as_str()
            .ok_or_else(|| {
                RedditClientError::AuthError(
                    "Failed to extract access token from response".to_string(),
                )
            })?
            .to_string();

        self.access_token = Some(token.clone());
        debug!(
            "API authentication successful, token obtained with scopes: {:?}",
            json["scope"].as_str()
        );

        Ok(token)
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, RedditClientError> {
        let raw = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        Url::parse_with_params(&raw, query)
            .map_err(|e| RedditClientError::ApiError(format!("Invalid URL {}: {}", raw, e)))
    }

    /// GET a path under the API base and map the JSON body onto `T`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RedditClientError> {
        let url = self.endpoint(path, query)?;
        debug!("GET {}", url);

        let mut req_builder = self.client.get(url.clone());
        if let Some(token) = &self.access_token {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = req_builder.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RedditClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!("Response body length: {} bytes", body.len());

        serde_json::from_str::<T>(&body).map_err(|e| {
            debug!("Error parsing response from {}: {}", url, e);
            debug!("First 100 chars: {}", body.chars().take(100).collect::<String>());
            RedditClientError::ParseError(e)
        })
    }

    /// Fetch one page of a `Listing` of things
    pub async fn get_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListingQuery,
    ) -> Result<Listing<Thing<T>>, RedditClientError> {
        self.get_json(path, &query.to_pairs()).await
    }

    /// Fetch pages of a listing, following `after`, until `max_items` are collected
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: ListingQuery,
        max_items: usize,
    ) -> Result<Vec<T>, RedditClientError> {
        collect_pages(query, max_items, |page_query| async move {
            self.get_listing::<T>(path, &page_query).await
        })
        .await
    }

    /// Fetch new posts from a subreddit, following pagination up to `max_items`
    pub async fn fetch_new_posts(
        &self,
        subreddit: &str,
        query: ListingQuery,
        max_items: usize,
    ) -> Result<Vec<Post>, RedditClientError> {
        let subreddit = subreddit.strip_prefix("r/").unwrap_or(subreddit);
        self.list_all(&format!("r/{}/new", subreddit), query, max_items)
            .await
    }

    /// Fetch new posts from the front page, following pagination up to `max_items`
    pub async fn fetch_front_page_new(
        &self,
        query: ListingQuery,
        max_items: usize,
    ) -> Result<Vec<Post>, RedditClientError> {
        self.list_all("new", query, max_items).await
    }

    /// Fetch one page of a private message feed
    pub async fn fetch_messages(
        &self,
        feed: MessageFeed,
        query: &ListingQuery,
    ) -> Result<Listing<Thing<Message>>, RedditClientError> {
        self.get_listing(&format!("message/{}", feed.as_str()), query)
            .await
    }

    /// Fetch a post and its comment tree.
    ///
    /// `post_id` may be the bare base36 id or the `t3_` fullname.
    pub async fn fetch_comment_tree(
        &self,
        post_id: &str,
        sort: CommentSort,
        query: &ListingQuery,
    ) -> Result<(Listing<Thing<Post>>, Listing<CommentChild>), RedditClientError> {
        let post_id = post_id.strip_prefix("t3_").unwrap_or(post_id);
        let mut params = vec![
            ("sort", sort.as_str().to_string()),
            ("limit", query.limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(after) = &query.after {
            params.push(("after", after.clone()));
        }
        self.get_json(&format!("comments/{}", post_id), &params)
            .await
    }
}

fn default_user_agent() -> String {
    format!("redwatch/{}", env!("CARGO_PKG_VERSION"))
}
