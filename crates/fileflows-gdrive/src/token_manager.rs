//! OAuth access token provider with automatic refresh.
//!
//! Either hands out a fixed access token, or exchanges a refresh token for
//! access tokens at Google's token endpoint and caches them until shortly
//! before they expire.

use fileflows_core::RemoteError;
use tokio::sync::Mutex;
use tracing::{debug, info};

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Cached token with expiration.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => chrono::Utc::now() >= exp - chrono::Duration::minutes(5),
            None => true, // No expiration info → always refresh to be safe
        }
    }
}

#[derive(Debug, Clone)]
enum TokenSource {
    Static(String),
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

/// Supplies bearer tokens to the Drive client.
pub struct TokenManager {
    http: reqwest::Client,
    source: TokenSource,
    token_url: String,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    /// Always use the given access token.
    pub fn static_token(access_token: impl Into<String>) -> Self {
        Self::with_source(TokenSource::Static(access_token.into()))
    }

    /// Obtain access tokens with the refresh_token grant.
    pub fn refreshing(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self::with_source(TokenSource::Refresh {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        })
    }

    fn with_source(source: TokenSource) -> Self {
        Self {
            http: reqwest::Client::new(),
            source,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            cache: Mutex::new(None),
        }
    }

    /// Override the token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// The cache lock is held across the refresh so concurrent workers wait
    /// for one refresh instead of each issuing their own.
    pub async fn get_valid_token(&self) -> Result<String, RemoteError> {
        let (client_id, client_secret, refresh_token) = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Refresh {
                client_id,
                client_secret,
                refresh_token,
            } => (client_id, client_secret, refresh_token),
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if !cached.is_expired() {
                debug!("Token cache hit");
                return Ok(cached.access_token.clone());
            }
            debug!("Token expired, refreshing");
        }

        let refreshed = self
            .refresh_token(client_id, client_secret, refresh_token)
            .await?;
        let token = refreshed.access_token.clone();
        *cache = Some(refreshed);
        Ok(token)
    }

    /// Refresh an OAuth token using the refresh_token grant.
    async fn refresh_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<CachedToken, RemoteError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Auth(format!("token request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Auth(format!(
                "OAuth token refresh failed: {} {}",
                status, body
            )));
        }

        #[derive(serde::Deserialize)]
        struct RefreshResponse {
            access_token: String,
            expires_in: u64,
        }

        let token_resp: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Auth(format!("invalid token response: {}", e)))?;

        let expires_at =
            chrono::Utc::now() + chrono::Duration::seconds(token_resp.expires_in as i64);

        info!("Refreshed OAuth token, expires at {}", expires_at.to_rfc3339());

        Ok(CachedToken {
            access_token: token_resp.access_token,
            expires_at: Some(expires_at),
        })
    }
}
