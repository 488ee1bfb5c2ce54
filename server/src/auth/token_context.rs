use std::sync::{
    atomic::{AtomicBool, Ordering::Relaxed},
    Arc,
};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::{routes::auth::exchange_refresh_token, server_config::GmailConfig, HttpClient};

use super::AuthError;

/// Access tokens this close to expiry are treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= self.expires_at
    }
}

/// Credential handle threaded into every provider call of one request.
///
/// Clones share the same pair, so a refresh performed by one in-flight call
/// is seen by its siblings.
#[derive(Clone)]
pub struct TokenContext {
    http_client: HttpClient,
    oauth: Option<Arc<GmailConfig>>,
    pair: Arc<RwLock<TokenPair>>,
    refreshed: Arc<AtomicBool>,
}

impl TokenContext {
    pub fn new(http_client: HttpClient, oauth: Option<Arc<GmailConfig>>, pair: TokenPair) -> Self {
        Self {
            http_client,
            oauth,
            pair: Arc::new(RwLock::new(pair)),
            refreshed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns an unexpired access token, refreshing it first if needed.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let current = {
            let pair = self.pair.read().await;
            if !pair.is_expired() {
                return Ok(pair.access_token.clone());
            }
            pair.access_token.clone()
        };

        tracing::info!("Access token expired, refreshing");
        self.refresh_after_rejection(&current).await
    }

    /// Refreshes the pair unless another caller already replaced `stale`.
    pub async fn refresh_after_rejection(&self, stale: &str) -> Result<String, AuthError> {
        let mut pair = self.pair.write().await;
        if pair.access_token != stale {
            return Ok(pair.access_token.clone());
        }

        let refresh_token = pair.refresh_token.clone().ok_or(AuthError::Expired)?;
        let oauth = self.oauth.as_ref().ok_or(AuthError::RefreshFailed)?;

        let resp = exchange_refresh_token(&self.http_client, oauth, &refresh_token)
            .await
            .map_err(|e| {
                tracing::error!("Error refreshing token: {:?}", e);
                AuthError::RefreshFailed
            })?;

        pair.access_token = resp.access_token;
        pair.expires_at = Utc::now() + Duration::seconds(resp.expires_in as i64);
        if let Some(rotated) = resp.refresh_token {
            pair.refresh_token = Some(rotated);
        }
        self.refreshed.store(true, Relaxed);

        Ok(pair.access_token.clone())
    }

    pub fn was_refreshed(&self) -> bool {
        self.refreshed.load(Relaxed)
    }

    pub async fn snapshot(&self) -> TokenPair {
        self.pair.read().await.clone()
    }
}
