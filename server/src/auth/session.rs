use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, AppResult},
    ServerState,
};

use super::{
    decode_session, encode_session, session_cookie, AuthError, Claims, TokenContext, TokenPair,
    SESSION_COOKIE,
};

/// Authenticated caller of a mailbox route.
///
/// Extraction fails with 401 before the handler runs when the session is
/// missing, forged, or expired beyond repair.
pub struct AuthSession {
    pub email: String,
    pub tokens: TokenContext,
    cookies: Cookies,
    session_ttl_secs: u64,
    secure_cookies: bool,
}

impl AuthSession {
    /// Writes a refreshed token pair back into the session cookie.
    pub async fn sync_cookie(&self) -> AppResult<()> {
        if !self.tokens.was_refreshed() {
            return Ok(());
        }
        let pair = self.tokens.snapshot().await;
        issue_session(
            &self.cookies,
            &self.email,
            &pair,
            self.session_ttl_secs,
            self.secure_cookies,
        )
    }
}

pub fn issue_session(
    cookies: &Cookies,
    email: &str,
    tokens: &TokenPair,
    ttl_secs: u64,
    secure: bool,
) -> AppResult<()> {
    let claims = Claims::seal(email, tokens, ttl_secs)?;
    let jwt = encode_session(&claims)?;
    cookies.add(session_cookie(jwt, secure));
    Ok(())
}

#[async_trait]
impl FromRequestParts<ServerState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;

        let jwt = match cookies.get(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
                .map_err(|_| AuthError::MissingCredentials)?,
        };

        let claims = decode_session(&jwt)?;
        let pair = claims.unseal().map_err(|e| {
            tracing::warn!("Could not decrypt session tokens: {e}");
            AuthError::InvalidToken
        })?;

        let tokens = TokenContext::new(
            state.http_client.clone(),
            state.config.gmail_config.clone(),
            pair,
        );
        // Repair or reject an expired session before any provider call
        tokens.access_token().await?;

        let session = AuthSession {
            email: claims.sub,
            tokens,
            cookies,
            session_ttl_secs: state.config.session_ttl_secs,
            secure_cookies: state.config.secure_cookies,
        };
        session.sync_cookie().await?;

        Ok(session)
    }
}
