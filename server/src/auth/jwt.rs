use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use lib_utils::{crypt, envs::get_env};
use serde::{Deserialize, Serialize};
use tower_cookies::{cookie::SameSite, Cookie};

use super::{AuthError, TokenPair};

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const SESSION_COOKIE: &str = "session";
const ISSUER: &str = "inbox-server";

static KEYS: LazyLock<Keys> = LazyLock::new(|| {
    let secret = get_env(JWT_SECRET_ENV).expect("JWT_SECRET must be set");
    Keys::new(&secret)
});

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_base64_secret(secret)
                .expect("Secret was invalid for encoding key"),
            decoding: DecodingKey::from_base64_secret(secret)
                .expect("Secret was invalid for decoding key"),
        }
    }
}

/// Session cookie payload. Provider tokens are encrypted since the JWT itself is only signed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub access_expires_at: i64,
}

impl Claims {
    pub fn seal(email: &str, tokens: &TokenPair, ttl_secs: u64) -> Result<Self, crypt::Error> {
        Ok(Claims {
            sub: email.to_string(),
            iss: ISSUER.to_string(),
            exp: Utc::now().timestamp() as usize + ttl_secs as usize,
            access_token: crypt::encrypt(&tokens.access_token)?,
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(crypt::encrypt)
                .transpose()?,
            access_expires_at: tokens.expires_at.timestamp(),
        })
    }

    pub fn unseal(&self) -> Result<TokenPair, crypt::Error> {
        Ok(TokenPair {
            access_token: crypt::decrypt(&self.access_token)?,
            refresh_token: self
                .refresh_token
                .as_deref()
                .map(crypt::decrypt)
                .transpose()?,
            expires_at: DateTime::from_timestamp(self.access_expires_at, 0).unwrap_or_default(),
        })
    }
}

pub(crate) fn encode_session(claims: &Claims) -> Result<String, AuthError> {
    jsonwebtoken::encode(&Header::default(), claims, &KEYS.encoding)
        .map_err(|_| AuthError::TokenCreation)
}

pub(crate) fn decode_session(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    jsonwebtoken::decode::<Claims>(token, &KEYS.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected session token: {e}");
            AuthError::InvalidToken
        })
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
