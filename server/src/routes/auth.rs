use anyhow::Context;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use lib_email_clients::gmail::missing_mailbox_scopes;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_cookies::Cookies;

use crate::{
    auth::{expired_session_cookie, issue_session, AuthSession, TokenContext, TokenPair},
    email::EmailClient,
    error::{AppError, AppJsonResult, AppResult},
    model::{
        request::CallbackQuery,
        response::{
            GmailApiRefreshTokenResponse, GmailApiTokenResponse, SessionResponse, SuccessResponse,
        },
    },
    server_config::GmailConfig,
    HttpClient, ServerState,
};

pub async fn handler_auth_google(
    State(state): State<ServerState>,
) -> AppJsonResult<serde_json::Value> {
    let oauth = state.config.gmail()?;
    let GmailConfig {
        auth_uri,
        client_id,
        scopes,
        ..
    } = oauth;
    let redirect_uri = oauth
        .redirect_uri()
        .context("Google redirect uri is not configured")?;

    let req = state
        .http_client
        .get(auth_uri)
        .query(&[
            ("client_id", client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scopes.join(" ").as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ])
        .build()?;

    Ok(Json(json!({
        "url": req.url().to_string()
    })))
}

pub async fn handler_auth_callback(
    State(state): State<ServerState>,
    cookies: Cookies,
    Query(query): Query<CallbackQuery>,
) -> AppJsonResult<serde_json::Value> {
    if let Some(error) = query.error {
        return Err(AppError::Unauthorized(error));
    }
    let Some(code) = query.code else {
        return Err(AppError::BadRequest("Missing code".to_string()));
    };

    let oauth = state.config.gmail()?;
    let resp = exchange_code(&state.http_client, oauth, &code).await?;

    let missing = missing_mailbox_scopes(&resp.scope);
    if !missing.is_empty() {
        tracing::warn!("Login without required scopes: {:?}", missing);
        return Err(AppError::BadRequest(format!(
            "Missing required permissions: {}",
            missing
                .iter()
                .map(|s| s.as_url())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let tokens = TokenPair {
        access_token: resp.access_token,
        refresh_token: resp.refresh_token,
        expires_at: Utc::now() + Duration::seconds(resp.expires_in as i64),
    };

    let email_client = EmailClient::new(
        state.http_client.clone(),
        TokenContext::new(
            state.http_client.clone(),
            state.config.gmail_config.clone(),
            tokens.clone(),
        ),
        &state.config.gmail_api_base,
    );
    let profile = email_client
        .get_profile()
        .await
        .map_err(AppError::upstream("Failed to fetch profile"))?;
    let email = profile
        .email_address
        .context("Profile email not found. An email address is required")?;

    issue_session(
        &cookies,
        &email,
        &tokens,
        state.config.session_ttl_secs,
        state.config.secure_cookies,
    )?;
    tracing::info!("Signed in {email}");

    Ok(Json(json!({
        "message": "Login success",
        "email": email,
    })))
}

pub async fn handler_session(session: AuthSession) -> AppJsonResult<SessionResponse> {
    let tokens = session.tokens.snapshot().await;
    Ok(Json(SessionResponse {
        email: session.email,
        access_token_expires: tokens.expires_at.to_rfc3339(),
    }))
}

pub async fn handler_logout(cookies: Cookies) -> AppJsonResult<SuccessResponse> {
    cookies.remove(expired_session_cookie());
    Ok(Json(SuccessResponse::ok()))
}

async fn parse_token_response<T: DeserializeOwned>(resp: reqwest::Response) -> AppResult<T> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if !status.is_success() {
        tracing::error!("Token endpoint responded {status}: {body}");
        let error = body
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("token request failed");
        return Err(AppError::Unauthorized(error.to_string()));
    }

    serde_json::from_value(body.clone()).map_err(|_| {
        tracing::error!("Failed to parse token response: {:?}", body);
        AppError::BadRequest(body.to_string())
    })
}

pub async fn exchange_code(
    http_client: &HttpClient,
    oauth: &GmailConfig,
    code: &str,
) -> AppResult<GmailApiTokenResponse> {
    let redirect_uri = oauth
        .redirect_uri()
        .context("Google redirect uri is not configured")?;

    let resp = http_client
        .post(&oauth.token_uri)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    parse_token_response(resp).await
}

pub async fn exchange_refresh_token(
    http_client: &HttpClient,
    oauth: &GmailConfig,
    refresh_token: &str,
) -> AppResult<GmailApiRefreshTokenResponse> {
    let resp = http_client
        .post(&oauth.token_uri)
        .form(&[
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    parse_token_response(resp).await
}
