use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    auth::AuthSession,
    email::{
        actions::{dispatch, ActionItem, BulkAction},
        bounded,
        category::CategoryFilter,
        compose::Draft,
        listing::{list_page, PageRequest},
        message, EmailClient, MailProvider,
    },
    error::{AppError, AppJsonResult, AppResult},
    model::{
        request::{BulkActionRequest, BulkDeleteRequest, ListEmailsQuery, SendEmailRequest},
        response::{BulkActionResponse, EmailDetail, EmailPage, SuccessResponse},
    },
    ServerState,
};

fn email_client(state: &ServerState, session: &AuthSession) -> EmailClient {
    EmailClient::new(
        state.http_client.clone(),
        session.tokens.clone(),
        &state.config.gmail_api_base,
    )
}

/// Drops blank and repeated ids, keeping first-seen order.
fn require_ids(ids: Vec<String>) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let ids = ids
        .into_iter()
        .filter(|id| !id.trim().is_empty() && seen.insert(id.clone()))
        .collect::<Vec<_>>();
    if ids.is_empty() {
        return Err(AppError::BadRequest("No email IDs provided".to_string()));
    }
    Ok(ids)
}

pub async fn handler_list_emails(
    State(state): State<ServerState>,
    session: AuthSession,
    Query(query): Query<ListEmailsQuery>,
) -> AppJsonResult<EmailPage> {
    let filter = match query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(category) => category
            .parse::<CategoryFilter>()
            .map_err(|_| AppError::BadRequest(format!("Unknown category: {category}")))?,
        None => CategoryFilter::default(),
    };

    let client = email_client(&state, &session);
    let page = list_page(
        &client,
        &state.classifier,
        PageRequest {
            cursor: query.page_token,
            filter,
            page_size: state.config.page_size,
        },
        state.config.provider_timeout(),
    )
    .await;

    session.sync_cookie().await?;
    Ok(Json(page.map_err(AppError::upstream("Failed to fetch emails"))?))
}

pub async fn handler_get_email(
    State(state): State<ServerState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> AppJsonResult<EmailDetail> {
    let client = email_client(&state, &session);
    let raw = bounded(state.config.provider_timeout(), client.get_message(&id)).await;

    session.sync_cookie().await?;
    let raw = raw.map_err(AppError::upstream("Failed to fetch email"))?;
    Ok(Json(message::detail(raw, &id)))
}

pub async fn handler_bulk_action(
    State(state): State<ServerState>,
    session: AuthSession,
    Json(body): Json<BulkActionRequest>,
) -> AppJsonResult<BulkActionResponse> {
    let ids = require_ids(body.ids)?;
    let action = body
        .action
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required fields".to_string()))?;

    let client = email_client(&state, &session);
    let results = dispatch(
        &client,
        ActionItem::batch(ids, &action),
        state.config.provider_timeout(),
    )
    .await;

    session.sync_cookie().await?;
    Ok(Json(BulkActionResponse {
        success: true,
        results,
    }))
}

pub async fn handler_bulk_delete(
    State(state): State<ServerState>,
    session: AuthSession,
    Json(body): Json<BulkDeleteRequest>,
) -> AppJsonResult<BulkActionResponse> {
    let ids = require_ids(body.ids)?;

    let client = email_client(&state, &session);
    let results = dispatch(
        &client,
        ActionItem::batch(ids, &BulkAction::Trash.to_string()),
        state.config.provider_timeout(),
    )
    .await;

    session.sync_cookie().await?;
    Ok(Json(BulkActionResponse {
        success: true,
        results,
    }))
}

pub async fn handler_send_email(
    State(state): State<ServerState>,
    session: AuthSession,
    Json(body): Json<SendEmailRequest>,
) -> AppJsonResult<SuccessResponse> {
    let draft = Draft::new(body.to, body.subject, body.content)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let client = email_client(&state, &session);
    let sent = bounded(state.config.provider_timeout(), client.send_raw(&draft.to_raw())).await;

    session.sync_cookie().await?;
    let sent = sent.map_err(AppError::upstream("Failed to send email"))?;
    tracing::info!("Sent message {:?}", sent.id);
    Ok(Json(SuccessResponse::ok()))
}
