use std::{future::Future, time::Duration};

use derive_more::Display;
use google_gmail1::api::{ListMessagesResponse, Message};
use reqwest::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum EmailClientError {
    #[display("access token rejected by the mail provider")]
    Unauthorized,
    #[display("message not found")]
    NotFound,
    #[display("rate limit exceeded")]
    RateLimitExceeded,
    #[display("bad request: {_0}")]
    BadRequest(String),
    #[display("request timed out")]
    Timeout,
    #[display("malformed response: {_0}")]
    Malformed(String),
    #[display("unexpected error: {_0}")]
    Unknown(String),
}

impl std::error::Error for EmailClientError {}

pub type EmailClientResult<T> = Result<T, EmailClientError>;

impl EmailClientError {
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => EmailClientError::Unauthorized,
            StatusCode::NOT_FOUND => EmailClientError::NotFound,
            StatusCode::TOO_MANY_REQUESTS => EmailClientError::RateLimitExceeded,
            StatusCode::BAD_REQUEST => EmailClientError::BadRequest(body),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                EmailClientError::Timeout
            }
            _ => EmailClientError::Unknown(format!("{status}: {body}")),
        }
    }
}

impl From<reqwest::Error> for EmailClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            EmailClientError::Timeout
        } else if error.is_decode() {
            EmailClientError::Malformed(error.to_string())
        } else if let Some(status) = error.status() {
            EmailClientError::from_status(status, error.to_string())
        } else {
            EmailClientError::Unknown(error.to_string())
        }
    }
}

/// Runs a provider call, failing with [`EmailClientError::Timeout`] once `timeout` elapses.
pub async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = EmailClientResult<T>>,
) -> EmailClientResult<T> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(EmailClientError::Timeout))
}

/// Filter and paging options for message list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageListOptions {
    pub page_token: Option<String>,
    pub max_results: u32,
    /// Gmail search query, e.g. `in:inbox`
    pub query: String,
    pub label_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelModification {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// Operations the listing pipeline and the bulk dispatcher need from a hosted mailbox.
pub trait MailProvider: Sync {
    fn list_messages(
        &self,
        options: MessageListOptions,
    ) -> impl Future<Output = EmailClientResult<ListMessagesResponse>> + Send;

    fn get_message(
        &self,
        message_id: &str,
    ) -> impl Future<Output = EmailClientResult<Message>> + Send;

    fn modify_labels(
        &self,
        message_id: &str,
        modification: LabelModification,
    ) -> impl Future<Output = EmailClientResult<()>> + Send;

    fn trash_message(&self, message_id: &str)
        -> impl Future<Output = EmailClientResult<()>> + Send;

    /// Sends a base64url encoded RFC 2822 message
    fn send_raw(&self, raw: &str) -> impl Future<Output = EmailClientResult<Message>> + Send;
}
