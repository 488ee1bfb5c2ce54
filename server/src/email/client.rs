use std::{sync::Arc, time::Duration};

use google_gmail1::api::{ListMessagesResponse, Message, Profile};
use leaky_bucket::RateLimiter;
use lib_email_clients::gmail::api_quota::{GMAIL_API_QUOTA, GMAIL_QUOTA_PER_SECOND};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::json;

use crate::{auth::TokenContext, HttpClient};

use super::provider::{
    EmailClientError, EmailClientResult, LabelModification, MailProvider, MessageListOptions,
};

pub const GMAIL_ENDPOINT: &str = "https://www.googleapis.com/gmail/v1/users/me";

macro_rules! gmail_url {
    ($base:expr; $($params:expr),*) => {
        {
            let list_params: Vec<&str> = vec![$($params),*];
            let path = list_params.join("/");
            format!("{}/{}", $base.trim_end_matches('/'), path)
        }
    };
}

/// Gmail REST client scoped to one signed-in user for one request.
#[derive(Clone)]
pub struct EmailClient {
    http_client: HttpClient,
    tokens: TokenContext,
    api_base: String,
    rate_limiter: Arc<RateLimiter>,
}

impl EmailClient {
    pub fn new(http_client: HttpClient, tokens: TokenContext, api_base: impl Into<String>) -> Self {
        let rate_limiter = RateLimiter::builder()
            .initial(GMAIL_QUOTA_PER_SECOND)
            .max(GMAIL_QUOTA_PER_SECOND)
            .interval(Duration::from_secs(1))
            .refill(GMAIL_QUOTA_PER_SECOND)
            .build();

        EmailClient {
            http_client,
            tokens,
            api_base: api_base.into(),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Sends the request built by `build`, retrying once with a refreshed
    /// token if Gmail rejects the current one.
    async fn send_authorized<F>(&self, quota: usize, build: F) -> EmailClientResult<Response>
    where
        F: Fn(&str) -> RequestBuilder + Send,
    {
        self.rate_limiter.acquire(quota).await;

        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|_| EmailClientError::Unauthorized)?;
        let mut resp = build(&token).send().await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("Access token rejected by Gmail, refreshing and retrying");
            let token = self
                .tokens
                .refresh_after_rejection(&token)
                .await
                .map_err(|_| EmailClientError::Unauthorized)?;
            resp = build(&token).send().await?;
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!("Gmail responded {status}: {body}");
            return Err(EmailClientError::from_status(status, body));
        }

        Ok(resp)
    }

    pub async fn get_profile(&self) -> EmailClientResult<Profile> {
        let url = gmail_url!(self.api_base; "profile");
        let resp = self
            .send_authorized(GMAIL_API_QUOTA.get_profile, |token| {
                self.http_client.get(&url).bearer_auth(token)
            })
            .await?;

        Ok(resp.json::<Profile>().await?)
    }
}

impl MailProvider for EmailClient {
    async fn list_messages(
        &self,
        options: MessageListOptions,
    ) -> EmailClientResult<ListMessagesResponse> {
        let mut query = vec![
            ("q".to_string(), options.query),
            ("maxResults".to_string(), options.max_results.to_string()),
        ];
        if let Some(token) = options.page_token {
            query.push(("pageToken".to_string(), token));
        }
        for label in options.label_ids {
            query.push(("labelIds".to_string(), label));
        }

        let url = gmail_url!(self.api_base; "messages");
        let resp = self
            .send_authorized(GMAIL_API_QUOTA.messages_list, |token| {
                self.http_client.get(&url).query(&query).bearer_auth(token)
            })
            .await?;

        Ok(resp.json::<ListMessagesResponse>().await?)
    }

    async fn get_message(&self, message_id: &str) -> EmailClientResult<Message> {
        let url = gmail_url!(self.api_base; "messages", message_id);
        let resp = self
            .send_authorized(GMAIL_API_QUOTA.messages_get, |token| {
                self.http_client
                    .get(&url)
                    .query(&[("format", "full")])
                    .bearer_auth(token)
            })
            .await?;

        Ok(resp.json::<Message>().await?)
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        modification: LabelModification,
    ) -> EmailClientResult<()> {
        let url = gmail_url!(self.api_base; "messages", message_id, "modify");
        let body = json!({
            "addLabelIds": modification.add,
            "removeLabelIds": modification.remove,
        });
        self.send_authorized(GMAIL_API_QUOTA.messages_modify, |token| {
            self.http_client.post(&url).json(&body).bearer_auth(token)
        })
        .await?;

        Ok(())
    }

    async fn trash_message(&self, message_id: &str) -> EmailClientResult<()> {
        let url = gmail_url!(self.api_base; "messages", message_id, "trash");
        self.send_authorized(GMAIL_API_QUOTA.messages_trash, |token| {
            self.http_client.post(&url).bearer_auth(token)
        })
        .await?;

        Ok(())
    }

    async fn send_raw(&self, raw: &str) -> EmailClientResult<Message> {
        let url = gmail_url!(self.api_base; "messages", "send");
        let body = json!({ "raw": raw });
        let resp = self
            .send_authorized(GMAIL_API_QUOTA.messages_send, |token| {
                self.http_client.post(&url).json(&body).bearer_auth(token)
            })
            .await?;

        Ok(resp.json::<Message>().await?)
    }
}
