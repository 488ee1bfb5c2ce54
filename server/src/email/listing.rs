use std::time::Duration;

use futures::future::join_all;
use lib_email_clients::gmail::{CATEGORY_PERSONAL, LABEL_INBOX};

use crate::model::response::{EmailPage, MessageSummary};

use super::{
    category::{Category, CategoryFilter, Classifier},
    message::summarize,
    provider::{bounded, EmailClientResult, MailProvider, MessageListOptions},
};

pub const INBOX_QUERY: &str = "in:inbox";

/// One page listing request
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub filter: CategoryFilter,
    pub page_size: u32,
}

impl PageRequest {
    fn list_options(&self) -> MessageListOptions {
        let label_ids = match self.filter.category() {
            Some(Category::Primary) => {
                vec![LABEL_INBOX.to_string(), CATEGORY_PERSONAL.to_string()]
            }
            _ => vec![],
        };

        MessageListOptions {
            page_token: self.cursor.clone(),
            max_results: self.page_size,
            query: INBOX_QUERY.to_string(),
            label_ids,
        }
    }
}

/// Fetches and classifies a single message, bounded by `timeout`.
pub async fn fetch_summary<P: MailProvider>(
    provider: &P,
    classifier: &Classifier,
    message_id: &str,
    timeout: Duration,
) -> EmailClientResult<MessageSummary> {
    let message = bounded(timeout, provider.get_message(message_id)).await?;

    Ok(summarize(message, message_id, classifier))
}

/// Lists one inbox page, fetching every message concurrently.
///
/// Messages that fail to fetch are dropped and counted in `failed_count`;
/// only a failure of the listing call itself fails the page. Kept messages
/// stay in provider order.
pub async fn list_page<P: MailProvider>(
    provider: &P,
    classifier: &Classifier,
    request: PageRequest,
    timeout: Duration,
) -> EmailClientResult<EmailPage> {
    let listing = bounded(timeout, provider.list_messages(request.list_options())).await?;

    let ids = listing
        .messages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| m.id)
        .collect::<Vec<_>>();

    let results = join_all(
        ids.iter()
            .map(|id| fetch_summary(provider, classifier, id, timeout)),
    )
    .await;

    let mut failed_count = 0;
    let emails = ids
        .iter()
        .zip(results)
        .filter_map(|(id, result)| match result {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("Dropping message {id} from page: {e}");
                failed_count += 1;
                None
            }
        })
        .filter(|summary| request.filter.matches(summary.category))
        .collect::<Vec<_>>();

    tracing::debug!(
        "Listed {} of {} messages ({failed_count} failed) for {:?}",
        emails.len(),
        ids.len(),
        request.filter
    );

    Ok(EmailPage {
        emails,
        next_page_token: listing.next_page_token,
        failed_count,
    })
}
