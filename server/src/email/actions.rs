use std::{collections::BTreeMap, str::FromStr, time::Duration};

use futures::future::join_all;
use lib_email_clients::gmail::{LABEL_INBOX, LABEL_SPAM};
use strum::{Display, EnumString};

use crate::model::response::ItemResult;

use super::provider::{bounded, EmailClientError, LabelModification, MailProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BulkAction {
    Archive,
    Spam,
    Trash,
}

impl BulkAction {
    async fn apply<P: MailProvider>(
        self,
        provider: &P,
        message_id: &str,
    ) -> Result<(), EmailClientError> {
        match self {
            BulkAction::Archive => {
                provider
                    .modify_labels(
                        message_id,
                        LabelModification {
                            add: vec![],
                            remove: vec![LABEL_INBOX.to_string()],
                        },
                    )
                    .await
            }
            BulkAction::Spam => {
                provider
                    .modify_labels(
                        message_id,
                        LabelModification {
                            add: vec![LABEL_SPAM.to_string()],
                            remove: vec![LABEL_INBOX.to_string()],
                        },
                    )
                    .await
            }
            BulkAction::Trash => provider.trash_message(message_id).await,
        }
    }
}

/// One message and the action tag requested for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionItem {
    pub id: String,
    pub action: String,
}

impl ActionItem {
    pub fn batch(ids: Vec<String>, action: &str) -> Vec<ActionItem> {
        ids.into_iter()
            .map(|id| ActionItem {
                id,
                action: action.to_string(),
            })
            .collect()
    }
}

async fn run_item<P: MailProvider>(provider: &P, item: &ActionItem, timeout: Duration) -> ItemResult {
    let action = match BulkAction::from_str(&item.action) {
        Ok(action) => action,
        Err(_) => {
            tracing::warn!("Unknown action {:?} for message {}", item.action, item.id);
            return ItemResult::Failed {
                error: format!("Unknown action: {}", item.action),
            };
        }
    };

    match bounded(timeout, action.apply(provider, &item.id)).await {
        Ok(()) => ItemResult::Ok,
        Err(e) => {
            tracing::warn!("Failed to {action} message {}: {e}", item.id);
            ItemResult::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Applies every item concurrently. A failing item never affects its siblings.
pub async fn dispatch<P: MailProvider>(
    provider: &P,
    items: Vec<ActionItem>,
    timeout: Duration,
) -> BTreeMap<String, ItemResult> {
    let results = join_all(items.iter().map(|item| run_item(provider, item, timeout))).await;

    let outcome = items
        .into_iter()
        .map(|item| item.id)
        .zip(results)
        .collect::<BTreeMap<_, _>>();

    let failed = outcome
        .values()
        .filter(|r| matches!(r, ItemResult::Failed { .. }))
        .count();
    tracing::info!("Bulk action applied to {} messages, {failed} failed", outcome.len());

    outcome
}
