use chrono::{DateTime, Utc};
use google_gmail1::api::{Message, MessagePart};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::response::{EmailDetail, MessageSummary};

use super::category::{Classifier, MessageTraits};

pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const UNKNOWN_RECIPIENT: &str = "Unknown Recipient";
pub const NO_SUBJECT: &str = "No Subject";

/// Case-insensitive lookup of a top-level header
pub fn header<'a>(message: &'a Message, name: &str) -> Option<&'a str> {
    message
        .payload
        .as_ref()?
        .headers
        .as_ref()?
        .iter()
        .find(|h| {
            h.name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.value.as_deref())
}

/// Normalizes a `Date` header to RFC 3339, falling back to `internalDate`, then now.
pub fn message_date(message: &Message) -> String {
    static RE_TRAILING_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

    let from_header = header(message, "Date").and_then(|raw| {
        DateTime::parse_from_rfc2822(raw.trim())
            .or_else(|_| DateTime::parse_from_rfc2822(&RE_TRAILING_COMMENT.replace(raw, "")))
            .ok()
            .map(|d| d.with_timezone(&Utc))
    });

    from_header
        .or_else(|| message.internal_date.and_then(DateTime::from_timestamp_millis))
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

fn sanitize_snippet(snippet: &str) -> String {
    static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\t\n]+").unwrap());
    static RE_LONG_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

    let s = decode_entities(snippet);
    let s = RE_WHITESPACE.replace_all(&s, " ");
    let s = RE_LONG_SPACE.replace_all(&s, " ");
    s.trim().to_string()
}

/// Gmail snippets carry the handful of HTML entities below
fn decode_entities(s: &str) -> String {
    s.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn summarize(message: Message, fallback_id: &str, classifier: &Classifier) -> MessageSummary {
    let labels = message.label_ids.clone().unwrap_or_default();
    let raw_from = header(&message, "From").unwrap_or_default();
    let raw_subject = header(&message, "Subject").unwrap_or_default();

    let category = classifier.classify(&MessageTraits {
        labels: &labels,
        from: raw_from,
        subject: raw_subject,
    });

    let from = non_empty_or(raw_from, UNKNOWN_SENDER);
    let subject = non_empty_or(raw_subject, NO_SUBJECT);
    let date = message_date(&message);
    let snippet = sanitize_snippet(message.snippet.as_deref().unwrap_or_default());

    MessageSummary {
        id: message.id.unwrap_or_else(|| fallback_id.to_string()),
        from,
        subject,
        date,
        snippet,
        category,
        labels,
    }
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn part_data(part: &MessagePart) -> Option<&[u8]> {
    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .filter(|data| !data.is_empty())
}

/// Depth first search for the first part of `mime_type` that carries data
fn find_part<'a>(part: &'a MessagePart, mime_type: &str) -> Option<&'a [u8]> {
    let is_match = part
        .mime_type
        .as_deref()
        .is_some_and(|m| m.eq_ignore_ascii_case(mime_type));
    if is_match {
        if let Some(data) = part_data(part) {
            return Some(data);
        }
    }

    part.parts
        .iter()
        .flatten()
        .find_map(|child| find_part(child, mime_type))
}

fn text_to_html(data: &[u8]) -> String {
    escape_html(&String::from_utf8_lossy(data))
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

/// HTML part verbatim, else the plain text part (or the payload body) with line breaks.
pub fn render_body(message: &Message) -> String {
    let Some(payload) = message.payload.as_ref() else {
        return String::new();
    };

    if let Some(html) = find_part(payload, "text/html") {
        return String::from_utf8_lossy(html).into_owned();
    }
    if let Some(text) = find_part(payload, "text/plain") {
        return text_to_html(text);
    }
    part_data(payload).map(text_to_html).unwrap_or_default()
}

pub fn detail(message: Message, fallback_id: &str) -> EmailDetail {
    EmailDetail {
        from: non_empty_or(header(&message, "From").unwrap_or_default(), UNKNOWN_SENDER),
        to: non_empty_or(header(&message, "To").unwrap_or_default(), UNKNOWN_RECIPIENT),
        subject: non_empty_or(header(&message, "Subject").unwrap_or_default(), NO_SUBJECT),
        date: message_date(&message),
        body: render_body(&message),
        id: message.id.unwrap_or_else(|| fallback_id.to_string()),
    }
}
