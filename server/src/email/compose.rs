use base64::{engine::general_purpose::STANDARD, Engine};
use derive_more::Display;
use lib_utils::b64::b64u_encode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ComposeError {
    #[display("Missing required fields")]
    MissingFields,
    #[display("Header fields must not contain line breaks")]
    HeaderInjection,
}

impl std::error::Error for ComposeError {}

/// Outgoing HTML message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Draft {
    /// Checks that every field is present and the header fields are single line.
    pub fn new(
        to: Option<String>,
        subject: Option<String>,
        content: Option<String>,
    ) -> Result<Self, ComposeError> {
        let present = |field: Option<String>| field.filter(|f| !f.trim().is_empty());
        let (Some(to), Some(subject), Some(html)) = (present(to), present(subject), present(content))
        else {
            return Err(ComposeError::MissingFields);
        };

        if [&to, &subject].iter().any(|f| f.contains(['\r', '\n'])) {
            return Err(ComposeError::HeaderInjection);
        }

        Ok(Draft {
            to: to.trim().to_string(),
            subject,
            html,
        })
    }

    pub fn to_mime(&self) -> String {
        [
            "Content-Type: text/html; charset=utf-8".to_string(),
            "MIME-Version: 1.0".to_string(),
            format!("To: {}", self.to),
            "From: me".to_string(),
            format!("Subject: {}", encode_header(&self.subject)),
            String::new(),
            self.html.clone(),
        ]
        .join("\r\n")
    }

    /// base64url without padding, as `messages.send` expects in `raw`
    pub fn to_raw(&self) -> String {
        b64u_encode(self.to_mime())
    }
}

/// RFC 2047 `B` encoding for non-ASCII header values
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}
