use std::{fmt, str::FromStr};

pub const LABEL_INBOX: &str = "INBOX";
pub const LABEL_SPAM: &str = "SPAM";

pub const CATEGORY_PERSONAL: &str = "CATEGORY_PERSONAL";
/// Not a documented Gmail category, but some clients tag primary mail with it.
pub const CATEGORY_INBOX: &str = "CATEGORY_INBOX";
pub const CATEGORY_SOCIAL: &str = "CATEGORY_SOCIAL";
pub const CATEGORY_PROMOTIONS: &str = "CATEGORY_PROMOTIONS";
pub const CATEGORY_UPDATES: &str = "CATEGORY_UPDATES";
pub const CATEGORY_FORUMS: &str = "CATEGORY_FORUMS";

/// Scopes requested at login: identity plus read, send and modify access to the mailbox.
pub const LOGIN_SCOPES: [&str; 6] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.modify",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScopes {
    AllGmail,
    Compose,
    Labels,
    Metadata,
    Modify,
    Readonly,
    Send,
}

impl AccessScopes {
    pub fn as_url(&self) -> &'static str {
        match self {
            AccessScopes::AllGmail => "https://mail.google.com/",
            AccessScopes::Compose => "https://www.googleapis.com/auth/gmail.compose",
            AccessScopes::Labels => "https://www.googleapis.com/auth/gmail.labels",
            AccessScopes::Metadata => "https://www.googleapis.com/auth/gmail.metadata",
            AccessScopes::Modify => "https://www.googleapis.com/auth/gmail.modify",
            AccessScopes::Readonly => "https://www.googleapis.com/auth/gmail.readonly",
            AccessScopes::Send => "https://www.googleapis.com/auth/gmail.send",
        }
    }
}

impl FromStr for AccessScopes {
    type Err = AccessScopesParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "https://mail.google.com/" => Ok(AccessScopes::AllGmail),
            "https://www.googleapis.com/auth/gmail.compose" => Ok(AccessScopes::Compose),
            "https://www.googleapis.com/auth/gmail.labels" => Ok(AccessScopes::Labels),
            "https://www.googleapis.com/auth/gmail.metadata" => Ok(AccessScopes::Metadata),
            "https://www.googleapis.com/auth/gmail.modify" => Ok(AccessScopes::Modify),
            "https://www.googleapis.com/auth/gmail.readonly" => Ok(AccessScopes::Readonly),
            "https://www.googleapis.com/auth/gmail.send" => Ok(AccessScopes::Send),
            _ => Err(AccessScopesParseError),
        }
    }
}

#[derive(Debug)]
pub struct AccessScopesParseError;

impl fmt::Display for AccessScopesParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid access scope")
    }
}

impl std::error::Error for AccessScopesParseError {}

/// Gmail scopes from a space separated grant that the mailbox routes need but were not granted.
pub fn missing_mailbox_scopes(granted: &str) -> Vec<AccessScopes> {
    let granted = granted
        .split(' ')
        .filter_map(|s| AccessScopes::from_str(s).ok())
        .collect::<Vec<_>>();

    if granted.contains(&AccessScopes::AllGmail) {
        return vec![];
    }

    [AccessScopes::Readonly, AccessScopes::Send, AccessScopes::Modify]
        .into_iter()
        .filter(|required| {
            !(granted.contains(required)
                || (*required == AccessScopes::Readonly && granted.contains(&AccessScopes::Modify)))
        })
        .collect()
}
