//! Gmail API quota units.
//!
//! Every method call consumes a fixed number of units from the per-user
//! budget of [`GMAIL_QUOTA_PER_SECOND`] units per second.

pub const GMAIL_QUOTA_PER_SECOND: usize = 250;

pub struct GmailApiQuota {
    pub get_profile: usize,
    pub messages_list: usize,
    pub messages_get: usize,
    pub messages_modify: usize,
    pub messages_trash: usize,
    pub messages_send: usize,
}

pub const GMAIL_API_QUOTA: GmailApiQuota = GmailApiQuota {
    get_profile: 1,
    messages_list: 5,
    messages_get: 5,
    messages_modify: 5,
    messages_trash: 5,
    messages_send: 100,
};
