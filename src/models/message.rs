use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::Identity;
use crate::client::RedditClientError;

/// A private message, or a comment reply delivered to the inbox (`was_comment`)
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    /// Fullname, e.g. `t4_2a1b3c`
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_utc: f64,
    /// Unread flag
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub was_comment: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub first_message_name: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub distinguished: Option<String>,
}

impl Identity for Message {
    fn identity(&self) -> &str {
        &self.name
    }
}

impl Message {
    /// One-line summary for console output
    pub fn format_short_summary(&self) -> String {
        let from = self.author.as_deref().unwrap_or("[deleted]");
        let marker = if self.new { "*" } else { " " };
        let kind = if self.was_comment { "reply" } else { "pm" };
        format!(
            "{} {} [{}] {} - from u/{}",
            marker, self.name, kind, self.subject, from
        )
    }
}

/// The three private message feeds Reddit exposes under `/message/{where}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFeed {
    Inbox,
    Unread,
    Sent,
}

impl MessageFeed {
    pub const ALL: [MessageFeed; 3] = [MessageFeed::Inbox, MessageFeed::Unread, MessageFeed::Sent];

    /// Path segment for the `/message/{where}` endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFeed::Inbox => "inbox",
            MessageFeed::Unread => "unread",
            MessageFeed::Sent => "sent",
        }
    }
}

impl fmt::Display for MessageFeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageFeed {
    type Err = RedditClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inbox" => Ok(MessageFeed::Inbox),
            "unread" => Ok(MessageFeed::Unread),
            "sent" => Ok(MessageFeed::Sent),
            _ => Err(RedditClientError::UnrecognizedFeed(s.to_string())),
        }
    }
}
