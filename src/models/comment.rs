use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use super::{Identity, Listing};
use crate::client::RedditClientError;

/// A child of a comment listing: either a comment or a "load more" stub
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "data")]
pub enum CommentChild {
    #[serde(rename = "t1")]
    Comment(Comment),
    #[serde(rename = "more")]
    More(MoreChildren),
}

/// Stub for comments Reddit did not include in the response
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MoreChildren {
    #[serde(default)]
    pub count: i32,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    /// Fullname, e.g. `t1_k2x9z`
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub link_id: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub depth: Option<i32>,
    #[serde(default)]
    pub stickied: bool,
    // Reddit sends "" instead of a listing when there are no replies
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Option<Listing<CommentChild>>,
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Option<Listing<CommentChild>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Listing(Listing<CommentChild>),
        Other(serde_json::Value),
    }

    Ok(match Replies::deserialize(deserializer)? {
        Replies::Listing(listing) => Some(listing),
        Replies::Other(_) => None,
    })
}

impl Identity for Comment {
    fn identity(&self) -> &str {
        &self.name
    }
}

impl Comment {
    /// Direct child comments, skipping "more" stubs
    pub fn replies(&self) -> Vec<&Comment> {
        match &self.replies {
            Some(listing) => comments_of(listing),
            None => Vec::new(),
        }
    }

    /// This comment followed by all of its descendants, depth-first
    pub fn flatten(&self) -> Vec<&Comment> {
        let mut out = vec![self];
        for reply in self.replies() {
            out.extend(reply.flatten());
        }
        out
    }

    pub fn format_short_summary(&self) -> String {
        let body = self.body.replace('\n', " ");
        let body = if body.chars().count() > 60 {
            format!("{}...", body.chars().take(57).collect::<String>())
        } else {
            body
        };
        format!(
            "{} [{} pts] u/{}: {}",
            self.name, self.score, self.author, body
        )
    }
}

/// Comments of a listing in order, skipping "more" stubs
pub fn comments_of(listing: &Listing<CommentChild>) -> Vec<&Comment> {
    listing
        .data
        .children
        .iter()
        .filter_map(|child| match child {
            CommentChild::Comment(comment) => Some(comment),
            CommentChild::More(_) => None,
        })
        .collect()
}

/// Sort orders for a post's comment feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentSort {
    Confidence,
    Top,
    New,
    Controversial,
    Old,
    Qa,
    Live,
}

impl CommentSort {
    /// Value of the `sort` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentSort::Confidence => "confidence",
            CommentSort::Top => "top",
            CommentSort::New => "new",
            CommentSort::Controversial => "controversial",
            CommentSort::Old => "old",
            CommentSort::Qa => "qa",
            CommentSort::Live => "live",
        }
    }
}

impl fmt::Display for CommentSort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentSort {
    type Err = RedditClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confidence" | "best" => Ok(CommentSort::Confidence),
            "top" => Ok(CommentSort::Top),
            "new" => Ok(CommentSort::New),
            "controversial" => Ok(CommentSort::Controversial),
            "old" => Ok(CommentSort::Old),
            "qa" => Ok(CommentSort::Qa),
            "live" => Ok(CommentSort::Live),
            _ => Err(RedditClientError::UnrecognizedFeed(s.to_string())),
        }
    }
}
