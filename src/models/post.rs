use serde::Deserialize;
use std::collections::HashMap;

use super::Identity;

/// Link or self post (`t3`)
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Post {
    // Basic post information
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_utc: f64,

    // Post type and content
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub is_video: bool,

    // Post metrics
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub upvote_ratio: f32,
    #[serde(default)]
    pub num_comments: i32,

    // Subreddit information
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub subreddit_name_prefixed: String,

    // Post status and moderation
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub spoiler: bool,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub link_flair_text: Option<String>,

    // Additional fields we don't explicitly model
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl Identity for Post {
    fn identity(&self) -> &str {
        &self.name
    }
}

impl Post {
    /// Format a post for display with important metadata
    pub fn format_summary(&self) -> String {
        let mut content = format!(
            "Title: {}\nAuthor: u/{}\nSubreddit: r/{}\nScore: {} ({}% upvoted) | Comments: {}\n",
            self.title,
            self.author,
            self.subreddit,
            self.score,
            (self.upvote_ratio * 100.0) as i32,
            self.num_comments,
        );

        let mut flags = Vec::new();
        if self.is_self {
            flags.push("Self Post");
        }
        if self.over_18 {
            flags.push("NSFW");
        }
        if self.spoiler {
            flags.push("Spoiler");
        }
        if self.is_video {
            flags.push("Video");
        }
        if self.stickied {
            flags.push("Stickied");
        }
        if self.locked {
            flags.push("Locked");
        }
        if !flags.is_empty() {
            content.push_str(&format!("Flags: [{}]\n", flags.join(", ")));
        }

        if let Some(flair) = self.link_flair_text.as_deref().filter(|f| !f.is_empty()) {
            content.push_str(&format!("Flair: {}\n", flair));
        }

        // Self text is truncated on a char boundary
        if self.is_self && !self.selftext.is_empty() {
            let text = if self.selftext.chars().count() > 500 {
                format!("{}...", self.selftext.chars().take(500).collect::<String>())
            } else {
                self.selftext.clone()
            };
            content.push_str("\nContent:\n---------\n");
            content.push_str(&text);
            content.push_str("\n---------\n");
        }

        content.push_str(&format!("\nPermalink: https://reddit.com{}", self.permalink));
        if !self.is_self && self.url != format!("https://reddit.com{}", self.permalink) {
            content.push_str(&format!("\nExternal URL: {}", self.url));
        }

        content
    }

    /// Get a short summary for the post (title, author, score)
    pub fn format_short_summary(&self) -> String {
        format!(
            "[{} | {} pts] {} - by u/{}",
            self.subreddit_name_prefixed, self.score, self.title, self.author
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unmodelled_fields() {
        let post: Post = serde_json::from_str(
            r#"{"id": "p1", "name": "t3_p1", "title": "Hello", "author": "alice",
                "subreddit": "rust", "subreddit_name_prefixed": "r/rust", "score": 42,
                "is_self": true, "selftext": "body", "permalink": "/r/rust/comments/p1/hello/",
                "gilded": 2}"#,
        )
        .unwrap();

        assert_eq!(post.identity(), "t3_p1");
        assert_eq!(post.additional_fields["gilded"], 2);
        assert_eq!(post.format_short_summary(), "[r/rust | 42 pts] Hello - by u/alice");
        assert!(post.format_summary().contains("Flags: [Self Post]"));
    }
}
