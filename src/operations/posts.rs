use crate::client::{RedditClient, RedditClientError};
use crate::models::{ListingQuery, Post};
use chrono_tz::Tz;
use log::{error, info};

use super::format_timestamp;

/// Configuration options for fetching posts
#[derive(Debug, Clone)]
pub struct PostsOptions {
    /// The number of posts to retrieve
    pub count: usize,
    /// The name of the subreddit to fetch posts from (None for the front page)
    pub subreddit: Option<String>,
    /// Display posts in a brief, one-line format
    pub brief: bool,
    /// Posts requested per page while following the listing cursor
    pub page_size: u32,
    /// Zone timestamps are rendered in
    pub timezone: Tz,
}

impl Default for PostsOptions {
    fn default() -> Self {
        Self {
            count: 10,
            subreddit: None,
            brief: false,
            page_size: 100,
            timezone: chrono_tz::America::Los_Angeles,
        }
    }
}

/// Result of a posts fetch operation
#[derive(Debug)]
pub struct PostsResult {
    /// The number of posts found
    pub post_count: usize,
    /// Formatted output (for CLI display)
    pub formatted_output: String,
    pub posts: Vec<Post>,
}

/// Operation for fetching new posts, across as many listing pages as needed
pub struct PostsOperation {
    options: PostsOptions,
    client: RedditClient,
}

impl PostsOperation {
    pub fn new(options: PostsOptions) -> Result<Self, RedditClientError> {
        Ok(Self {
            options,
            client: RedditClient::new()?,
        })
    }

    /// Create a new posts operation with a custom Reddit client
    pub fn with_client(options: PostsOptions, client: RedditClient) -> Self {
        Self { options, client }
    }

    pub async fn execute(&self) -> Result<PostsResult, RedditClientError> {
        info!(
            "Fetching {} posts from {}",
            self.options.count,
            self.options.subreddit.as_deref().unwrap_or("the front page")
        );

        let page_size = self.options.page_size.min(self.options.count.max(1) as u32);
        let query = ListingQuery::with_limit(page_size);
        let posts = match &self.options.subreddit {
            Some(sub) => {
                self.client
                    .fetch_new_posts(sub, query, self.options.count)
                    .await
            }
            None => {
                self.client
                    .fetch_front_page_new(query, self.options.count)
                    .await
            }
        }?;

        let mut output = String::new();
        if posts.is_empty() {
            output.push_str("No posts found.\n");
        } else {
            output.push_str(&format!("Found {} posts\n", posts.len()));

            if self.options.brief {
                self.format_brief_output(&posts, &mut output);

                output.push_str("\nPost Type Legend:\n");
                output.push_str("[T] = Text post\n");
                output.push_str("[V] = Video\n");
                output.push_str("[I] = Image\n");
                output.push_str("[G] = Gallery\n");
                output.push_str("[L] = Link\n");
            } else {
                self.format_detailed_output(&posts, &mut output);
            }
        }

        Ok(PostsResult {
            post_count: posts.len(),
            formatted_output: output,
            posts,
        })
    }

    fn format_brief_output(&self, posts: &[Post], output: &mut String) {
        for (i, post) in posts.iter().enumerate() {
            let timestamp_str = format_timestamp(post.created_utc, self.options.timezone, "%H:%M");

            let post_type = if post.is_self {
                "T"
            } else if post.is_video {
                "V"
            } else if post.url.contains("i.redd.it") || post.url.contains("imgur.com") {
                "I"
            } else if post.url.contains("reddit.com/gallery") {
                "G"
            } else {
                "L"
            };

            output.push_str(&format!(
                "{:2}. [{}] [{}] {} r/{} | ID: {} | https://reddit.com{}\n",
                i + 1,
                post_type,
                timestamp_str,
                truncate(&post.title, 30),
                post.subreddit,
                post.name,
                post.permalink
            ));
        }
    }

    fn format_detailed_output(&self, posts: &[Post], output: &mut String) {
        for post in posts {
            let timestamp_str = format_timestamp(
                post.created_utc,
                self.options.timezone,
                "%Y-%m-%d %H:%M:%S",
            );

            output.push_str("\n============ POST =============\n");
            output.push_str(&format!("[{}] [{}]\n", timestamp_str, self.options.timezone));
            output.push_str(&format!("Thing ID: {}\n", post.name));
            output.push_str(&post.format_summary());
            output.push_str("\n================================\n\n");
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut chars = text.chars().take(max.saturating_sub(3)).collect::<String>();
        chars.push_str("...");
        chars
    } else {
        text.to_string()
    }
}

/// CLI handler function for posts command
pub async fn handle_posts_command(
    options: PostsOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let operation = PostsOperation::with_client(options, client);
    match operation.execute().await {
        Ok(result) => {
            print!("{}", result.formatted_output);
            Ok(())
        }
        Err(err) => {
            error!("Error fetching posts: {}", err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
