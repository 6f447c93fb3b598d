use crate::client::{RedditClient, RedditClientError};
use crate::controllers::Comments;
use crate::models::{Comment, CommentSort, ListingQuery};
use crate::monitor::{MonitorRegistry, MonitorSettings};
use chrono_tz::Tz;
use log::{error, info};
use std::sync::Arc;

use super::format_timestamp;

/// Configuration options for listing a post's comments
#[derive(Debug, Clone)]
pub struct CommentsOptions {
    /// Post id, bare or as a `t3_` fullname
    pub post_id: String,
    pub sort: CommentSort,
    pub limit: u32,
    pub timezone: Tz,
}

#[derive(Debug)]
pub struct CommentsResult {
    pub comment_count: usize,
    pub formatted_output: String,
    pub comments: Arc<Vec<Comment>>,
}

/// Operation for reading the top-level comments of a post
pub struct CommentsOperation {
    options: CommentsOptions,
    comments: Comments<RedditClient>,
}

impl CommentsOperation {
    pub fn with_client(options: CommentsOptions, client: RedditClient) -> Self {
        let comments = Comments::with_query(
            Arc::new(client),
            &options.post_id,
            MonitorRegistry::new(),
            MonitorSettings::default(),
            ListingQuery::with_limit(options.limit),
        );
        Self { options, comments }
    }

    pub async fn execute(&self) -> Result<CommentsResult, RedditClientError> {
        info!(
            "Fetching {} comments for t3_{}",
            self.options.sort,
            self.comments.post_id()
        );

        let comments = self.comments.get(self.options.sort).await?;

        let mut output = String::new();
        if comments.is_empty() {
            output.push_str("No comments found.\n");
        } else {
            output.push_str(&format!(
                "{} top-level comments ({})\n",
                comments.len(),
                self.options.sort
            ));
            for comment in comments.iter() {
                let replies = comment.flatten().len() - 1;
                output.push_str(&format!(
                    "[{}] {} ({} replies)\n",
                    format_timestamp(comment.created_utc, self.options.timezone, "%Y-%m-%d %H:%M"),
                    comment.format_short_summary(),
                    replies
                ));
            }
        }

        Ok(CommentsResult {
            comment_count: comments.len(),
            formatted_output: output,
            comments,
        })
    }
}

/// CLI handler function for the comments command
pub async fn handle_comments_command(
    options: CommentsOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let operation = CommentsOperation::with_client(options, client);
    match operation.execute().await {
        Ok(result) => {
            print!("{}", result.formatted_output);
            Ok(())
        }
        Err(err) => {
            error!("Error fetching comments: {}", err);
            Err(err)
        }
    }
}
