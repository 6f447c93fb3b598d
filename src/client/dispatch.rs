use async_trait::async_trait;
use log::debug;

use super::{RedditClient, RedditClientError};
use crate::models::{comments_of, Comment, CommentSort, Listing, ListingQuery, Message, MessageFeed, Thing};

/// Endpoints the feed controllers read through.
///
/// `RedditClient` is the production implementation; anything else that can answer these
/// calls (a cache, a test double) can stand in for it.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    /// One page of a private message feed
    async fn messages(
        &self,
        feed: MessageFeed,
        query: &ListingQuery,
    ) -> Result<Listing<Thing<Message>>, RedditClientError>;

    /// Top-level comments of a post in the given sort order
    async fn post_comments(
        &self,
        post_id: &str,
        sort: CommentSort,
        query: &ListingQuery,
    ) -> Result<Vec<Comment>, RedditClientError>;
}

#[async_trait]
impl Dispatch for RedditClient {
    async fn messages(
        &self,
        feed: MessageFeed,
        query: &ListingQuery,
    ) -> Result<Listing<Thing<Message>>, RedditClientError> {
        self.fetch_messages(feed, query).await
    }

    async fn post_comments(
        &self,
        post_id: &str,
        sort: CommentSort,
        query: &ListingQuery,
    ) -> Result<Vec<Comment>, RedditClientError> {
        let (_post, comments) = self.fetch_comment_tree(post_id, sort, query).await?;
        let top_level: Vec<Comment> = comments_of(&comments).into_iter().cloned().collect();
        debug!(
            "Fetched {} top-level comments for {} ({})",
            top_level.len(),
            post_id,
            sort
        );
        Ok(top_level)
    }
}
