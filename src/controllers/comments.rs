use async_trait::async_trait;
use std::sync::Arc;

use super::{FeedController, FeedSource};
use crate::client::{Dispatch, RedditClientError};
use crate::models::{Comment, CommentSort, ListingQuery};
use crate::monitor::{FeedListener, MonitorRegistry, MonitorSettings};

/// Top-level comments of one post, one feed per sort order
pub struct PostCommentsSource<D> {
    dispatch: Arc<D>,
    post_id: String,
    query: ListingQuery,
}

impl<D> PostCommentsSource<D> {
    /// Base-36 id of the post, without the `t3_` prefix
    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn fullname(&self) -> String {
        format!("t3_{}", self.post_id)
    }
}

#[async_trait]
impl<D: Dispatch> FeedSource for PostCommentsSource<D> {
    type Feed = CommentSort;
    type Item = Comment;

    fn monitor_key(&self, sort: CommentSort) -> String {
        format!("Comments.{}.{}", self.post_id, sort)
    }

    fn subscriber(&self) -> String {
        self.fullname()
    }

    async fn fetch(&self, sort: CommentSort) -> Result<Vec<Comment>, RedditClientError> {
        self.dispatch
            .post_comments(&self.post_id, sort, &self.query)
            .await
    }
}

pub struct Comments<D: Dispatch> {
    controller: FeedController<PostCommentsSource<D>>,
}

impl<D: Dispatch> Clone for Comments<D> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

impl<D: Dispatch> Comments<D> {
    /// `post` may be a bare id or a `t3_` fullname
    pub fn new(
        dispatch: Arc<D>,
        post: &str,
        registry: MonitorRegistry,
        settings: MonitorSettings,
    ) -> Self {
        Self::with_query(dispatch, post, registry, settings, ListingQuery::default())
    }

    pub fn with_query(
        dispatch: Arc<D>,
        post: &str,
        registry: MonitorRegistry,
        settings: MonitorSettings,
        query: ListingQuery,
    ) -> Self {
        let post_id = post.strip_prefix("t3_").unwrap_or(post).to_string();
        let source = PostCommentsSource {
            dispatch,
            post_id,
            query,
        };
        Self {
            controller: FeedController::new(source, registry, settings),
        }
    }

    pub fn controller(&self) -> &FeedController<PostCommentsSource<D>> {
        &self.controller
    }

    pub fn post_id(&self) -> &str {
        self.controller.source().post_id()
    }

    pub async fn get(&self, sort: CommentSort) -> Result<Arc<Vec<Comment>>, RedditClientError> {
        self.controller.get(sort).await
    }

    pub async fn newest(&self) -> Result<Arc<Vec<Comment>>, RedditClientError> {
        self.get(CommentSort::New).await
    }

    pub async fn top(&self) -> Result<Arc<Vec<Comment>>, RedditClientError> {
        self.get(CommentSort::Top).await
    }

    pub async fn best(&self) -> Result<Arc<Vec<Comment>>, RedditClientError> {
        self.get(CommentSort::Confidence).await
    }

    pub fn monitor(&self, sort: CommentSort) -> bool {
        self.controller.start_monitoring(sort)
    }

    /// Watch for new comments, the usual way to follow a thread
    pub fn monitor_new(&self) -> bool {
        self.monitor(CommentSort::New)
    }

    pub fn stop_monitoring(&self, sort: CommentSort) -> bool {
        self.controller.stop_monitoring(sort)
    }

    pub fn on_updated<L>(&self, sort: CommentSort, listener: L)
    where
        L: FeedListener<Comment> + 'static,
    {
        self.controller.add_listener(sort, listener);
    }
}
