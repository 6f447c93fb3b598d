use std::sync::{Arc, OnceLock};

use super::Comments;
use crate::client::Dispatch;
use crate::models;
use crate::monitor::{MonitorRegistry, MonitorSettings};

/// Handle on one post; its comment controller is built on first use
pub struct Post<D: Dispatch> {
    dispatch: Arc<D>,
    registry: MonitorRegistry,
    settings: MonitorSettings,
    fullname: String,
    subreddit: Option<String>,
    comments: OnceLock<Comments<D>>,
}

impl<D: Dispatch> Post<D> {
    /// `post` may be a bare id or a `t3_` fullname
    pub fn new(
        dispatch: Arc<D>,
        post: &str,
        registry: MonitorRegistry,
        settings: MonitorSettings,
    ) -> Self {
        let fullname = if post.starts_with("t3_") {
            post.to_string()
        } else {
            format!("t3_{}", post)
        };
        Self {
            dispatch,
            registry,
            settings,
            fullname,
            subreddit: None,
            comments: OnceLock::new(),
        }
    }

    pub fn from_listing(
        dispatch: Arc<D>,
        post: &models::Post,
        registry: MonitorRegistry,
        settings: MonitorSettings,
    ) -> Self {
        let mut handle = Self::new(dispatch, &post.name, registry, settings);
        if !post.subreddit.is_empty() {
            handle.subreddit = Some(post.subreddit.clone());
        }
        handle
    }

    pub fn id(&self) -> &str {
        &self.fullname
    }

    pub fn subreddit(&self) -> Option<&str> {
        self.subreddit.as_deref()
    }

    pub fn comments(&self) -> &Comments<D> {
        self.comments.get_or_init(|| {
            Comments::new(
                self.dispatch.clone(),
                &self.fullname,
                self.registry.clone(),
                self.settings,
            )
        })
    }
}
