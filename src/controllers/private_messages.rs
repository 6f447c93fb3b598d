use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::{FeedController, FeedSource};
use crate::client::{Dispatch, RedditClientError};
use crate::models::{ListingQuery, Message, MessageFeed};
use crate::monitor::{FeedListener, MonitorRegistry, MonitorSettings};

const SUBSCRIBER: &str = "PrivateMessages";

/// Reads the authenticated user's message feeds through a `Dispatch`
pub struct MessageSource<D> {
    dispatch: Arc<D>,
    query: ListingQuery,
}

#[async_trait]
impl<D: Dispatch> FeedSource for MessageSource<D> {
    type Feed = MessageFeed;
    type Item = Message;

    fn monitor_key(&self, feed: MessageFeed) -> String {
        match feed {
            MessageFeed::Inbox => "PrivateMessagesInbox",
            MessageFeed::Unread => "PrivateMessagesUnread",
            MessageFeed::Sent => "PrivateMessagesSent",
        }
        .to_string()
    }

    fn subscriber(&self) -> String {
        SUBSCRIBER.to_string()
    }

    async fn fetch(&self, feed: MessageFeed) -> Result<Vec<Message>, RedditClientError> {
        let listing = self.dispatch.messages(feed, &self.query).await?;
        debug!("Fetched {} messages from {}", listing.len(), feed);
        Ok(listing.into_items())
    }
}

/// Inbox, unread and sent messages with a read-through cache and change monitors
pub struct PrivateMessages<D: Dispatch> {
    controller: FeedController<MessageSource<D>>,
}

impl<D: Dispatch> Clone for PrivateMessages<D> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

impl<D: Dispatch> PrivateMessages<D> {
    pub fn new(dispatch: Arc<D>, registry: MonitorRegistry, settings: MonitorSettings) -> Self {
        Self::with_query(dispatch, registry, settings, ListingQuery::default())
    }

    /// Use `query` for every cached and monitored fetch
    pub fn with_query(
        dispatch: Arc<D>,
        registry: MonitorRegistry,
        settings: MonitorSettings,
        query: ListingQuery,
    ) -> Self {
        let source = MessageSource { dispatch, query };
        Self {
            controller: FeedController::new(source, registry, settings),
        }
    }

    pub fn controller(&self) -> &FeedController<MessageSource<D>> {
        &self.controller
    }

    pub async fn inbox(&self) -> Result<Arc<Vec<Message>>, RedditClientError> {
        self.controller.get(MessageFeed::Inbox).await
    }

    pub async fn unread(&self) -> Result<Arc<Vec<Message>>, RedditClientError> {
        self.controller.get(MessageFeed::Unread).await
    }

    pub async fn sent(&self) -> Result<Arc<Vec<Message>>, RedditClientError> {
        self.controller.get(MessageFeed::Sent).await
    }

    /// Fetch `feed` with an explicit query, bypassing freshness. The result replaces the
    /// cached snapshot.
    pub async fn get_messages(
        &self,
        feed: MessageFeed,
        query: &ListingQuery,
    ) -> Result<Arc<Vec<Message>>, RedditClientError> {
        let listing = self.controller.source().dispatch.messages(feed, query).await?;
        Ok(self.controller.store(feed, listing.into_items()))
    }

    pub fn monitor_inbox(&self) -> bool {
        self.controller.start_monitoring(MessageFeed::Inbox)
    }

    pub fn monitor_unread(&self) -> bool {
        self.controller.start_monitoring(MessageFeed::Unread)
    }

    pub fn monitor_sent(&self) -> bool {
        self.controller.start_monitoring(MessageFeed::Sent)
    }

    pub fn stop_monitoring(&self, feed: MessageFeed) -> bool {
        self.controller.stop_monitoring(feed)
    }

    pub fn on_inbox_updated<L>(&self, listener: L)
    where
        L: FeedListener<Message> + 'static,
    {
        self.controller.add_listener(MessageFeed::Inbox, listener);
    }

    pub fn on_unread_updated<L>(&self, listener: L)
    where
        L: FeedListener<Message> + 'static,
    {
        self.controller.add_listener(MessageFeed::Unread, listener);
    }

    pub fn on_sent_updated<L>(&self, listener: L)
    where
        L: FeedListener<Message> + 'static,
    {
        self.controller.add_listener(MessageFeed::Sent, listener);
    }
}
