//! Feed controllers: cached access to a family of feeds plus start/stop of their monitors.

pub mod comments;
pub mod post;
pub mod private_messages;

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::client::RedditClientError;
use crate::models::Identity;
use crate::monitor::{
    dedupe, diff, spawn_monitor, ChangeEvent, ChannelListener, FeedCache, FeedListener,
    ListenerSet, MonitorRegistry, MonitorSettings, PollSchedule, PollTarget,
};

pub use comments::{Comments, PostCommentsSource};
pub use post::Post;
pub use private_messages::{MessageSource, PrivateMessages};

/// A closed set of feeds one source can serve (inbox/unread/sent, comment sorts, ...)
pub trait FeedKind:
    Copy + Eq + Hash + Debug + Display + FromStr<Err = RedditClientError> + Send + Sync + 'static
{
}

impl<K> FeedKind for K where
    K: Copy + Eq + Hash + Debug + Display + FromStr<Err = RedditClientError> + Send + Sync + 'static
{
}

/// Where a controller's records come from
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    type Feed: FeedKind;
    type Item: Identity + Clone + Send + Sync + 'static;

    /// Registry key of the monitor that polls `feed`
    fn monitor_key(&self, feed: Self::Feed) -> String;

    /// Name this source subscribes to its monitor keys under
    fn subscriber(&self) -> String;

    async fn fetch(&self, feed: Self::Feed) -> Result<Vec<Self::Item>, RedditClientError>;
}

struct FeedSlot<T> {
    cache: FeedCache<T>,
    listeners: ListenerSet<T>,
}

struct Shared<S: FeedSource> {
    source: S,
    registry: MonitorRegistry,
    settings: MonitorSettings,
    slots: Mutex<HashMap<S::Feed, Arc<FeedSlot<S::Item>>>>,
}

/// Cache, listeners and monitors for every feed of one source
pub struct FeedController<S: FeedSource> {
    shared: Arc<Shared<S>>,
}

impl<S: FeedSource> Clone for FeedController<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S: FeedSource> FeedController<S> {
    pub fn new(source: S, registry: MonitorRegistry, settings: MonitorSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                registry,
                settings,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    pub fn registry(&self) -> &MonitorRegistry {
        &self.shared.registry
    }

    pub fn settings(&self) -> MonitorSettings {
        self.shared.settings
    }

    fn slot(&self, feed: S::Feed) -> Arc<FeedSlot<S::Item>> {
        let freshness = self.shared.settings.freshness;
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(feed)
            .or_insert_with(|| {
                Arc::new(FeedSlot {
                    cache: FeedCache::new(freshness),
                    listeners: ListenerSet::default(),
                })
            })
            .clone()
    }

    /// Cached snapshot while fresh, otherwise a fetch that refreshes the cache
    pub async fn get(&self, feed: S::Feed) -> Result<Arc<Vec<S::Item>>, RedditClientError> {
        if let Some(snapshot) = self.slot(feed).cache.fresh() {
            debug!("Serving cached {} ({} items)", feed, snapshot.len());
            return Ok(snapshot);
        }
        self.refresh(feed).await
    }

    /// Fetch now and replace the cached snapshot
    pub async fn refresh(&self, feed: S::Feed) -> Result<Arc<Vec<S::Item>>, RedditClientError> {
        let slot = self.slot(feed);
        let (_, current) = fetch_into(&self.shared.source, feed, &slot).await?;
        Ok(current)
    }

    /// Replace the cached snapshot with records fetched elsewhere
    pub fn store(&self, feed: S::Feed, items: Vec<S::Item>) -> Arc<Vec<S::Item>> {
        self.slot(feed).cache.replace(dedupe(items)).1
    }

    /// Cached snapshot without any I/O, empty if never fetched
    pub fn cached(&self, feed: S::Feed) -> Arc<Vec<S::Item>> {
        self.slot(feed).cache.snapshot()
    }

    pub fn last_updated(&self, feed: S::Feed) -> Option<Instant> {
        self.slot(feed).cache.last_updated()
    }

    pub fn add_listener<L>(&self, feed: S::Feed, listener: L)
    where
        L: FeedListener<S::Item> + 'static,
    {
        self.slot(feed).listeners.add(Arc::new(listener));
    }

    /// Channel receiving every change event for `feed`
    pub fn subscribe(&self, feed: S::Feed) -> mpsc::UnboundedReceiver<ChangeEvent<S::Item>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_listener(feed, ChannelListener(tx));
        rx
    }

    /// Start polling `feed`. Returns false if it is already being monitored.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn start_monitoring(&self, feed: S::Feed) -> bool {
        self.start_monitoring_with_delay(feed, Duration::ZERO)
    }

    /// Like `start_monitoring`, but the first poll waits `start_delay`
    pub fn start_monitoring_with_delay(&self, feed: S::Feed, start_delay: Duration) -> bool {
        let key = self.shared.source.monitor_key(feed);
        let subscriber = self.shared.source.subscriber();
        let binding: Arc<dyn PollTarget> = Arc::new(FeedBinding {
            shared: self.shared.clone(),
            feed,
            slot: self.slot(feed),
            key: key.clone(),
        });
        let registry = self.shared.registry.clone();
        let schedule = PollSchedule {
            base_delay: self.shared.settings.base_delay,
            start_delay,
        };

        self.shared.registry.start(&key, &subscriber, move |ticket, predecessor| {
            spawn_monitor(registry, ticket, predecessor, binding, schedule)
        })
    }

    /// Start monitoring a feed given by name; an unknown name is an error
    pub fn start_monitoring_named(&self, name: &str) -> Result<bool, RedditClientError> {
        let feed: S::Feed = name.parse()?;
        Ok(self.start_monitoring(feed))
    }

    /// Stop polling `feed`. Returns false if it was not being monitored.
    pub fn stop_monitoring(&self, feed: S::Feed) -> bool {
        let key = self.shared.source.monitor_key(feed);
        self.shared
            .registry
            .stop(&key, &self.shared.source.subscriber())
    }

    pub fn stop_monitoring_named(&self, name: &str) -> Result<bool, RedditClientError> {
        let feed: S::Feed = name.parse()?;
        Ok(self.stop_monitoring(feed))
    }

    pub fn is_monitoring(&self, feed: S::Feed) -> bool {
        let key = self.shared.source.monitor_key(feed);
        self.shared
            .registry
            .is_active(&key, &self.shared.source.subscriber())
    }
}

async fn fetch_into<S: FeedSource>(
    source: &S,
    feed: S::Feed,
    slot: &FeedSlot<S::Item>,
) -> Result<(Arc<Vec<S::Item>>, Arc<Vec<S::Item>>), RedditClientError> {
    let items = dedupe(source.fetch(feed).await?);
    Ok(slot.cache.replace(items))
}

struct FeedBinding<S: FeedSource> {
    shared: Arc<Shared<S>>,
    feed: S::Feed,
    slot: Arc<FeedSlot<S::Item>>,
    key: String,
}

#[async_trait]
impl<S: FeedSource> PollTarget for FeedBinding<S> {
    async fn poll(&self) -> Result<(), RedditClientError> {
        let (old, new) = fetch_into(&self.shared.source, self.feed, &self.slot).await?;

        let changes = diff(&old, &new);
        if !changes.changed() {
            return Ok(());
        }

        debug!(
            "{}: {} added, {} removed",
            self.key,
            changes.added.len(),
            changes.removed.len()
        );
        let event = ChangeEvent {
            key: self.key.clone(),
            old,
            new,
            added: changes.added,
            removed: changes.removed,
        };
        for failure in self.slot.listeners.notify(&event) {
            warn!(
                "Listener {} for {} failed: {}",
                failure.index, self.key, failure.message
            );
        }
        Ok(())
    }
}
