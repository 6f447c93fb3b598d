use log::debug;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// What a poll cycle saw change in one feed
#[derive(Debug, Clone)]
pub struct ChangeEvent<T> {
    /// Monitor key the event was produced for
    pub key: String,
    pub old: Arc<Vec<T>>,
    pub new: Arc<Vec<T>>,
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

/// Receives change events on the poll task that produced them.
///
/// Listeners should return quickly; the next poll cycle waits for them.
pub trait FeedListener<T>: Send + Sync {
    fn on_change(&self, event: &ChangeEvent<T>) -> Result<(), ListenerError>;

    /// A closed listener can never accept another event and is dropped from its set
    fn is_closed(&self) -> bool {
        false
    }
}

impl<T, F> FeedListener<T> for F
where
    F: Fn(&ChangeEvent<T>) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent<T>) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Forwards events into a channel, for consumers living on another task
pub struct ChannelListener<T>(pub mpsc::UnboundedSender<ChangeEvent<T>>);

impl<T: Clone + Send + Sync> FeedListener<T> for ChannelListener<T> {
    fn on_change(&self, event: &ChangeEvent<T>) -> Result<(), ListenerError> {
        self.0
            .send(event.clone())
            .map_err(|_| "change event receiver dropped".into())
    }

    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// A listener that returned an error or panicked
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerFailure {
    /// Position of the failing listener among those notified
    pub index: usize,
    pub message: String,
}

pub struct ListenerSet<T> {
    listeners: RwLock<Vec<Arc<dyn FeedListener<T>>>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<T> ListenerSet<T> {
    pub fn add(&self, listener: Arc<dyn FeedListener<T>>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop listeners that report themselves closed. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|listener| !listener.is_closed());
        before - listeners.len()
    }

    /// Call every listener in registration order. A failing listener does not stop the
    /// ones after it. Closed listeners are pruned first.
    pub fn notify(&self, event: &ChangeEvent<T>) -> Vec<ListenerFailure> {
        let pruned = self.prune();
        if pruned > 0 {
            debug!("Dropped {} closed listener(s) for {}", pruned, event.key);
        }

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = Vec::new();
        for (index, listener) in listeners.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_change(event)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(payload) => format!("listener panicked: {}", panic_message(payload.as_ref())),
            };
            failures.push(ListenerFailure { index, message });
        }
        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
