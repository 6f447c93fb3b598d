//! Table of active monitors shared by every controller in the process.
//!
//! A monitor key (e.g. `PrivateMessagesInbox`) owns at most one poll task. Subscribers
//! join and leave a key; the entry, and with it the task's right to keep polling,
//! disappears when the last subscriber leaves.

use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Proof of which registration a poll task was spawned for.
///
/// A key that is stopped and started again gets a new epoch, so a task from the earlier
/// registration sees its ticket go stale and exits instead of polling alongside the new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTicket {
    key: String,
    epoch: u64,
}

impl MonitorTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

struct MonitorEntry {
    subscribers: HashSet<String>,
    epoch: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, MonitorEntry>,
    /// Tasks of stopped keys that may still be mid-cycle
    retired: HashMap<String, JoinHandle<()>>,
    next_epoch: u64,
}

impl RegistryState {
    fn retire(&mut self, key: String, task: JoinHandle<()>) {
        self.retired.retain(|_, task| !task.is_finished());
        if !task.is_finished() {
            self.retired.insert(key, task);
        }
    }
}

/// Cloneable handle to one monitor table
#[derive(Clone, Default)]
pub struct MonitorRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `subscriber` under `key`, spawning the key's poll task if it has none.
    ///
    /// `spawn` is only called when a task is needed, and is called with the registry
    /// lock held, so it must not call back into the registry synchronously (spawning a
    /// task that does so later is fine). It also receives the task of an earlier
    /// registration of `key` that was stopped but may not have exited yet; the new task
    /// must wait for it before polling so cycles on one key never overlap.
    ///
    /// Returns false when `subscriber` is already registered under `key`.
    pub fn start<F>(&self, key: &str, subscriber: &str, spawn: F) -> bool
    where
        F: FnOnce(MonitorTicket, Option<JoinHandle<()>>) -> JoinHandle<()>,
    {
        let mut guard = self.lock();
        let state = &mut *guard;

        let needs_task = match state.entries.get_mut(key) {
            Some(entry) => {
                if !entry.subscribers.insert(subscriber.to_string()) {
                    debug!("{} already monitoring {}", subscriber, key);
                    return false;
                }
                entry.task.is_finished()
            }
            None => true,
        };

        if needs_task {
            state.next_epoch += 1;
            let epoch = state.next_epoch;
            let predecessor = state.retired.remove(key);
            let task = spawn(
                MonitorTicket {
                    key: key.to_string(),
                    epoch,
                },
                predecessor,
            );

            match state.entries.get_mut(key) {
                Some(entry) => {
                    info!("Respawning poll task for {} (epoch {})", key, epoch);
                    entry.epoch = epoch;
                    entry.task = task;
                }
                None => {
                    info!("Monitoring {} for {} (epoch {})", key, subscriber, epoch);
                    let mut subscribers = HashSet::new();
                    subscribers.insert(subscriber.to_string());
                    state.entries.insert(
                        key.to_string(),
                        MonitorEntry {
                            subscribers,
                            epoch,
                            task,
                        },
                    );
                }
            }
        }

        true
    }

    /// Remove `subscriber` from `key`. The entry goes away with its last subscriber and
    /// its poll task exits at its next continuation check.
    ///
    /// Returns false when `subscriber` was not registered under `key`.
    pub fn stop(&self, key: &str, subscriber: &str) -> bool {
        let mut state = self.lock();

        let Some(entry) = state.entries.get_mut(key) else {
            return false;
        };
        if !entry.subscribers.remove(subscriber) {
            return false;
        }

        if entry.subscribers.is_empty() {
            if let Some(entry) = state.entries.remove(key) {
                state.retire(key.to_string(), entry.task);
            }
            info!("Stopped monitoring {}", key);
        } else {
            debug!("{} left {}, other subscribers remain", subscriber, key);
        }
        true
    }

    /// Whether `subscriber` is registered under `key`
    pub fn is_active(&self, key: &str, subscriber: &str) -> bool {
        self.lock()
            .entries
            .get(key)
            .map_or(false, |entry| entry.subscribers.contains(subscriber))
    }

    /// Whether the registration `ticket` was issued for is still the live one
    pub fn is_current(&self, ticket: &MonitorTicket) -> bool {
        self.lock()
            .entries
            .get(&ticket.key)
            .map_or(false, |entry| entry.epoch == ticket.epoch)
    }

    /// Number of distinct active keys
    pub fn count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Active keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Deregister every key at once. Returns how many keys were active.
    pub fn stop_all(&self) -> usize {
        let mut state = self.lock();
        let removed = state.entries.len();
        let entries: Vec<(String, MonitorEntry)> = state.entries.drain().collect();
        for (key, entry) in entries {
            state.retire(key, entry.task);
        }
        if removed > 0 {
            info!("Stopped all {} monitors", removed);
        }
        removed
    }
}
