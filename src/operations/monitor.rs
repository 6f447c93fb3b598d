use crate::client::{Dispatch, RedditClient, RedditClientError};
use crate::controllers::{Comments, FeedController, FeedSource, PrivateMessages};
use crate::models::{Comment, CommentSort, Message, MessageFeed};
use crate::monitor::{ChangeEvent, ChannelListener, MonitorRegistry, MonitorSettings};
use chrono_tz::Tz;
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::format_timestamp;

#[derive(Debug, Clone)]
pub struct WatchMessagesOptions {
    pub feeds: Vec<MessageFeed>,
    /// Stop after this long; None runs until Ctrl-C
    pub duration: Option<Duration>,
    /// Offset between the first polls of consecutive feeds
    pub stagger: Duration,
    pub settings: MonitorSettings,
    pub timezone: Tz,
}

#[derive(Debug, Clone)]
pub struct WatchCommentsOptions {
    pub post_id: String,
    pub sort: CommentSort,
    pub duration: Option<Duration>,
    pub settings: MonitorSettings,
    pub timezone: Tz,
}

/// What a watch session saw before it ended
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WatchSummary {
    pub events: usize,
    pub added: usize,
    pub removed: usize,
}

impl WatchSummary {
    fn record<T>(&mut self, event: &ChangeEvent<T>) {
        self.events += 1;
        self.added += event.added.len();
        self.removed += event.removed.len();
    }
}

/// Prime the cache so the first poll only reports what changed after the watch began
async fn prime<S: FeedSource>(
    controller: &FeedController<S>,
    feed: S::Feed,
) -> Result<(), RedditClientError> {
    let snapshot = controller.refresh(feed).await?;
    info!("Watching {} ({} items already present)", feed, snapshot.len());
    Ok(())
}

/// Drain change events until the deadline passes, Ctrl-C arrives or every sender is gone
async fn pump<T, F>(
    mut events: mpsc::UnboundedReceiver<ChangeEvent<T>>,
    duration: Option<Duration>,
    mut print: F,
) -> WatchSummary
where
    F: FnMut(&ChangeEvent<T>),
{
    let mut summary = WatchSummary::default();
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Watch duration elapsed");
                break;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!("Could not listen for Ctrl-C: {}", err);
                }
                info!("Interrupted, stopping monitors");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    summary.record(&event);
                    print(&event);
                }
                None => break,
            },
        }
    }
    summary
}

fn print_message_event(event: &ChangeEvent<Message>, tz: Tz) {
    println!(
        "== {}: {} new, {} gone ==",
        event.key,
        event.added.len(),
        event.removed.len()
    );
    for message in &event.added {
        println!(
            "+ [{}] {}",
            format_timestamp(message.created_utc, tz, "%H:%M:%S"),
            message.format_short_summary()
        );
    }
    for message in &event.removed {
        println!("- {}", message.name);
    }
}

fn print_comment_event(event: &ChangeEvent<Comment>, tz: Tz) {
    println!(
        "== {}: {} new, {} gone ==",
        event.key,
        event.added.len(),
        event.removed.len()
    );
    for comment in &event.added {
        println!(
            "+ [{}] {}",
            format_timestamp(comment.created_utc, tz, "%H:%M:%S"),
            comment.format_short_summary()
        );
    }
    for comment in &event.removed {
        println!("- {}", comment.name);
    }
}

/// Monitor one or more message feeds and print their change events.
///
/// A feed named more than once is watched once.
pub async fn watch_messages<D: Dispatch>(
    options: WatchMessagesOptions,
    dispatch: Arc<D>,
) -> Result<WatchSummary, RedditClientError> {
    let registry = MonitorRegistry::new();
    let messages = PrivateMessages::new(dispatch, registry.clone(), options.settings);
    let controller = messages.controller();

    let mut seen = HashSet::new();
    let feeds: Vec<MessageFeed> = options
        .feeds
        .iter()
        .copied()
        .filter(|feed| seen.insert(*feed))
        .collect();
    if feeds.len() < options.feeds.len() {
        warn!("Ignoring repeated feeds, watching {} distinct", feeds.len());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    for (i, feed) in feeds.iter().enumerate() {
        prime(controller, *feed).await?;
        controller.add_listener(*feed, ChannelListener(tx.clone()));
        controller.start_monitoring_with_delay(*feed, options.stagger * i as u32);
    }
    drop(tx);

    let tz = options.timezone;
    let summary = pump(rx, options.duration, |event| print_message_event(event, tz)).await;

    registry.stop_all();
    Ok(summary)
}

/// Monitor a post's comments and print their change events
pub async fn watch_comments<D: Dispatch>(
    options: WatchCommentsOptions,
    dispatch: Arc<D>,
) -> Result<WatchSummary, RedditClientError> {
    let registry = MonitorRegistry::new();
    let comments = Comments::new(
        dispatch,
        &options.post_id,
        registry.clone(),
        options.settings,
    );

    prime(comments.controller(), options.sort).await?;
    let rx = comments.controller().subscribe(options.sort);
    comments.monitor(options.sort);

    let tz = options.timezone;
    let summary = pump(rx, options.duration, |event| print_comment_event(event, tz)).await;

    registry.stop_all();
    Ok(summary)
}

fn report(summary: &WatchSummary) {
    println!(
        "{} change events ({} added, {} removed)",
        summary.events, summary.added, summary.removed
    );
}

pub async fn handle_watch_messages_command(
    options: WatchMessagesOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let summary = watch_messages(options, Arc::new(client)).await?;
    report(&summary);
    Ok(())
}

pub async fn handle_watch_comments_command(
    options: WatchCommentsOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let summary = watch_comments(options, Arc::new(client)).await?;
    report(&summary);
    Ok(())
}
