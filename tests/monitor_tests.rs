use async_trait::async_trait;
use redwatch::client::{Dispatch, RedditClientError};
use redwatch::controllers::{Comments, Post, PrivateMessages};
use redwatch::models::{Comment, CommentSort, Listing, ListingQuery, Message, MessageFeed, Thing};
use redwatch::monitor::{ChangeEvent, ListenerError, MonitorRegistry, MonitorSettings};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Scripted stand-in for the Reddit API: each feed returns whatever was last `set`
#[derive(Default)]
struct FakeDispatch {
    feeds: Mutex<HashMap<MessageFeed, Vec<&'static str>>>,
    failing: Mutex<HashSet<MessageFeed>>,
    fetches: Mutex<HashMap<MessageFeed, usize>>,
    comments: Mutex<HashMap<String, Vec<&'static str>>>,
    comment_fetches: AtomicUsize,
}

impl FakeDispatch {
    fn set(&self, feed: MessageFeed, names: &[&'static str]) {
        self.feeds.lock().unwrap().insert(feed, names.to_vec());
    }

    fn fail(&self, feed: MessageFeed, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(feed);
        } else {
            set.remove(&feed);
        }
    }

    fn fetches(&self, feed: MessageFeed) -> usize {
        self.fetches.lock().unwrap().get(&feed).copied().unwrap_or(0)
    }

    fn set_comments(&self, post_id: &str, names: &[&'static str]) {
        self.comments
            .lock()
            .unwrap()
            .insert(post_id.to_string(), names.to_vec());
    }
}

#[async_trait]
impl Dispatch for FakeDispatch {
    async fn messages(
        &self,
        feed: MessageFeed,
        _query: &ListingQuery,
    ) -> Result<Listing<Thing<Message>>, RedditClientError> {
        *self.fetches.lock().unwrap().entry(feed).or_insert(0) += 1;
        if self.failing.lock().unwrap().contains(&feed) {
            return Err(RedditClientError::Status {
                status: 503,
                body: "upstream unavailable".into(),
            });
        }

        let names = self.feeds.lock().unwrap().get(&feed).cloned().unwrap_or_default();
        let children: Vec<_> = names
            .iter()
            .map(|name| json!({"kind": "t4", "data": {"id": &name[3..], "name": name, "subject": "hi"}}))
            .collect();
        Ok(serde_json::from_value(json!({
            "kind": "Listing",
            "data": {"after": null, "before": null, "children": children}
        }))
        .unwrap())
    }

    async fn post_comments(
        &self,
        post_id: &str,
        _sort: CommentSort,
        _query: &ListingQuery,
    ) -> Result<Vec<Comment>, RedditClientError> {
        self.comment_fetches.fetch_add(1, Ordering::SeqCst);
        let names = self
            .comments
            .lock()
            .unwrap()
            .get(post_id)
            .cloned()
            .unwrap_or_default();
        Ok(names
            .iter()
            .map(|name| {
                serde_json::from_value(json!({"id": &name[3..], "name": name, "body": "text"}))
                    .unwrap()
            })
            .collect())
    }
}

fn settings() -> MonitorSettings {
    MonitorSettings {
        base_delay: Duration::from_millis(100),
        freshness: Duration::from_secs(15),
    }
}

fn setup() -> (Arc<FakeDispatch>, MonitorRegistry, PrivateMessages<FakeDispatch>) {
    let dispatch = Arc::new(FakeDispatch::default());
    let registry = MonitorRegistry::new();
    let messages = PrivateMessages::new(dispatch.clone(), registry.clone(), settings());
    (dispatch, registry, messages)
}

fn names(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.name.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn poll_reports_added_and_removed_messages() {
    let (dispatch, _registry, messages) = setup();
    dispatch.set(MessageFeed::Inbox, &["t4_1", "t4_2"]);
    let mut events = messages.controller().subscribe(MessageFeed::Inbox);

    assert!(messages.monitor_inbox());
    sleep(Duration::from_millis(50)).await;

    let first = events.try_recv().unwrap();
    assert_eq!(first.key, "PrivateMessagesInbox");
    assert_eq!(names(&first.added), vec!["t4_1", "t4_2"]);
    assert!(first.removed.is_empty());

    dispatch.set(MessageFeed::Inbox, &["t4_2", "t4_3"]);
    sleep(Duration::from_millis(100)).await;

    let second = events.try_recv().unwrap();
    assert_eq!(names(&second.old), vec!["t4_1", "t4_2"]);
    assert_eq!(names(&second.new), vec!["t4_2", "t4_3"]);
    assert_eq!(names(&second.added), vec!["t4_3"]);
    assert_eq!(names(&second.removed), vec!["t4_1"]);

    // Unchanged feed: no event
    sleep(Duration::from_millis(300)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(names(&messages.controller().cached(MessageFeed::Inbox)), vec!["t4_2", "t4_3"]);

    messages.stop_monitoring(MessageFeed::Inbox);
}

#[tokio::test(start_paused = true)]
async fn failed_fetches_keep_the_loop_and_the_cache() {
    let (dispatch, _registry, messages) = setup();
    dispatch.set(MessageFeed::Inbox, &["t4_1"]);
    let mut events = messages.controller().subscribe(MessageFeed::Inbox);

    messages.monitor_inbox();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(names(&events.try_recv().unwrap().added), vec!["t4_1"]);

    dispatch.fail(MessageFeed::Inbox, true);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), 4);
    assert!(events.try_recv().is_err());
    assert!(messages.controller().is_monitoring(MessageFeed::Inbox));
    assert_eq!(names(&messages.controller().cached(MessageFeed::Inbox)), vec!["t4_1"]);

    dispatch.fail(MessageFeed::Inbox, false);
    dispatch.set(MessageFeed::Inbox, &["t4_1", "t4_2"]);
    sleep(Duration::from_millis(100)).await;

    let event = events.try_recv().unwrap();
    assert_eq!(names(&event.added), vec!["t4_2"]);
    assert!(event.removed.is_empty());

    messages.stop_monitoring(MessageFeed::Inbox);
}

#[tokio::test(start_paused = true)]
async fn failing_listeners_are_isolated() {
    let (dispatch, _registry, messages) = setup();
    dispatch.set(MessageFeed::Unread, &["t4_1"]);

    let calls = Arc::new(AtomicUsize::new(0));
    messages.on_unread_updated(|_: &ChangeEvent<Message>| -> Result<(), ListenerError> {
        Err("listener rejected event".into())
    });
    messages.on_unread_updated(|_: &ChangeEvent<Message>| -> Result<(), ListenerError> {
        panic!("listener crashed")
    });
    let counter = calls.clone();
    messages.on_unread_updated(move |_: &ChangeEvent<Message>| -> Result<(), ListenerError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    messages.monitor_unread();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    dispatch.set(MessageFeed::Unread, &[]);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(messages.controller().is_monitoring(MessageFeed::Unread));

    messages.stop_monitoring(MessageFeed::Unread);
}

#[tokio::test(start_paused = true)]
async fn stopping_ends_fetches() {
    let (dispatch, registry, messages) = setup();

    messages.monitor_sent();
    sleep(Duration::from_millis(250)).await;
    assert_eq!(dispatch.fetches(MessageFeed::Sent), 3);

    assert!(messages.stop_monitoring(MessageFeed::Sent));
    assert_eq!(registry.count(), 0);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(dispatch.fetches(MessageFeed::Sent), 3);
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_report_whether_anything_changed() {
    let (_dispatch, registry, messages) = setup();
    let controller = messages.controller();

    assert!(controller.start_monitoring(MessageFeed::Inbox));
    assert!(!controller.start_monitoring(MessageFeed::Inbox));
    assert!(controller.is_monitoring(MessageFeed::Inbox));
    assert_eq!(registry.count(), 1);

    assert!(controller.stop_monitoring(MessageFeed::Inbox));
    assert!(!controller.stop_monitoring(MessageFeed::Inbox));
    assert!(!controller.is_monitoring(MessageFeed::Inbox));
    assert_eq!(registry.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn keys_are_independent() {
    let (dispatch, registry, messages) = setup();

    messages.monitor_inbox();
    messages.monitor_unread();
    assert_eq!(
        registry.keys(),
        vec!["PrivateMessagesInbox", "PrivateMessagesUnread"]
    );

    sleep(Duration::from_millis(50)).await;
    messages.stop_monitoring(MessageFeed::Inbox);
    assert_eq!(registry.keys(), vec!["PrivateMessagesUnread"]);
    let inbox_fetches = dispatch.fetches(MessageFeed::Inbox);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), inbox_fetches);
    assert!(dispatch.fetches(MessageFeed::Unread) > inbox_fetches);

    messages.stop_monitoring(MessageFeed::Unread);
}

#[tokio::test(start_paused = true)]
async fn delay_grows_with_active_keys() {
    let (dispatch, _registry, messages) = setup();

    messages.monitor_inbox();
    messages.monitor_unread();
    sleep(Duration::from_millis(950)).await;
    // Two keys: one poll each every 200ms
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), 5);
    assert_eq!(dispatch.fetches(MessageFeed::Unread), 5);

    messages.stop_monitoring(MessageFeed::Unread);
    sleep(Duration::from_millis(300)).await;
    // Back to one key: polls at 1000, 1100 and 1200
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), 8);

    messages.stop_monitoring(MessageFeed::Inbox);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_start_stop_leaves_nothing_running() {
    let dispatch = Arc::new(FakeDispatch::default());
    let registry = MonitorRegistry::new();
    let messages = PrivateMessages::new(
        dispatch.clone(),
        registry.clone(),
        MonitorSettings {
            base_delay: Duration::from_millis(5),
            freshness: Duration::from_secs(15),
        },
    );

    let mut tasks = Vec::new();
    for i in 0..12 {
        let messages = messages.clone();
        let feed = MessageFeed::ALL[i % 3];
        tasks.push(tokio::spawn(async move {
            for _ in 0..50 {
                messages.controller().start_monitoring(feed);
                tokio::task::yield_now().await;
                messages.controller().stop_monitoring(feed);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(registry.count(), 0);

    sleep(Duration::from_millis(100)).await;
    let settled: usize = MessageFeed::ALL.iter().map(|f| dispatch.fetches(*f)).sum();
    sleep(Duration::from_millis(200)).await;
    let later: usize = MessageFeed::ALL.iter().map(|f| dispatch.fetches(*f)).sum();
    assert_eq!(settled, later);
}

#[tokio::test(start_paused = true)]
async fn reads_are_served_from_cache_inside_the_window() {
    let (dispatch, _registry, messages) = setup();
    dispatch.set(MessageFeed::Inbox, &["t4_1"]);

    assert_eq!(names(&messages.inbox().await.unwrap()), vec!["t4_1"]);
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), 1);

    dispatch.set(MessageFeed::Inbox, &["t4_1", "t4_2"]);
    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(names(&messages.inbox().await.unwrap()), vec!["t4_1"]);
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), 1);

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(names(&messages.inbox().await.unwrap()), vec!["t4_1", "t4_2"]);
    assert_eq!(dispatch.fetches(MessageFeed::Inbox), 2);
}

#[tokio::test(start_paused = true)]
async fn explicit_query_replaces_the_cache() {
    let (dispatch, _registry, messages) = setup();
    dispatch.set(MessageFeed::Sent, &["t4_9", "t4_9", "t4_8"]);

    let sent = messages
        .get_messages(MessageFeed::Sent, &ListingQuery::with_limit(5))
        .await
        .unwrap();
    // Duplicate identities collapse to the first occurrence
    assert_eq!(names(&sent), vec!["t4_9", "t4_8"]);

    assert_eq!(names(&messages.sent().await.unwrap()), vec!["t4_9", "t4_8"]);
    assert_eq!(dispatch.fetches(MessageFeed::Sent), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_feed_names_are_rejected() {
    let (_dispatch, registry, messages) = setup();
    let controller = messages.controller();

    match controller.start_monitoring_named("bogus") {
        Err(RedditClientError::UnrecognizedFeed(name)) => assert_eq!(name, "bogus"),
        other => panic!("expected UnrecognizedFeed, got {:?}", other),
    }
    assert_eq!(registry.count(), 0);

    assert!(controller.start_monitoring_named("Unread").unwrap());
    assert!(controller.stop_monitoring_named("unread").unwrap());
    assert!(controller.stop_monitoring_named("modmail").is_err());
}

#[tokio::test(start_paused = true)]
async fn post_comments_share_the_registry() {
    let dispatch = Arc::new(FakeDispatch::default());
    let registry = MonitorRegistry::new();
    dispatch.set_comments("p1", &["t1_a"]);

    let post = Post::new(dispatch.clone(), "p1", registry.clone(), settings());
    let messages = PrivateMessages::new(dispatch.clone(), registry.clone(), settings());
    let mut events = post.comments().controller().subscribe(CommentSort::New);

    assert!(post.comments().monitor_new());
    assert!(messages.monitor_inbox());
    assert_eq!(registry.keys(), vec!["Comments.p1.new", "PrivateMessagesInbox"]);

    sleep(Duration::from_millis(50)).await;
    let first = events.try_recv().unwrap();
    assert_eq!(first.key, "Comments.p1.new");
    assert_eq!(first.added.len(), 1);

    dispatch.set_comments("p1", &["t1_a", "t1_b"]);
    sleep(Duration::from_millis(200)).await;
    let second = events.try_recv().unwrap();
    assert_eq!(second.added[0].name, "t1_b");

    assert_eq!(registry.stop_all(), 2);
    let fetched = dispatch.comment_fetches.load(Ordering::SeqCst);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(dispatch.comment_fetches.load(Ordering::SeqCst), fetched);
}

#[tokio::test(start_paused = true)]
async fn two_posts_monitor_separate_keys() {
    let dispatch = Arc::new(FakeDispatch::default());
    let registry = MonitorRegistry::new();

    let a = Comments::new(dispatch.clone(), "t3_aaa", registry.clone(), settings());
    let b = Comments::new(dispatch.clone(), "bbb", registry.clone(), settings());

    assert!(a.monitor_new());
    assert!(b.monitor_new());
    assert!(a.monitor(CommentSort::Top));
    assert_eq!(registry.count(), 3);

    assert!(a.stop_monitoring(CommentSort::New));
    assert!(!a.controller().is_monitoring(CommentSort::New));
    assert!(b.controller().is_monitoring(CommentSort::New));

    registry.stop_all();
}

#[tokio::test(start_paused = true)]
async fn message_feed_events_stay_on_their_key() {
    let (dispatch, _registry, messages) = setup();
    dispatch.set(MessageFeed::Inbox, &["t4_i1"]);
    dispatch.set(MessageFeed::Unread, &["t4_u1"]);
    let mut inbox = messages.controller().subscribe(MessageFeed::Inbox);
    let mut unread = messages.controller().subscribe(MessageFeed::Unread);

    messages.monitor_inbox();
    messages.monitor_unread();
    sleep(Duration::from_millis(50)).await;

    let first = inbox.try_recv().unwrap();
    assert_eq!(first.key, "PrivateMessagesInbox");
    assert_eq!(names(&first.added), vec!["t4_i1"]);
    let first = unread.try_recv().unwrap();
    assert_eq!(first.key, "PrivateMessagesUnread");
    assert_eq!(names(&first.added), vec!["t4_u1"]);

    dispatch.set(MessageFeed::Inbox, &["t4_i2"]);
    dispatch.set(MessageFeed::Unread, &["t4_u1", "t4_u2"]);
    sleep(Duration::from_millis(200)).await;

    let second = inbox.try_recv().unwrap();
    assert_eq!(second.key, "PrivateMessagesInbox");
    assert_eq!(names(&second.added), vec!["t4_i2"]);
    assert_eq!(names(&second.removed), vec!["t4_i1"]);
    assert!(inbox.try_recv().is_err());

    let second = unread.try_recv().unwrap();
    assert_eq!(second.key, "PrivateMessagesUnread");
    assert_eq!(names(&second.added), vec!["t4_u2"]);
    assert!(second.removed.is_empty());
    assert!(unread.try_recv().is_err());

    assert_eq!(names(&messages.controller().cached(MessageFeed::Inbox)), vec!["t4_i2"]);
    assert_eq!(
        names(&messages.controller().cached(MessageFeed::Unread)),
        vec!["t4_u1", "t4_u2"]
    );

    messages.stop_monitoring(MessageFeed::Inbox);
    messages.stop_monitoring(MessageFeed::Unread);
}

#[tokio::test(start_paused = true)]
async fn comment_events_stay_on_their_post() {
    let dispatch = Arc::new(FakeDispatch::default());
    let registry = MonitorRegistry::new();
    dispatch.set_comments("aaa", &["t1_a1"]);
    dispatch.set_comments("bbb", &["t1_b1"]);

    let a = Comments::new(dispatch.clone(), "t3_aaa", registry.clone(), settings());
    let b = Comments::new(dispatch.clone(), "bbb", registry.clone(), settings());
    let mut a_events = a.controller().subscribe(CommentSort::New);
    let mut b_events = b.controller().subscribe(CommentSort::New);

    a.monitor_new();
    b.monitor_new();
    sleep(Duration::from_millis(50)).await;

    let first = a_events.try_recv().unwrap();
    assert_eq!(first.key, "Comments.aaa.new");
    assert_eq!(first.added[0].name, "t1_a1");
    let first = b_events.try_recv().unwrap();
    assert_eq!(first.key, "Comments.bbb.new");
    assert_eq!(first.added[0].name, "t1_b1");

    // Only post b changes
    dispatch.set_comments("bbb", &["t1_b1", "t1_b2"]);
    sleep(Duration::from_millis(200)).await;

    assert!(a_events.try_recv().is_err());
    let second = b_events.try_recv().unwrap();
    assert_eq!(second.key, "Comments.bbb.new");
    assert_eq!(second.added.len(), 1);
    assert_eq!(second.added[0].name, "t1_b2");
    assert!(b_events.try_recv().is_err());

    registry.stop_all();
}
