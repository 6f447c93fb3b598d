use crate::client::{RedditClient, RedditClientError};
use crate::controllers::PrivateMessages;
use crate::models::{ListingQuery, Message, MessageFeed};
use crate::monitor::{MonitorRegistry, MonitorSettings};
use chrono_tz::Tz;
use log::{error, info};
use std::sync::Arc;

use super::format_timestamp;

/// Configuration options for listing a message feed
#[derive(Debug, Clone)]
pub struct MessagesOptions {
    pub feed: MessageFeed,
    /// Messages requested from the API (at most 100)
    pub limit: u32,
    /// Zone timestamps are rendered in
    pub timezone: Tz,
}

impl Default for MessagesOptions {
    fn default() -> Self {
        Self {
            feed: MessageFeed::Inbox,
            limit: 25,
            timezone: chrono_tz::America::Los_Angeles,
        }
    }
}

#[derive(Debug)]
pub struct MessagesResult {
    pub message_count: usize,
    pub formatted_output: String,
    pub messages: Arc<Vec<Message>>,
}

/// Operation for reading one private message feed
pub struct MessagesOperation {
    options: MessagesOptions,
    messages: PrivateMessages<RedditClient>,
}

impl MessagesOperation {
    /// The client must already hold a user token
    pub fn with_client(options: MessagesOptions, client: RedditClient) -> Self {
        let messages = PrivateMessages::new(
            Arc::new(client),
            MonitorRegistry::new(),
            MonitorSettings::default(),
        );
        Self { options, messages }
    }

    pub async fn execute(&self) -> Result<MessagesResult, RedditClientError> {
        info!(
            "Fetching up to {} messages from {}",
            self.options.limit, self.options.feed
        );

        let query = ListingQuery::with_limit(self.options.limit);
        let messages = self
            .messages
            .get_messages(self.options.feed, &query)
            .await?;

        let mut output = String::new();
        if messages.is_empty() {
            output.push_str(&format!("No messages in {}.\n", self.options.feed));
        } else {
            output.push_str(&format!(
                "{} messages in {}\n",
                messages.len(),
                self.options.feed
            ));
            for message in messages.iter() {
                output.push_str(&format!(
                    "[{}] {}\n",
                    format_timestamp(message.created_utc, self.options.timezone, "%Y-%m-%d %H:%M"),
                    message.format_short_summary()
                ));
            }
        }

        Ok(MessagesResult {
            message_count: messages.len(),
            formatted_output: output,
            messages,
        })
    }
}

/// CLI handler function for the messages command
pub async fn handle_messages_command(
    options: MessagesOptions,
    client: RedditClient,
) -> Result<(), RedditClientError> {
    let operation = MessagesOperation::with_client(options, client);
    match operation.execute().await {
        Ok(result) => {
            print!("{}", result.formatted_output);
            Ok(())
        }
        Err(err) => {
            error!("Error fetching messages: {}", err);
            Err(err)
        }
    }
}
