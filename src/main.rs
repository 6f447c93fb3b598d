use env_logger::Env;
use log::{error, info};
use redwatch::cli::{Cli, Commands};
use redwatch::client::{RedditClient, RedditClientError};
use redwatch::config::AppConfig;
use redwatch::models::{CommentSort, MessageFeed};
use redwatch::operations::comments::{handle_comments_command, CommentsOptions};
use redwatch::operations::messages::{handle_messages_command, MessagesOptions};
use redwatch::operations::monitor::{
    handle_watch_comments_command, handle_watch_messages_command, WatchCommentsOptions,
    WatchMessagesOptions,
};
use redwatch::operations::posts::{handle_posts_command, PostsOptions};
use clap::Parser;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = AppConfig::load();
    let level = match &config {
        Ok(config) => config.log_level.clone(),
        Err(_) => "info".to_string(),
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = match config {
        Ok(config) => {
            info!("{}", config.env_source());
            config
        }
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli, config).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn authenticated_client(
    config: &AppConfig,
    token: Option<&str>,
) -> Result<RedditClient, RedditClientError> {
    let mut client = config.create_client()?;
    if let Some(token) = token {
        client = client.with_access_token(token);
    }
    client.authenticate(config).await?;
    info!("Authenticated against {}", client.api_base());
    Ok(client)
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), RedditClientError> {
    let client = authenticated_client(&config, cli.token.as_deref()).await?;
    let timezone = config.timezone;

    match cli.command {
        Commands::Messages { feed, limit } => {
            let options = MessagesOptions {
                feed: feed.parse()?,
                limit,
                timezone,
            };
            handle_messages_command(options, client).await
        }
        Commands::Comments {
            post_id,
            sort,
            limit,
        } => {
            let options = CommentsOptions {
                post_id,
                sort: sort.parse()?,
                limit,
                timezone,
            };
            handle_comments_command(options, client).await
        }
        Commands::Posts {
            count,
            subreddit,
            brief,
            page_size,
        } => {
            let options = PostsOptions {
                count,
                subreddit,
                brief,
                page_size,
                timezone,
            };
            handle_posts_command(options, client).await
        }
        Commands::WatchMessages {
            feed,
            duration,
            stagger_ms,
        } => {
            let feeds = feed
                .iter()
                .map(|name| name.parse::<MessageFeed>())
                .collect::<Result<Vec<_>, _>>()?;
            let options = WatchMessagesOptions {
                feeds,
                duration: duration.map(Duration::from_secs),
                stagger: Duration::from_millis(stagger_ms),
                settings: config.monitor_settings(),
                timezone,
            };
            handle_watch_messages_command(options, client).await
        }
        Commands::WatchComments {
            post_id,
            sort,
            duration,
        } => {
            let options = WatchCommentsOptions {
                post_id,
                sort: sort.parse::<CommentSort>()?,
                duration: duration.map(Duration::from_secs),
                settings: config.monitor_settings(),
                timezone,
            };
            handle_watch_comments_command(options, client).await
        }
    }
}
