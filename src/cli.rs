use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "redwatch",
    version,
    about = "Read and monitor Reddit message and comment feeds."
)]
pub struct Cli {
    /// Access token to use instead of the configured credentials
    #[arg(long, global = true, required = false)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Print one of your private message feeds.
    Messages {
        /// inbox, unread or sent
        #[arg(long, short, default_value = "inbox")]
        feed: String,

        /// Number of messages to retrieve (at most 100).
        #[arg(long, short, default_value_t = 25)]
        limit: u32,
    },

    /// Print the top-level comments of a post.
    Comments {
        /// Post id, bare (abc123) or as a fullname (t3_abc123).
        #[arg(help = "Post id", required = true)]
        post_id: String,

        /// confidence (best), top, new, controversial, old, qa or live
        #[arg(long, short, default_value = "confidence")]
        sort: String,

        #[arg(long, short, default_value_t = 25)]
        limit: u32,
    },

    /// Command to fetch new posts from a subreddit or the front page.
    Posts {
        /// The number of posts to retrieve.
        #[arg(long, short, help = "Number of posts to retrieve", required = true)]
        count: usize,

        /// The name of the subreddit to fetch posts from.
        /// If not provided, new posts from the front page are retrieved.
        #[arg(long, short, help = "Subreddit name (optional)", required = false)]
        subreddit: Option<String>,

        /// Display posts in a brief, one-line format.
        #[arg(
            long,
            short,
            help = "Show posts in a brief one-line format",
            required = false
        )]
        brief: bool,

        /// Posts per listing page while following the cursor.
        #[arg(long, default_value_t = 100)]
        page_size: u32,
    },

    /// Watch message feeds and print every change until the duration elapses or Ctrl-C.
    WatchMessages {
        /// Feeds to watch; repeat for several.
        #[arg(long, short, default_values_t = vec!["inbox".to_string()])]
        feed: Vec<String>,

        /// Seconds to watch for; runs until Ctrl-C when omitted.
        #[arg(long, short)]
        duration: Option<u64>,

        /// Offset in milliseconds between the first polls of consecutive feeds.
        #[arg(long, default_value_t = 0)]
        stagger_ms: u64,
    },

    /// Watch a post's comments and print every change.
    WatchComments {
        #[arg(help = "Post id", required = true)]
        post_id: String,

        #[arg(long, short, default_value = "new")]
        sort: String,

        #[arg(long, short)]
        duration: Option<u64>,
    },
}
