//! Typed Reddit records and the listing envelope they arrive in

pub mod comment;
pub mod listing;
pub mod message;
pub mod post;

pub use comment::{comments_of, Comment, CommentChild, CommentSort, MoreChildren};
pub use listing::{collect_pages, Listing, ListingData, ListingQuery, Thing};
pub use message::{Message, MessageFeed};
pub use post::Post;

/// Stable identity of a record across fetches (the thing's fullname).
pub trait Identity {
    fn identity(&self) -> &str;
}
