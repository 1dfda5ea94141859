mod feeds;
mod schema;
mod types;

pub use schema::Database;
pub use types::{DatabaseError, FeedKind, NewFeed, SubscribedFeed};
