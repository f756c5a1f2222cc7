//! Per-topic broadcast channels.
//!
//! A topic's group is the set of connections that joined it. Every event
//! published to a topic reaches every member, including the connection whose
//! action caused it, in the order the server emitted them.
//!
//! # Example
//!
//! ```ignore
//! let registry = ChannelRegistry::new();
//! let inbox = registry.open();
//! registry.join(&TopicId::new("rust"), inbox.id)?;
//!
//! registry.publish_comment_deleted(&TopicId::new("rust"), CommentId(4), 12);
//! match inbox.recv()? {
//!     ChannelMessage::Event(event) => println!("{}", event.name()),
//!     ChannelMessage::Dropped { reason } => println!("dropped: {:?}", reason),
//! }
//! ```

mod registry;
mod types;

pub use registry::ChannelRegistry;
pub use types::{
    ChannelConfig, ChannelMessage, CommentChanged, CommentRemoved, DropReason, EventKind, Inbox,
    TopicEvent, Transport,
};
