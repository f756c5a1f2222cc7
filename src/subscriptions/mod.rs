//! Subscription lifecycle for one connection.
//!
//! A [`SubscriptionManager`] keeps its connection in at most one topic group
//! at a time. Switching topics leaves the old group before joining the new
//! one, and dropping the manager releases the connection.
//!
//! # Example
//!
//! ```ignore
//! let registry = ChannelRegistry::shared();
//! let handlers = TopicHandlers::new()
//!     .on_created(|topic, added| println!("{topic}: {}", added.comment.id))
//!     .on_deleted(|topic, removed| println!("{topic}: -{}", removed.comment_id));
//!
//! let mut manager = SubscriptionManager::new(Arc::clone(&registry), handlers);
//! manager.subscribe(TopicId::new("rust"))?;
//! manager.pump()?;
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{SubscriptionState, TopicHandlers};
