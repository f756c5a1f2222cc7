//! # Topic Sync
//!
//! Real-time synchronization core for threaded comments: many clients
//! viewing the same topic converge on the server's view without a manual
//! refresh.
//!
//! ## Core Concepts
//!
//! - **Channels**: per-topic groups of connections with FIFO broadcast fan-out
//! - **Subscriptions**: one connection bound to at most one topic at a time
//! - **Reconciliation**: every notification triggers a refetch of the
//!   canonical list, which replaces local state wholesale
//!
//! ## Example
//!
//! ```ignore
//! use topic_sync::{ChannelRegistry, Controller, MemoryBackend, SubscriptionManager};
//!
//! let registry = ChannelRegistry::shared();
//! let backend = MemoryBackend::new(Arc::clone(&registry));
//!
//! let controller = Rc::new(RefCell::new(Controller::new(backend.client(me), me)));
//! let mut subscription =
//!     SubscriptionManager::new(Arc::clone(&registry), Controller::handlers(&controller));
//!
//! subscription.subscribe(topic.clone())?;
//! controller.borrow_mut().load_initial(topic)?;
//!
//! controller.borrow_mut().submit_create("hello", None)?;
//! subscription.pump()?; // commentAdded -> refetch
//! ```

pub mod channels;
pub mod config;
pub mod error;
pub mod memory;
pub mod reconcile;
pub mod subscriptions;
pub mod types;
pub mod wire;

// Re-exports
pub use channels::{
    ChannelConfig, ChannelMessage, ChannelRegistry, CommentChanged, CommentRemoved, DropReason,
    EventKind, Inbox, TopicEvent, Transport,
};
pub use config::SyncConfig;
pub use error::{ErrorKind, Result, SyncError};
pub use memory::{MemoryBackend, MemoryClient};
pub use reconcile::{
    project, CommentApi, Controller, ControllerConfig, EditDraft, FetchToken, OrphanPolicy,
    ProjectionConfig, ReplyTarget, Thread, ThreadHead,
};
pub use subscriptions::{SubscriptionManager, SubscriptionState, TopicHandlers};
pub use types::*;
pub use wire::{ClientMessage, Encoding};
