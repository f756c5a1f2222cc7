//! Reconciliation of a client's comment list with server state.
//!
//! The controller follows a notify-then-refetch model: any event on the
//! active topic (created, updated, deleted, vote) triggers a fetch of the
//! canonical list, which then replaces local state as a whole.
//!
//! Fetches are split into issuing a [`FetchToken`] and committing its result
//! so that hosts with real suspension points can resolve them in any order:
//!
//! ```ignore
//! let token = controller.begin_fetch()?;
//! let result = api.fetch_comments(token.topic());
//! controller.complete_fetch(token, result)?;
//! ```

mod api;
mod controller;
mod projection;

pub use api::CommentApi;
pub use controller::{Controller, ControllerConfig, EditDraft, FetchToken, ReplyTarget};
pub use projection::{project, OrphanPolicy, ProjectionConfig, Thread, ThreadHead};
