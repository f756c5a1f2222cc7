//! Event and connection types for topic channels.

use crate::error::Result;
use crate::types::{Comment, CommentId, ConnectionId, TopicId, VoteSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for the channel registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Max buffered messages per connection before it is dropped.
    /// Default: 1024
    pub buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { buffer_size: 1024 }
    }
}

/// Payload of `commentAdded` and `commentUpdated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentChanged {
    pub comment: Comment,
    pub comment_count: u64,
}

/// Payload of `commentDeleted`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRemoved {
    pub comment_id: CommentId,
    pub comment_count: u64,
}

/// Named, topic-scoped notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum EventKind {
    CommentAdded(CommentChanged),
    CommentUpdated(CommentChanged),
    CommentDeleted(CommentRemoved),
    VoteUpdated(VoteSummary),
}

impl EventKind {
    /// The event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CommentAdded(_) => "commentAdded",
            EventKind::CommentUpdated(_) => "commentUpdated",
            EventKind::CommentDeleted(_) => "commentDeleted",
            EventKind::VoteUpdated(_) => "voteUpdated",
        }
    }

    /// Aggregate count reported alongside the change, if any.
    pub fn comment_count(&self) -> Option<u64> {
        match self {
            EventKind::CommentAdded(c) | EventKind::CommentUpdated(c) => Some(c.comment_count),
            EventKind::CommentDeleted(r) => Some(r.comment_count),
            EventKind::VoteUpdated(_) => None,
        }
    }
}

/// An event broadcast to one topic's group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEvent {
    pub topic: TopicId,
    pub event: EventKind,
}

impl TopicEvent {
    pub fn new(topic: TopicId, event: EventKind) -> Self {
        Self { topic, event }
    }

    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

/// Why a connection was dropped by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Inbox overflowed (slow consumer).
    BufferOverflow,
    /// Connection was closed.
    Closed,
}

/// What a connection's inbox yields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelMessage {
    Event(Arc<TopicEvent>),
    /// Last message a dropped connection receives.
    Dropped { reason: DropReason },
}

/// Receiving end of one connection.
pub struct Inbox {
    pub id: ConnectionId,
    pub receiver: crossbeam_channel::Receiver<ChannelMessage>,
}

impl Inbox {
    /// Receive the next message (blocking).
    pub fn recv(&self) -> std::result::Result<ChannelMessage, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<ChannelMessage, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> std::result::Result<ChannelMessage, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// The publish/subscribe transport as seen from one client.
///
/// `join_topic`/`leave_topic` are the outbound `joinTopic`/`leaveTopic` messages.
pub trait Transport {
    /// Open a new connection.
    fn connect(&self) -> Result<Inbox>;

    /// Add a connection to a topic's group. Idempotent.
    fn join_topic(&self, connection: ConnectionId, topic: &TopicId) -> Result<()>;

    /// Remove a connection from a topic's group. No-op if absent.
    fn leave_topic(&self, connection: ConnectionId, topic: &TopicId);

    /// Release the connection and every membership it holds.
    fn close(&self, connection: ConnectionId);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn connect(&self) -> Result<Inbox> {
        (**self).connect()
    }

    fn join_topic(&self, connection: ConnectionId, topic: &TopicId) -> Result<()> {
        (**self).join_topic(connection, topic)
    }

    fn leave_topic(&self, connection: ConnectionId, topic: &TopicId) {
        (**self).leave_topic(connection, topic)
    }

    fn close(&self, connection: ConnectionId) {
        (**self).close(connection)
    }
}
