//! Channel registry: topic groups and broadcast fan-out.

use crate::error::{Result, SyncError};
use crate::types::{Comment, CommentId, ConnectionId, TopicId, VoteSummary};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    ChannelConfig, ChannelMessage, CommentChanged, CommentRemoved, DropReason, EventKind, Inbox,
    TopicEvent, Transport,
};

/// Outcome of a failed delivery.
enum Undeliverable {
    Overflow,
    Gone,
}

/// Internal connection state.
struct Connection {
    /// Holds `capacity` events plus one slot kept free for `Dropped`.
    sender: Sender<ChannelMessage>,
    capacity: usize,
    /// Topics this connection is a member of.
    topics: BTreeSet<TopicId>,
}

impl Connection {
    /// Queue an event. Only the registry sends, under the emit lock, so the
    /// length check cannot race another sender.
    fn try_send(&self, message: ChannelMessage) -> std::result::Result<(), Undeliverable> {
        if self.sender.len() >= self.capacity {
            return Err(Undeliverable::Overflow);
        }
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Undeliverable::Overflow),
            Err(TrySendError::Disconnected(_)) => Err(Undeliverable::Gone),
        }
    }

    /// Send the final lifecycle message into the reserved slot.
    fn notify_dropped(&self, reason: DropReason) {
        if let Err(e) = self.sender.try_send(ChannelMessage::Dropped {
            reason: reason.clone(),
        }) {
            let receiver_gone = e.is_disconnected();
            tracing::debug!(?reason, receiver_gone, "drop notice not delivered");
        }
    }
}

#[derive(Default)]
struct Groups {
    connections: HashMap<ConnectionId, Connection>,
    /// Topic groups. A group exists only while it has members.
    members: HashMap<TopicId, BTreeSet<ConnectionId>>,
}

impl Groups {
    fn detach(&mut self, id: ConnectionId) -> Option<Connection> {
        let conn = self.connections.remove(&id)?;
        for topic in &conn.topics {
            self.remove_member(topic, id);
        }
        Some(conn)
    }

    fn remove_member(&mut self, topic: &TopicId, id: ConnectionId) -> bool {
        let Some(group) = self.members.get_mut(topic) else {
            return false;
        };
        let removed = group.remove(&id);
        if group.is_empty() {
            self.members.remove(topic);
        }
        removed
    }
}

/// Maps topics to their subscribed connections and fans events out to them.
///
/// Membership changes take the write lock, so joins and leaves from many
/// managers never corrupt a group. Broadcasts are serialized so every
/// connection observes events in emission order.
pub struct ChannelRegistry {
    groups: RwLock<Groups>,
    /// Serializes broadcasts.
    emit_lock: Mutex<()>,
    /// Counter for generating connection IDs.
    next_id: AtomicU64,
    config: ChannelConfig,
}

impl ChannelRegistry {
    /// Create a new registry.
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            groups: RwLock::new(Groups::default()),
            emit_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Create a registry behind an `Arc`, ready to be shared by managers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Open a connection with its own bounded inbox.
    pub fn open(&self) -> Inbox {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let capacity = self.config.buffer_size.max(1);
        let (sender, receiver) = bounded(capacity + 1);

        self.groups.write().connections.insert(
            id,
            Connection {
                sender,
                capacity,
                topics: BTreeSet::new(),
            },
        );
        tracing::debug!(connection = %id, "connection opened");

        Inbox { id, receiver }
    }

    /// Add `connection` to `topic`'s group, creating the group on first join.
    pub fn join(&self, topic: &TopicId, connection: ConnectionId) -> Result<()> {
        let mut groups = self.groups.write();
        let conn = groups
            .connections
            .get_mut(&connection)
            .ok_or(SyncError::Disconnected)?;

        if conn.topics.insert(topic.clone()) {
            groups
                .members
                .entry(topic.clone())
                .or_default()
                .insert(connection);
            tracing::debug!(topic = %topic, connection = %connection, "joined topic");
        }
        Ok(())
    }

    /// Remove `connection` from `topic`'s group. No-op if absent.
    pub fn leave(&self, topic: &TopicId, connection: ConnectionId) {
        let mut groups = self.groups.write();
        if let Some(conn) = groups.connections.get_mut(&connection) {
            conn.topics.remove(topic);
        }
        if groups.remove_member(topic, connection) {
            tracing::debug!(topic = %topic, connection = %connection, "left topic");
        }
    }

    /// Release a connection and all of its memberships.
    pub fn close(&self, connection: ConnectionId) {
        if let Some(conn) = self.groups.write().detach(connection) {
            conn.notify_dropped(DropReason::Closed);
            tracing::debug!(connection = %connection, "connection closed");
        }
    }

    /// Deliver `event` to every member of `topic`, the originator included.
    ///
    /// Returns the number of connections the event reached. Broadcasting to
    /// a topic with no members is a no-op.
    pub fn broadcast(&self, topic: &TopicId, event: EventKind) -> usize {
        let _emit = self.emit_lock.lock();
        let message = ChannelMessage::Event(Arc::new(TopicEvent::new(topic.clone(), event)));

        let mut delivered = 0;
        let mut to_remove = Vec::new();

        {
            let groups = self.groups.read();
            let Some(members) = groups.members.get(topic) else {
                return 0;
            };
            for id in members {
                let Some(conn) = groups.connections.get(id) else {
                    continue;
                };
                match conn.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(reason) => to_remove.push((*id, reason)),
                }
            }
        }

        // Remove dropped connections
        if !to_remove.is_empty() {
            let mut groups = self.groups.write();
            for (id, reason) in to_remove {
                if let Some(conn) = groups.detach(id) {
                    match reason {
                        Undeliverable::Overflow => {
                            tracing::warn!(connection = %id, topic = %topic, "dropping slow connection");
                            conn.notify_dropped(DropReason::BufferOverflow);
                        }
                        Undeliverable::Gone => {
                            tracing::debug!(connection = %id, "pruned disconnected connection");
                        }
                    }
                }
            }
        }

        delivered
    }

    // --- Publish helpers ---

    pub fn publish_comment_added(&self, comment: Comment, comment_count: u64) -> usize {
        let topic = comment.topic_id.clone();
        self.broadcast(
            &topic,
            EventKind::CommentAdded(CommentChanged {
                comment,
                comment_count,
            }),
        )
    }

    pub fn publish_comment_updated(&self, comment: Comment, comment_count: u64) -> usize {
        let topic = comment.topic_id.clone();
        self.broadcast(
            &topic,
            EventKind::CommentUpdated(CommentChanged {
                comment,
                comment_count,
            }),
        )
    }

    pub fn publish_comment_deleted(
        &self,
        topic: &TopicId,
        comment_id: CommentId,
        comment_count: u64,
    ) -> usize {
        self.broadcast(
            topic,
            EventKind::CommentDeleted(CommentRemoved {
                comment_id,
                comment_count,
            }),
        )
    }

    pub fn publish_vote_updated(&self, topic: &TopicId, summary: VoteSummary) -> usize {
        self.broadcast(topic, EventKind::VoteUpdated(summary))
    }

    // --- Introspection ---

    /// Number of connections in `topic`'s group.
    pub fn subscriber_count(&self, topic: &TopicId) -> usize {
        self.groups.read().members.get(topic).map_or(0, |m| m.len())
    }

    /// Number of topics with at least one member.
    pub fn topic_count(&self) -> usize {
        self.groups.read().members.len()
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.groups.read().connections.len()
    }

    pub fn is_member(&self, topic: &TopicId, connection: ConnectionId) -> bool {
        self.groups
            .read()
            .members
            .get(topic)
            .is_some_and(|m| m.contains(&connection))
    }

    /// Topics `connection` currently belongs to.
    pub fn topics_of(&self, connection: ConnectionId) -> Vec<TopicId> {
        self.groups
            .read()
            .connections
            .get(&connection)
            .map(|c| c.topics.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ChannelRegistry {
    fn connect(&self) -> Result<Inbox> {
        Ok(self.open())
    }

    fn join_topic(&self, connection: ConnectionId, topic: &TopicId) -> Result<()> {
        ChannelRegistry::join(self, topic, connection)
    }

    fn leave_topic(&self, connection: ConnectionId, topic: &TopicId) {
        ChannelRegistry::leave(self, topic, connection)
    }

    fn close(&self, connection: ConnectionId) {
        ChannelRegistry::close(self, connection)
    }
}
