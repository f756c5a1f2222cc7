//! Subscription manager binding one connection to one topic at a time.

use crate::channels::{ChannelMessage, Inbox, Transport};
use crate::error::{Result, SyncError};
use crate::types::{ConnectionId, TopicId};
use crossbeam_channel::{RecvTimeoutError, TryRecvError};
use std::time::Duration;

use super::types::{SubscriptionState, TopicHandlers};

/// Owns one connection's lifecycle against a transport.
///
/// The connection is acquired by the first `subscribe` and released by
/// `unsubscribe` or when the manager is dropped, whichever comes first.
pub struct SubscriptionManager<T: Transport> {
    transport: T,
    handlers: TopicHandlers,
    inbox: Option<Inbox>,
    state: SubscriptionState,
}

impl<T: Transport> SubscriptionManager<T> {
    /// Create a manager with its handlers registered up front.
    pub fn new(transport: T, handlers: TopicHandlers) -> Self {
        Self {
            transport,
            handlers,
            inbox: None,
            state: SubscriptionState::Disconnected,
        }
    }

    pub fn state(&self) -> &SubscriptionState {
        &self.state
    }

    /// The topic currently joined, if any.
    pub fn topic(&self) -> Option<&TopicId> {
        self.state.topic()
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.inbox.as_ref().map(|i| i.id)
    }

    /// Join `topic`, leaving the previously joined topic first.
    ///
    /// Subscribing to the topic already joined is a no-op. A connection the
    /// transport already released is replaced once. On failure the
    /// connection is released and the manager is back to `Disconnected`.
    pub fn subscribe(&mut self, topic: TopicId) -> Result<()> {
        if self.state.topic() == Some(&topic) {
            return Ok(());
        }

        let connection = match &self.inbox {
            Some(inbox) => inbox.id,
            None => self.connect()?,
        };

        if let SubscriptionState::Joined(previous) =
            std::mem::replace(&mut self.state, SubscriptionState::Connecting)
        {
            self.transport.leave_topic(connection, &previous);
        }

        let mut result = self.transport.join_topic(connection, &topic);
        let mut connection = connection;
        if result == Err(SyncError::Disconnected) {
            tracing::debug!(connection = %connection, "stale connection, reconnecting");
            // Anything still queued belongs to the released connection.
            self.inbox = None;
            connection = self.connect()?;
            result = self.transport.join_topic(connection, &topic);
        }

        if let Err(e) = result {
            tracing::warn!(topic = %topic, connection = %connection, error = %e, "join failed");
            self.release();
            return Err(e);
        }

        tracing::debug!(topic = %topic, connection = %connection, "subscribed");
        self.state = SubscriptionState::Joined(topic);
        Ok(())
    }

    fn connect(&mut self) -> Result<ConnectionId> {
        self.state = SubscriptionState::Connecting;
        match self.transport.connect() {
            Ok(inbox) => {
                let id = inbox.id;
                self.inbox = Some(inbox);
                Ok(id)
            }
            Err(e) => {
                self.state = SubscriptionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Replace the registered handlers, then subscribe.
    pub fn subscribe_with(&mut self, topic: TopicId, handlers: TopicHandlers) -> Result<()> {
        self.handlers = handlers;
        self.subscribe(topic)
    }

    /// Leave the current topic and release the connection.
    ///
    /// Returns false if there was nothing to release; repeated calls emit no
    /// further `leave`.
    pub fn unsubscribe(&mut self) -> bool {
        let had_connection = self.inbox.is_some();
        self.release();
        had_connection
    }

    fn release(&mut self) {
        let state = std::mem::replace(&mut self.state, SubscriptionState::Disconnected);
        if let Some(inbox) = self.inbox.take() {
            if let SubscriptionState::Joined(topic) = state {
                self.transport.leave_topic(inbox.id, &topic);
            }
            self.transport.close(inbox.id);
            tracing::debug!(connection = %inbox.id, "unsubscribed");
        }
    }

    /// Dispatch every queued event without blocking.
    ///
    /// Events for a topic other than the joined one were queued before a
    /// switch and are discarded. Returns the number of events dispatched.
    pub fn pump(&mut self) -> Result<usize> {
        let mut dispatched = 0;
        loop {
            let message = match &self.inbox {
                None => return Err(SyncError::NotSubscribed),
                Some(inbox) => inbox.try_recv(),
            };
            match message {
                Ok(message) => {
                    if self.deliver(message)? {
                        dispatched += 1;
                    }
                }
                Err(TryRecvError::Empty) => return Ok(dispatched),
                Err(TryRecvError::Disconnected) => {
                    self.release();
                    return Err(SyncError::Disconnected);
                }
            }
        }
    }

    /// Block until at least one message arrives (or `timeout` passes), then
    /// drain the inbox like `pump`.
    pub fn pump_timeout(&mut self, timeout: Duration) -> Result<usize> {
        let first = match &self.inbox {
            None => return Err(SyncError::NotSubscribed),
            Some(inbox) => inbox.recv_timeout(timeout),
        };
        let dispatched = match first {
            Ok(message) => usize::from(self.deliver(message)?),
            Err(RecvTimeoutError::Timeout) => return Ok(0),
            Err(RecvTimeoutError::Disconnected) => {
                self.release();
                return Err(SyncError::Disconnected);
            }
        };
        Ok(dispatched + self.pump()?)
    }

    fn deliver(&mut self, message: ChannelMessage) -> Result<bool> {
        match message {
            ChannelMessage::Event(event) => {
                if self.state.topic() != Some(&event.topic) {
                    tracing::debug!(topic = %event.topic, event = event.name(), "discarding stale event");
                    return Ok(false);
                }
                self.handlers.dispatch(&event);
                Ok(true)
            }
            ChannelMessage::Dropped { reason } => {
                tracing::warn!(?reason, "connection dropped by registry");
                // The registry already removed every membership.
                self.inbox = None;
                self.state = SubscriptionState::Disconnected;
                Err(SyncError::ConnectionDropped(reason))
            }
        }
    }
}

impl<T: Transport> Drop for SubscriptionManager<T> {
    fn drop(&mut self) {
        self.release();
    }
}
