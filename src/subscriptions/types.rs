//! Subscription state and handler registration.

use crate::channels::{CommentChanged, CommentRemoved, EventKind, TopicEvent};
use crate::types::{TopicId, VoteSummary};

/// Lifecycle of one connection against the registry.
///
/// `Joined(a)` never moves to `Joined(b)` directly: the manager leaves `a`
/// before it joins `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    Disconnected,
    Connecting,
    Joined(TopicId),
}

impl SubscriptionState {
    pub fn topic(&self) -> Option<&TopicId> {
        match self {
            SubscriptionState::Joined(topic) => Some(topic),
            _ => None,
        }
    }
}

type Handler<T> = Box<dyn FnMut(&TopicId, &T)>;

/// Callbacks for the four event types, registered once per subscription
/// lifetime.
///
/// Handlers that need to touch changing state should capture it through a
/// shared cell rather than being re-registered.
#[derive(Default)]
pub struct TopicHandlers {
    on_created: Option<Handler<CommentChanged>>,
    on_updated: Option<Handler<CommentChanged>>,
    on_deleted: Option<Handler<CommentRemoved>>,
    on_vote: Option<Handler<VoteSummary>>,
    on_any: Option<Box<dyn FnMut(&TopicEvent)>>,
}

impl TopicHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single handler receiving every event type.
    pub fn any(handler: impl FnMut(&TopicEvent) + 'static) -> Self {
        Self {
            on_any: Some(Box::new(handler)),
            ..Default::default()
        }
    }

    pub fn on_created(mut self, handler: impl FnMut(&TopicId, &CommentChanged) + 'static) -> Self {
        self.on_created = Some(Box::new(handler));
        self
    }

    pub fn on_updated(mut self, handler: impl FnMut(&TopicId, &CommentChanged) + 'static) -> Self {
        self.on_updated = Some(Box::new(handler));
        self
    }

    pub fn on_deleted(mut self, handler: impl FnMut(&TopicId, &CommentRemoved) + 'static) -> Self {
        self.on_deleted = Some(Box::new(handler));
        self
    }

    pub fn on_vote(mut self, handler: impl FnMut(&TopicId, &VoteSummary) + 'static) -> Self {
        self.on_vote = Some(Box::new(handler));
        self
    }

    /// Route an event to its handlers. Returns false if nothing was registered for it.
    pub fn dispatch(&mut self, event: &TopicEvent) -> bool {
        let topic = &event.topic;
        let typed = match &event.event {
            EventKind::CommentAdded(c) => self.on_created.as_mut().map(|h| h(topic, c)),
            EventKind::CommentUpdated(c) => self.on_updated.as_mut().map(|h| h(topic, c)),
            EventKind::CommentDeleted(r) => self.on_deleted.as_mut().map(|h| h(topic, r)),
            EventKind::VoteUpdated(v) => self.on_vote.as_mut().map(|h| h(topic, v)),
        }
        .is_some();

        let any = self.on_any.as_mut().map(|h| h(event)).is_some();
        typed || any
    }
}

impl std::fmt::Debug for TopicHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicHandlers")
            .field("on_created", &self.on_created.is_some())
            .field("on_updated", &self.on_updated.is_some())
            .field("on_deleted", &self.on_deleted.is_some())
            .field("on_vote", &self.on_vote.is_some())
            .field("on_any", &self.on_any.is_some())
            .finish()
    }
}
