//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use topic_sync::{
    Author, ChannelRegistry, Controller, MemoryBackend, MemoryClient, SubscriptionManager,
    TopicId, UserId,
};

pub const ALICE: UserId = UserId(1);
pub const BOB: UserId = UserId(2);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn backend_with_topic(topic: &TopicId) -> Arc<MemoryBackend> {
    init_tracing();
    let backend = MemoryBackend::new(ChannelRegistry::shared());
    backend.create_topic(topic.clone());
    backend.register_user(Author::new(ALICE, "alice"));
    backend.register_user(Author::new(BOB, "bob"));
    backend
}

/// One browser view: a controller wired to a subscription.
pub struct View {
    pub controller: Rc<RefCell<Controller<MemoryClient>>>,
    pub subscription: SubscriptionManager<Arc<ChannelRegistry>>,
}

impl View {
    pub fn open(backend: &Arc<MemoryBackend>, user: UserId, topic: &TopicId) -> Self {
        let controller = Rc::new(RefCell::new(Controller::new(backend.client(user), user)));
        let mut subscription = SubscriptionManager::new(
            Arc::clone(backend.channels()),
            Controller::handlers(&controller),
        );
        subscription.subscribe(topic.clone()).unwrap();
        controller.borrow_mut().load_initial(topic.clone()).unwrap();
        Self {
            controller,
            subscription,
        }
    }

    /// Deliver every queued event.
    pub fn sync(&mut self) -> usize {
        self.subscription.pump().unwrap()
    }

    /// `(top-level id, reply ids)` for every thread on screen.
    pub fn shape(&self) -> Vec<(u64, Vec<u64>)> {
        self.controller
            .borrow()
            .threads()
            .iter()
            .map(|t| (t.id().0, t.reply_ids().iter().map(|r| r.0).collect()))
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<u64> {
        self.controller
            .borrow()
            .visible_comments()
            .iter()
            .map(|c| c.id.0)
            .collect()
    }
}
