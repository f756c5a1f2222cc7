//! Property tests for projection and convergence.

mod common;

use common::{backend_with_topic, View, ALICE, BOB};
use proptest::prelude::*;
use proptest::sample::Index;
use std::sync::Arc;
use topic_sync::{
    project, Author, ChannelMessage, Comment, CommentId, CommentList, Controller, MemoryBackend,
    NewComment, ProjectionConfig, Timestamp, TopicEvent, TopicId, UserId,
};

// --- Helpers ---

fn comment(id: u64, reply_to: Option<u64>) -> Comment {
    Comment {
        id: CommentId(id),
        topic_id: TopicId::new("t"),
        author: Some(Author::new(UserId(id % 3), "anyone")),
        content: format!("#{id}"),
        reply_to: reply_to.map(CommentId),
        created_at: Timestamp(id as i64),
        edited: false,
        deleted: false,
        score: 0,
    }
}

/// Build a canonical list: `None` appends a top-level comment, `Some(i)`
/// replies to one of the top-level comments so far.
fn canonical_list(steps: &[Option<Index>]) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut tops: Vec<u64> = Vec::new();
    for (n, step) in steps.iter().enumerate() {
        let id = n as u64 + 1;
        match step {
            Some(index) if !tops.is_empty() => {
                comments.push(comment(id, Some(tops[index.index(tops.len())])));
            }
            _ => {
                tops.push(id);
                comments.push(comment(id, None));
            }
        }
    }
    comments
}

fn shape_of(list: &CommentList) -> Vec<(u64, Vec<u64>)> {
    project(&list.comments, &ProjectionConfig::default())
        .iter()
        .map(|t| (t.id().0, t.reply_ids().iter().map(|r| r.0).collect()))
        .collect()
}

#[derive(Clone, Debug)]
enum Op {
    Post(UserId),
    Reply(UserId, Index),
    Edit(Index),
    Delete(Index),
    Vote(Index, i64),
    SyncAlice,
    SyncBob,
}

fn user() -> impl Strategy<Value = UserId> {
    prop_oneof![Just(ALICE), Just(BOB)]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => user().prop_map(Op::Post),
        3 => (user(), any::<Index>()).prop_map(|(u, i)| Op::Reply(u, i)),
        1 => any::<Index>().prop_map(Op::Edit),
        2 => any::<Index>().prop_map(Op::Delete),
        1 => (any::<Index>(), -1i64..=1).prop_map(|(i, d)| Op::Vote(i, d)),
        1 => Just(Op::SyncAlice),
        1 => Just(Op::SyncBob),
    ]
}

fn pick(posted: &[(CommentId, UserId)], index: &Index) -> (CommentId, UserId) {
    posted[index.index(posted.len())]
}

/// Apply a server-side mutation. Rejections are part of the workload and
/// are ignored; `posted` tracks every id ever created with its author.
fn apply(backend: &MemoryBackend, topic: &TopicId, posted: &mut Vec<(CommentId, UserId)>, op: &Op) {
    match op {
        Op::Post(user) => {
            let input = NewComment {
                user_id: *user,
                topic_id: topic.clone(),
                content: "post".into(),
                reply_to: None,
            };
            if let Ok(c) = backend.create(*user, input) {
                posted.push((c.id, *user));
            }
        }
        Op::Reply(user, index) if !posted.is_empty() => {
            let input = NewComment {
                user_id: *user,
                topic_id: topic.clone(),
                content: "reply".into(),
                reply_to: Some(pick(posted, index).0),
            };
            if let Ok(c) = backend.create(*user, input) {
                posted.push((c.id, *user));
            }
        }
        Op::Edit(index) if !posted.is_empty() => {
            let (id, author) = pick(posted, index);
            let _ = backend.update(author, id, "edited");
        }
        Op::Delete(index) if !posted.is_empty() => {
            let (id, author) = pick(posted, index);
            let _ = backend.delete(author, id);
        }
        Op::Vote(index, delta) if !posted.is_empty() => {
            let _ = backend.vote(pick(posted, index).0, *delta);
        }
        _ => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// On a well-formed list, projection is plain grouping by parent.
    #[test]
    fn prop_projection_groups_by_parent(
        steps in prop::collection::vec(prop::option::of(any::<Index>()), 0..40)
    ) {
        let comments = canonical_list(&steps);
        let threads = project(&comments, &ProjectionConfig::default());

        let expected: Vec<(CommentId, Vec<CommentId>)> = comments
            .iter()
            .filter(|c| c.reply_to.is_none())
            .map(|top| {
                let replies = comments
                    .iter()
                    .filter(|c| c.reply_to == Some(top.id))
                    .map(|c| c.id)
                    .collect();
                (top.id, replies)
            })
            .collect();
        let actual: Vec<(CommentId, Vec<CommentId>)> =
            threads.iter().map(|t| (t.id(), t.reply_ids())).collect();

        prop_assert_eq!(actual, expected);
    }

    /// Whatever order notifications arrive in, the view ends up equal to
    /// the server's canonical list.
    #[test]
    fn prop_any_event_order_converges(
        ops in prop::collection::vec(op(), 1..30),
        swaps in prop::collection::vec((any::<Index>(), any::<Index>()), 0..20),
    ) {
        let topic = TopicId::new("rust");
        let backend = backend_with_topic(&topic);
        let inbox = backend.channels().open();
        backend.channels().join(&topic, inbox.id).unwrap();

        let mut controller = Controller::new(backend.client(ALICE), ALICE);
        controller.load_initial(topic.clone()).unwrap();

        let mut posted = Vec::new();
        for op in &ops {
            apply(&backend, &topic, &mut posted, op);
        }

        let mut events: Vec<Arc<TopicEvent>> = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            if let ChannelMessage::Event(event) = message {
                events.push(event);
            }
        }
        if !events.is_empty() {
            for (a, b) in &swaps {
                let len = events.len();
                events.swap(a.index(len), b.index(len));
            }
        }
        for event in &events {
            controller.on_event(event).unwrap();
        }

        let canonical = backend.fetch(&topic).unwrap();
        prop_assert_eq!(controller.comments(), &canonical.comments[..]);
        prop_assert_eq!(controller.comment_count(), canonical.comment_count);
    }

    /// Among fetches of one activation, the last to resolve is what shows.
    #[test]
    fn prop_last_resolved_wins(
        order in (1usize..8).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
    ) {
        let topic = TopicId::new("rust");
        let backend = backend_with_topic(&topic);
        let mut controller = Controller::new(backend.client(ALICE), ALICE);
        controller.load_initial(topic).unwrap();

        let tokens: Vec<_> = order.iter().map(|_| controller.begin_fetch().unwrap()).collect();
        for &i in &order {
            let list = CommentList {
                comments: vec![comment(i as u64 + 1, None)],
                comment_count: 1,
            };
            prop_assert!(controller.complete_fetch(tokens[i].clone(), Ok(list)).unwrap());
        }

        let last = *order.last().unwrap();
        prop_assert_eq!(controller.comments()[0].id, CommentId(last as u64 + 1));
        prop_assert_eq!(controller.applied_request(), Some(tokens[last].request()));
    }

    /// Two live views fed by the same broadcasts converge on the canonical
    /// thread shape, however their pumps interleave with mutations.
    #[test]
    fn prop_views_converge(ops in prop::collection::vec(op(), 1..40)) {
        let topic = TopicId::new("rust");
        let backend = backend_with_topic(&topic);
        let mut alice = View::open(&backend, ALICE, &topic);
        let mut bob = View::open(&backend, BOB, &topic);

        let mut posted = Vec::new();
        for op in &ops {
            match op {
                Op::SyncAlice => {
                    alice.sync();
                }
                Op::SyncBob => {
                    bob.sync();
                }
                other => apply(&backend, &topic, &mut posted, other),
            }
        }
        alice.sync();
        bob.sync();

        let expected = shape_of(&backend.fetch(&topic).unwrap());
        prop_assert_eq!(alice.shape(), expected.clone());
        prop_assert_eq!(bob.shape(), expected);
    }
}
