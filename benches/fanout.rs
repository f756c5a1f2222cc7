//! Performance benchmarks for channel fan-out and projection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use topic_sync::{
    project, Author, ChannelConfig, ChannelRegistry, Comment, CommentId, Inbox, ProjectionConfig,
    Timestamp, TopicId, UserId,
};

fn comment(id: u64, reply_to: Option<u64>) -> Comment {
    Comment {
        id: CommentId(id),
        topic_id: TopicId::new("bench"),
        author: Some(Author::new(UserId(id % 16), "bench")),
        content: format!("comment {}", id),
        reply_to: reply_to.map(CommentId),
        created_at: Timestamp(id as i64),
        edited: false,
        deleted: false,
        score: 0,
    }
}

fn drain(inboxes: &[Inbox]) {
    for inbox in inboxes {
        while inbox.try_recv().is_ok() {}
    }
}

/// Benchmark one broadcast to a group of varying size
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    for subscribers in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &n| {
                let registry = ChannelRegistry::with_config(ChannelConfig { buffer_size: 64 });
                let topic = TopicId::new("bench");
                let inboxes: Vec<Inbox> = (0..n)
                    .map(|_| {
                        let inbox = registry.open();
                        registry.join(&topic, inbox.id).unwrap();
                        inbox
                    })
                    .collect();

                b.iter(|| {
                    black_box(registry.publish_comment_added(comment(1, None), 1));
                    drain(&inboxes);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a broadcast while many unrelated topics are populated
fn bench_broadcast_isolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast_isolation");

    for topics in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("topics", topics), &topics, |b, &n| {
            let registry = ChannelRegistry::new();
            // Keep every inbox alive so no connection gets pruned
            let _inboxes: Vec<Inbox> = (0..n)
                .map(|i| {
                    let inbox = registry.open();
                    registry
                        .join(&TopicId::new(format!("topic-{}", i)), inbox.id)
                        .unwrap();
                    inbox
                })
                .collect();
            let target = registry.open();
            let topic = TopicId::new("target");
            registry.join(&topic, target.id).unwrap();

            b.iter(|| {
                black_box(registry.publish_comment_deleted(&topic, CommentId(1), 0));
                while target.try_recv().is_ok() {}
            });
        });
    }

    group.finish();
}

/// Benchmark join/leave churn on a single topic
fn bench_membership_churn(c: &mut Criterion) {
    let registry = ChannelRegistry::new();
    let topic = TopicId::new("bench");
    let inbox = registry.open();

    c.bench_function("join_leave", |b| {
        b.iter(|| {
            registry.join(&topic, inbox.id).unwrap();
            registry.leave(&topic, inbox.id);
        });
    });
}

/// Benchmark thread projection over lists of varying size
fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    let config = ProjectionConfig::default();

    for size in [10, 100, 1000] {
        // One top-level comment followed by three replies, repeated
        let comments: Vec<Comment> = (1..=size as u64)
            .map(|id| {
                let offset = (id - 1) % 4;
                let reply_to = if offset == 0 { None } else { Some(id - offset) };
                comment(id, reply_to)
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("comments", size), &comments, |b, comments| {
            b.iter(|| black_box(project(comments, &config)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_broadcast,
    bench_broadcast_isolation,
    bench_membership_churn,
    bench_projection,
);
criterion_main!(benches);
