//! In-process comment service that publishes through a [`ChannelRegistry`].
//!
//! Commits every mutation, then broadcasts the matching event to the
//! topic's group, the same way a deployed server would. Useful as a
//! deterministic harness for the client-side lifecycle.

use crate::channels::ChannelRegistry;
use crate::error::{Result, SyncError};
use crate::reconcile::CommentApi;
use crate::types::{
    Author, Comment, CommentId, CommentList, NewComment, Timestamp, TopicId, UserId, VoteSummary,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A stored comment; the author is joined in on read.
#[derive(Clone, Debug)]
struct StoredComment {
    id: CommentId,
    topic: TopicId,
    author: UserId,
    content: String,
    reply_to: Option<CommentId>,
    created_at: Timestamp,
    edited: bool,
    deleted: bool,
    score: i64,
}

#[derive(Default)]
struct Tables {
    topics: HashSet<TopicId>,
    users: HashMap<UserId, Author>,
    /// In creation order.
    comments: Vec<StoredComment>,
    next_id: u64,
    /// Remaining calls to fail with `Transient`.
    fail_next: u32,
}

impl Tables {
    fn check_available(&mut self) -> Result<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(SyncError::Transient("injected failure".into()));
        }
        Ok(())
    }

    fn live(&self, id: CommentId) -> Result<usize> {
        self.comments
            .iter()
            .position(|c| c.id == id && !c.deleted)
            .ok_or(SyncError::CommentNotFound(id))
    }

    fn count(&self, topic: &TopicId) -> u64 {
        self.comments
            .iter()
            .filter(|c| &c.topic == topic && !c.deleted)
            .count() as u64
    }

    fn view(&self, stored: &StoredComment) -> Comment {
        Comment {
            id: stored.id,
            topic_id: stored.topic.clone(),
            author: self.users.get(&stored.author).cloned(),
            content: stored.content.clone(),
            reply_to: stored.reply_to,
            created_at: stored.created_at,
            edited: stored.edited,
            deleted: stored.deleted,
            score: stored.score,
        }
    }

    fn owned_by(&self, index: usize, user: UserId) -> Result<()> {
        let comment = &self.comments[index];
        if comment.author != user {
            return Err(SyncError::Unauthorized(format!(
                "user {user} does not own comment {}",
                comment.id
            )));
        }
        Ok(())
    }
}

/// Reference comment service.
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    channels: Arc<ChannelRegistry>,
}

impl MemoryBackend {
    pub fn new(channels: Arc<ChannelRegistry>) -> Arc<Self> {
        Arc::new(Self {
            tables: Mutex::new(Tables {
                next_id: 1,
                ..Default::default()
            }),
            channels,
        })
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    pub fn create_topic(&self, topic: TopicId) {
        self.tables.lock().topics.insert(topic);
    }

    pub fn register_user(&self, author: Author) {
        self.tables.lock().users.insert(author.id, author);
    }

    /// Remove a user record. Their comments stay but lose their author.
    pub fn remove_user(&self, user: UserId) {
        self.tables.lock().users.remove(&user);
    }

    /// Fail the next `n` calls with `Transient`.
    pub fn fail_next(&self, n: u32) {
        self.tables.lock().fail_next = n;
    }

    /// An API client acting as `user`.
    pub fn client(self: &Arc<Self>, user: UserId) -> MemoryClient {
        MemoryClient {
            backend: Arc::clone(self),
            user,
        }
    }

    /// The canonical list for `topic`.
    ///
    /// Deleted comments are omitted, except top-level ones that still have
    /// live replies, which are returned as tombstones with no content.
    pub fn fetch(&self, topic: &TopicId) -> Result<CommentList> {
        let mut tables = self.tables.lock();
        tables.check_available()?;
        if !tables.topics.contains(topic) {
            return Err(SyncError::TopicNotFound(topic.clone()));
        }

        let live_parents: HashSet<CommentId> = tables
            .comments
            .iter()
            .filter(|c| &c.topic == topic && !c.deleted)
            .filter_map(|c| c.reply_to)
            .collect();

        let comments = tables
            .comments
            .iter()
            .filter(|c| &c.topic == topic)
            .filter(|c| !c.deleted || (c.reply_to.is_none() && live_parents.contains(&c.id)))
            .map(|c| {
                let mut comment = tables.view(c);
                if comment.deleted {
                    comment.content.clear();
                }
                comment
            })
            .collect();

        Ok(CommentList {
            comments,
            comment_count: tables.count(topic),
        })
    }

    /// Commit a new comment and broadcast `commentAdded`.
    pub fn create(&self, user: UserId, input: NewComment) -> Result<Comment> {
        let mut tables = self.tables.lock();
        tables.check_available()?;
        if input.user_id != user || !tables.users.contains_key(&user) {
            return Err(SyncError::Unauthorized(format!("cannot post as user {}", input.user_id)));
        }
        if !tables.topics.contains(&input.topic_id) {
            return Err(SyncError::TopicNotFound(input.topic_id));
        }
        let content = input.content.trim();
        if content.is_empty() {
            return Err(SyncError::EmptyBody);
        }

        let reply_to = match input.reply_to {
            None => None,
            Some(target) => {
                let parent = &tables.comments[tables.live(target)?];
                if parent.topic != input.topic_id {
                    return Err(SyncError::InvalidReplyTarget(target));
                }
                Some(parent.reply_to.unwrap_or(parent.id))
            }
        };

        let id = CommentId(tables.next_id);
        tables.next_id += 1;
        let stored = StoredComment {
            id,
            topic: input.topic_id.clone(),
            author: user,
            content: content.to_string(),
            reply_to,
            created_at: Timestamp::now(),
            edited: false,
            deleted: false,
            score: 0,
        };
        let comment = tables.view(&stored);
        tables.comments.push(stored);

        let count = tables.count(&input.topic_id);
        tracing::info!(topic = %input.topic_id, comment = %id, "comment created");
        self.channels.publish_comment_added(comment.clone(), count);
        Ok(comment)
    }

    /// Replace a comment's body and broadcast `commentUpdated`.
    pub fn update(&self, user: UserId, id: CommentId, content: &str) -> Result<Comment> {
        let mut tables = self.tables.lock();
        tables.check_available()?;
        let index = tables.live(id)?;
        tables.owned_by(index, user)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::EmptyBody);
        }

        let stored = &mut tables.comments[index];
        stored.content = content.to_string();
        stored.edited = true;
        let topic = stored.topic.clone();
        let comment = tables.view(&tables.comments[index]);

        let count = tables.count(&topic);
        tracing::info!(topic = %topic, comment = %id, "comment updated");
        self.channels.publish_comment_updated(comment.clone(), count);
        Ok(comment)
    }

    /// Soft-delete a comment and broadcast `commentDeleted`. Replies are kept.
    pub fn delete(&self, user: UserId, id: CommentId) -> Result<()> {
        let mut tables = self.tables.lock();
        tables.check_available()?;
        let index = tables.live(id)?;
        tables.owned_by(index, user)?;

        tables.comments[index].deleted = true;
        let topic = tables.comments[index].topic.clone();

        let count = tables.count(&topic);
        tracing::info!(topic = %topic, comment = %id, "comment deleted");
        self.channels.publish_comment_deleted(&topic, id, count);
        Ok(())
    }

    /// Adjust a comment's score and broadcast `voteUpdated`.
    pub fn vote(&self, id: CommentId, delta: i64) -> Result<VoteSummary> {
        let mut tables = self.tables.lock();
        tables.check_available()?;
        let index = tables.live(id)?;

        let stored = &mut tables.comments[index];
        stored.score += delta;
        let summary = VoteSummary {
            comment_id: id,
            score: stored.score,
        };
        let topic = stored.topic.clone();

        self.channels.publish_vote_updated(&topic, summary.clone());
        Ok(summary)
    }
}

/// [`CommentApi`] bound to one acting user.
#[derive(Clone)]
pub struct MemoryClient {
    backend: Arc<MemoryBackend>,
    user: UserId,
}

impl MemoryClient {
    pub fn user(&self) -> UserId {
        self.user
    }
}

impl CommentApi for MemoryClient {
    fn fetch_comments(&self, topic: &TopicId) -> Result<CommentList> {
        self.backend.fetch(topic)
    }

    fn create_comment(&self, input: NewComment) -> Result<Comment> {
        self.backend.create(self.user, input)
    }

    fn update_comment(&self, id: CommentId, content: &str) -> Result<Comment> {
        self.backend.update(self.user, id, content)
    }

    fn delete_comment(&self, id: CommentId) -> Result<()> {
        self.backend.delete(self.user, id)
    }
}
