//! Rendering projection: canonical list to top-level threads with replies.

use crate::types::{Comment, CommentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do with replies whose top-level parent cannot be shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Keep the replies under a "removed comment" placeholder.
    #[default]
    Placeholder,
    /// Hide the replies along with their parent.
    ///
    /// Opting in gives up the guarantee that deleting a comment never
    /// removes its replies from view; under `Placeholder` they always render.
    Hide,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub orphans: OrphanPolicy,
}

/// Head of a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadHead<'a> {
    Comment(&'a Comment),
    /// The parent was deleted, lost its author, or is missing from the list.
    Removed(CommentId),
}

/// A top-level item and its replies, in canonical order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thread<'a> {
    pub head: ThreadHead<'a>,
    pub replies: Vec<&'a Comment>,
}

impl<'a> Thread<'a> {
    pub fn id(&self) -> CommentId {
        match self.head {
            ThreadHead::Comment(c) => c.id,
            ThreadHead::Removed(id) => id,
        }
    }

    pub fn comment(&self) -> Option<&'a Comment> {
        match self.head {
            ThreadHead::Comment(c) => Some(c),
            ThreadHead::Removed(_) => None,
        }
    }

    pub fn reply_ids(&self) -> Vec<CommentId> {
        self.replies.iter().map(|r| r.id).collect()
    }
}

/// Resolve the top-level ancestor a reply belongs under.
///
/// Replies to replies are flattened onto the first top-level ancestor.
fn root_of(comment: &Comment, index: &HashMap<CommentId, &Comment>) -> CommentId {
    let mut current = comment;
    // Bounded walk; a malformed cycle ends at the last id seen.
    for _ in 0..=index.len() {
        match current.reply_to {
            None => return current.id,
            Some(parent) => match index.get(&parent) {
                Some(p) => current = p,
                None => return parent,
            },
        }
    }
    current.reply_to.unwrap_or(current.id)
}

/// Group `comments` into threads.
///
/// Top-level items keep the order of the canonical list and each thread's
/// replies keep it too. Replies whose parent is absent from the list are
/// grouped under placeholders after the listed threads.
pub fn project<'a>(comments: &'a [Comment], config: &ProjectionConfig) -> Vec<Thread<'a>> {
    let mut index: HashMap<CommentId, &Comment> = HashMap::with_capacity(comments.len());
    for comment in comments {
        index.entry(comment.id).or_insert(comment);
    }

    let mut slots: Vec<(CommentId, Option<&Comment>, Vec<&Comment>)> = Vec::new();
    let mut slot_of: HashMap<CommentId, usize> = HashMap::new();

    for comment in comments.iter().filter(|c| c.is_top_level()) {
        if slot_of.contains_key(&comment.id) {
            continue;
        }
        slot_of.insert(comment.id, slots.len());
        slots.push((comment.id, Some(comment), Vec::new()));
    }

    for reply in comments.iter().filter(|c| !c.is_top_level()) {
        if !reply.is_renderable() {
            continue;
        }
        let root = root_of(reply, &index);
        let slot = *slot_of.entry(root).or_insert_with(|| {
            slots.push((root, None, Vec::new()));
            slots.len() - 1
        });
        slots[slot].2.push(reply);
    }

    slots
        .into_iter()
        .filter_map(|(id, head, replies)| match head {
            Some(c) if c.is_renderable() => Some(Thread {
                head: ThreadHead::Comment(c),
                replies,
            }),
            _ if replies.is_empty() || config.orphans == OrphanPolicy::Hide => None,
            _ => Some(Thread {
                head: ThreadHead::Removed(id),
                replies,
            }),
        })
        .collect()
}
