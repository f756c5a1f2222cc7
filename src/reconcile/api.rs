//! The request/response contract of the comment service.

use crate::error::Result;
use crate::types::{Comment, CommentId, CommentList, NewComment, TopicId};
use std::rc::Rc;
use std::sync::Arc;

/// Comment service as consumed by the controller.
///
/// Every call may fail with `CommentNotFound`/`TopicNotFound`,
/// `Unauthorized`, or `Transient`. Only `Transient` reads are retried.
pub trait CommentApi {
    /// The canonical list for a topic.
    fn fetch_comments(&self, topic: &TopicId) -> Result<CommentList>;

    fn create_comment(&self, input: NewComment) -> Result<Comment>;

    fn update_comment(&self, id: CommentId, content: &str) -> Result<Comment>;

    fn delete_comment(&self, id: CommentId) -> Result<()>;
}

impl<T: CommentApi + ?Sized> CommentApi for &T {
    fn fetch_comments(&self, topic: &TopicId) -> Result<CommentList> {
        (**self).fetch_comments(topic)
    }

    fn create_comment(&self, input: NewComment) -> Result<Comment> {
        (**self).create_comment(input)
    }

    fn update_comment(&self, id: CommentId, content: &str) -> Result<Comment> {
        (**self).update_comment(id, content)
    }

    fn delete_comment(&self, id: CommentId) -> Result<()> {
        (**self).delete_comment(id)
    }
}

impl<T: CommentApi + ?Sized> CommentApi for Arc<T> {
    fn fetch_comments(&self, topic: &TopicId) -> Result<CommentList> {
        (**self).fetch_comments(topic)
    }

    fn create_comment(&self, input: NewComment) -> Result<Comment> {
        (**self).create_comment(input)
    }

    fn update_comment(&self, id: CommentId, content: &str) -> Result<Comment> {
        (**self).update_comment(id, content)
    }

    fn delete_comment(&self, id: CommentId) -> Result<()> {
        (**self).delete_comment(id)
    }
}

impl<T: CommentApi + ?Sized> CommentApi for Rc<T> {
    fn fetch_comments(&self, topic: &TopicId) -> Result<CommentList> {
        (**self).fetch_comments(topic)
    }

    fn create_comment(&self, input: NewComment) -> Result<Comment> {
        (**self).create_comment(input)
    }

    fn update_comment(&self, id: CommentId, content: &str) -> Result<Comment> {
        (**self).update_comment(id, content)
    }

    fn delete_comment(&self, id: CommentId) -> Result<()> {
        (**self).delete_comment(id)
    }
}
