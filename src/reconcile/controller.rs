//! Reconciliation controller: the client-side owner of what the user sees.

use crate::channels::TopicEvent;
use crate::error::{ErrorKind, Result, SyncError};
use crate::subscriptions::TopicHandlers;
use crate::types::{Comment, CommentId, CommentList, NewComment, TopicId, UserId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use super::api::CommentApi;
use super::projection::{project, ProjectionConfig, Thread, ThreadHead};

/// Controller configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Extra attempts for a canonical fetch that failed transiently.
    /// Default: 2
    pub read_retries: u32,

    /// Sigil used when seeding a reply with a mention.
    /// Default: '@'
    pub mention_prefix: char,

    pub projection: ProjectionConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            read_retries: 2,
            mention_prefix: '@',
            projection: ProjectionConfig::default(),
        }
    }
}

/// Identifies one issued canonical fetch.
///
/// A token only commits while its activation is still current; switching
/// topics or tearing down invalidates every outstanding token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchToken {
    topic: TopicId,
    activation: u64,
    request: u64,
}

impl FetchToken {
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    /// Monotonically increasing per controller.
    pub fn request(&self) -> u64 {
        self.request
    }
}

/// Comment the compose field is replying to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyTarget {
    pub comment_id: CommentId,
    pub author_name: String,
}

/// In-progress edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditDraft {
    pub comment_id: CommentId,
    pub draft: String,
}

/// Keeps one view's comment list eventually consistent with the server.
///
/// Every notification triggers a full refetch whose result replaces local
/// state wholesale; event payloads are never spliced into the list. Mutations
/// do not touch the list either: the broadcast they cause brings the change
/// into view.
pub struct Controller<A: CommentApi> {
    api: A,
    viewer: UserId,
    config: ControllerConfig,

    topic: Option<TopicId>,
    activation: u64,
    next_request: u64,
    /// Request whose result is on screen.
    applied: Option<u64>,
    /// Initial load still outstanding.
    initial: Option<u64>,

    list: CommentList,
    count_hint: Option<u64>,

    compose: String,
    reply: Option<ReplyTarget>,
    edit: Option<EditDraft>,
    last_error: Option<SyncError>,
}

impl<A: CommentApi> Controller<A> {
    pub fn new(api: A, viewer: UserId) -> Self {
        Self::with_config(api, viewer, ControllerConfig::default())
    }

    pub fn with_config(api: A, viewer: UserId, config: ControllerConfig) -> Self {
        Self {
            api,
            viewer,
            config,
            topic: None,
            activation: 0,
            next_request: 1,
            applied: None,
            initial: None,
            list: CommentList::default(),
            count_hint: None,
            compose: String::new(),
            reply: None,
            edit: None,
            last_error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn viewer(&self) -> UserId {
        self.viewer
    }

    // --- Fetching ---

    /// Make `topic` the active one and issue its initial fetch token.
    ///
    /// Local state is reset and every token from the previous activation
    /// becomes stale.
    pub fn activate(&mut self, topic: TopicId) -> FetchToken {
        self.clear_view();
        self.topic = Some(topic.clone());
        let token = self.issue(topic);
        self.initial = Some(token.request);
        token
    }

    /// Leave the active topic. Results of in-flight fetches are ignored.
    pub fn deactivate(&mut self) {
        self.clear_view();
    }

    fn clear_view(&mut self) {
        self.activation += 1;
        self.topic = None;
        self.applied = None;
        self.initial = None;
        self.list = CommentList::default();
        self.count_hint = None;
        self.compose.clear();
        self.reply = None;
        self.edit = None;
        self.last_error = None;
    }

    fn issue(&mut self, topic: TopicId) -> FetchToken {
        let request = self.next_request;
        self.next_request += 1;
        FetchToken {
            topic,
            activation: self.activation,
            request,
        }
    }

    /// Issue a token for a refetch of the active topic.
    pub fn begin_fetch(&mut self) -> Result<FetchToken> {
        let topic = self.active_topic()?;
        Ok(self.issue(topic))
    }

    /// Commit the result of a fetch.
    ///
    /// Among current tokens the last one to resolve wins. Returns `Ok(false)`
    /// when the token is stale and the result was ignored.
    pub fn complete_fetch(&mut self, token: FetchToken, result: Result<CommentList>) -> Result<bool> {
        if token.activation != self.activation || self.topic.as_ref() != Some(&token.topic) {
            tracing::debug!(topic = %token.topic, request = token.request, "discarding stale fetch result");
            return Ok(false);
        }
        if self.initial == Some(token.request) {
            self.initial = None;
        }

        match result {
            Ok(list) => {
                tracing::debug!(
                    topic = %token.topic,
                    request = token.request,
                    comments = list.comments.len(),
                    comment_count = list.comment_count,
                    "applied canonical list"
                );
                self.list = list;
                self.applied = Some(token.request);
                self.count_hint = None;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(topic = %token.topic, request = token.request, error = %e, "canonical fetch failed");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn fetch_with_retry(&self, topic: &TopicId) -> Result<CommentList> {
        let mut attempt = 0;
        loop {
            match self.api.fetch_comments(topic) {
                Err(e) if e.is_retryable() && attempt < self.config.read_retries => {
                    attempt += 1;
                    tracing::debug!(topic = %topic, attempt, error = %e, "retrying canonical fetch");
                }
                result => return result,
            }
        }
    }

    /// Load the canonical list for a newly activated topic.
    pub fn load_initial(&mut self, topic: TopicId) -> Result<()> {
        let token = self.activate(topic);
        let result = self.fetch_with_retry(&token.topic);
        self.complete_fetch(token, result).map(|_| ())
    }

    /// Refetch the active topic and replace local state.
    pub fn refresh(&mut self) -> Result<()> {
        let token = self.begin_fetch()?;
        let result = self.fetch_with_retry(&token.topic);
        self.complete_fetch(token, result).map(|_| ())
    }

    /// React to any inbound notification by refetching.
    ///
    /// Events for a topic other than the active one are ignored.
    pub fn on_event(&mut self, event: &TopicEvent) -> Result<()> {
        if self.topic.as_ref() != Some(&event.topic) {
            tracing::debug!(topic = %event.topic, event = event.name(), "ignoring event for inactive topic");
            return Ok(());
        }
        if let Some(count) = event.event.comment_count() {
            self.count_hint = Some(count);
        }
        self.refresh()
    }

    /// Handlers that route every event type into `on_event`.
    pub fn handlers(this: &Rc<RefCell<Self>>) -> TopicHandlers
    where
        A: 'static,
    {
        let controller = Rc::clone(this);
        TopicHandlers::any(move |event| {
            if let Err(e) = controller.borrow_mut().on_event(event) {
                tracing::warn!(event = event.name(), error = %e, "refetch after event failed");
            }
        })
    }

    // --- Mutations ---

    fn active_topic(&self) -> Result<TopicId> {
        self.topic.clone().ok_or(SyncError::NoActiveTopic)
    }

    fn find(&self, id: CommentId) -> Option<&Comment> {
        self.list.comments.iter().find(|c| c.id == id)
    }

    fn reject(&mut self, e: SyncError) -> SyncError {
        self.last_error = Some(e.clone());
        e
    }

    /// Record a failed server call. After a rejection the server's view is
    /// refetched; vanished entities leave the list that way.
    fn failed(&mut self, action: &str, e: SyncError) -> SyncError {
        tracing::warn!(action, error = %e, "action failed");
        if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::Authorization) {
            if let Err(refetch) = self.refresh() {
                tracing::debug!(error = %refetch, "refetch after rejection failed");
            }
        }
        self.reject(e)
    }

    fn check_owner(&self, id: CommentId) -> Result<()> {
        match self.find(id) {
            Some(comment) if !self.can_modify(comment) => Err(SyncError::Unauthorized(format!(
                "comment {id} belongs to another user"
            ))),
            _ => Ok(()),
        }
    }

    /// Resolve a reply target against the current list, flattening replies
    /// onto their top-level parent.
    fn resolve_reply_target(&self, target: CommentId) -> Result<CommentId> {
        match self.find(target) {
            None => Err(SyncError::InvalidReplyTarget(target)),
            Some(comment) => Ok(comment.reply_to.unwrap_or(comment.id)),
        }
    }

    /// Post a new comment or reply.
    ///
    /// An empty body is rejected without a network call. Nothing is inserted
    /// locally; the broadcast-triggered refetch brings the comment into view.
    pub fn submit_create(&mut self, body: &str, reply_to: Option<CommentId>) -> Result<Comment> {
        let content = body.trim();
        if content.is_empty() {
            return Err(self.reject(SyncError::EmptyBody));
        }
        let topic = self.active_topic()?;
        let reply_to = match reply_to {
            Some(target) => match self.resolve_reply_target(target) {
                Ok(id) => Some(id),
                Err(e) => return Err(self.reject(e)),
            },
            None => None,
        };

        let input = NewComment {
            user_id: self.viewer,
            topic_id: topic,
            content: content.to_string(),
            reply_to,
        };
        match self.api.create_comment(input) {
            Ok(comment) => {
                self.compose.clear();
                self.reply = None;
                self.last_error = None;
                Ok(comment)
            }
            Err(e) => Err(self.failed("create", e)),
        }
    }

    /// Submit the compose field against the current reply target.
    pub fn submit_compose(&mut self) -> Result<Comment> {
        let body = self.compose.clone();
        let reply_to = self.reply.as_ref().map(|r| r.comment_id);
        self.submit_create(&body, reply_to)
    }

    /// Replace a comment's body.
    pub fn submit_edit(&mut self, id: CommentId, body: &str) -> Result<Comment> {
        let content = body.trim();
        if content.is_empty() {
            return Err(self.reject(SyncError::EmptyBody));
        }
        if let Err(e) = self.check_owner(id) {
            return Err(self.reject(e));
        }

        match self.api.update_comment(id, content) {
            Ok(comment) => {
                self.edit = None;
                self.last_error = None;
                Ok(comment)
            }
            Err(e) => {
                // Rejections are final for this edit; transient failures keep the draft.
                if matches!(e.kind(), ErrorKind::Authorization | ErrorKind::NotFound) {
                    self.edit = None;
                }
                Err(self.failed("update", e))
            }
        }
    }

    /// Submit the in-progress edit.
    pub fn submit_edit_draft(&mut self) -> Result<Comment> {
        let Some(edit) = self.edit.clone() else {
            return Err(self.reject(SyncError::NotEditing));
        };
        self.submit_edit(edit.comment_id, &edit.draft)
    }

    /// Delete a comment. The list is left alone until the next refetch.
    pub fn submit_delete(&mut self, id: CommentId) -> Result<()> {
        if let Err(e) = self.check_owner(id) {
            return Err(self.reject(e));
        }
        match self.api.delete_comment(id) {
            Ok(()) => {
                if self.edit.as_ref().is_some_and(|e| e.comment_id == id) {
                    self.edit = None;
                }
                self.last_error = None;
                Ok(())
            }
            Err(e) => Err(self.failed("delete", e)),
        }
    }

    // --- Local compose/edit state ---

    /// Target a reply and seed the compose field with a mention.
    pub fn begin_reply(&mut self, id: CommentId, author_name: &str) {
        self.compose = format!("{}{} ", self.config.mention_prefix, author_name);
        self.reply = Some(ReplyTarget {
            comment_id: id,
            author_name: author_name.to_string(),
        });
    }

    pub fn cancel_reply(&mut self) {
        self.reply = None;
        self.compose.clear();
    }

    pub fn set_compose(&mut self, text: impl Into<String>) {
        self.compose = text.into();
    }

    /// Enter edit mode for one of the viewer's comments.
    pub fn begin_edit(&mut self, id: CommentId) -> Result<()> {
        let comment = self.find(id).ok_or(SyncError::CommentNotFound(id))?;
        if !self.can_modify(comment) {
            return Err(SyncError::Unauthorized(format!(
                "comment {id} belongs to another user"
            )));
        }
        let draft = comment.content.clone();
        self.edit = Some(EditDraft {
            comment_id: id,
            draft,
        });
        Ok(())
    }

    pub fn set_edit_draft(&mut self, text: impl Into<String>) {
        if let Some(edit) = self.edit.as_mut() {
            edit.draft = text.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    // --- View ---

    pub fn topic(&self) -> Option<&TopicId> {
        self.topic.as_ref()
    }

    /// The canonical list as last fetched.
    pub fn comments(&self) -> &[Comment] {
        &self.list.comments
    }

    /// Count from the last canonical fetch.
    pub fn comment_count(&self) -> u64 {
        self.list.comment_count
    }

    /// Count carried by the latest event, until the refetch it triggered lands.
    pub fn count_hint(&self) -> Option<u64> {
        self.count_hint
    }

    /// Request whose result is currently applied.
    pub fn applied_request(&self) -> Option<u64> {
        self.applied
    }

    /// True between `load_initial` being issued and resolving.
    pub fn is_loading(&self) -> bool {
        self.initial.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.threads().is_empty()
    }

    pub fn compose(&self) -> &str {
        &self.compose
    }

    pub fn reply_target(&self) -> Option<&ReplyTarget> {
        self.reply.as_ref()
    }

    /// "Replying to @name" while a reply is targeted.
    pub fn reply_label(&self) -> Option<String> {
        self.reply.as_ref().map(|r| {
            format!("Replying to {}{}", self.config.mention_prefix, r.author_name)
        })
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.edit.as_ref()
    }

    /// Inline message for the last failed action.
    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    /// Edit/delete affordances are offered only on the viewer's own comments.
    ///
    /// This is not an authorization check; the server enforces ownership.
    pub fn can_modify(&self, comment: &Comment) -> bool {
        comment.author_id() == Some(self.viewer)
    }

    /// Reply affordances are hidden while an edit is in progress.
    pub fn can_reply(&self) -> bool {
        self.edit.is_none()
    }

    /// Top-level threads with their replies.
    pub fn threads(&self) -> Vec<Thread<'_>> {
        project(&self.list.comments, &self.config.projection)
    }

    /// Every comment currently shown, in display order.
    pub fn visible_comments(&self) -> Vec<&Comment> {
        self.threads()
            .into_iter()
            .flat_map(|t| {
                let head = match t.head {
                    ThreadHead::Comment(c) => Some(c),
                    ThreadHead::Removed(_) => None,
                };
                head.into_iter().chain(t.replies)
            })
            .collect()
    }
}
