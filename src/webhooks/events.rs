//! Typed inbound webhook events.
//!
//! Only the events some plugin cares about are represented. Each variant
//! carries the origin repository so the dispatcher can route it without
//! knowing anything else about the payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, PrNumber, RepoId};

/// Discriminant of an [`InboundEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A comment on a merge request (or plain issue) conversation.
    MergeRequestComment,
}

impl EventKind {
    /// The event-type header value this kind is delivered under.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MergeRequestComment => "issue_comment",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded webhook event. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    MergeRequestComment(CommentEvent),
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::MergeRequestComment(_) => EventKind::MergeRequestComment,
        }
    }

    /// Returns the repository this event originated from.
    pub fn repo(&self) -> &RepoId {
        match self {
            InboundEvent::MergeRequestComment(e) => &e.repo,
        }
    }

    /// Returns the login of the user who triggered the event.
    pub fn actor(&self) -> &str {
        match self {
            InboundEvent::MergeRequestComment(e) => &e.author_login,
        }
    }
}

/// Action performed on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,
}

/// A comment event.
///
/// GitHub delivers comments on the PR conversation tab as `issue_comment`
/// events; `pr_number` is only set when the issue is actually a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub repo: RepoId,
    pub action: CommentAction,

    /// The merge request the comment is on, if any.
    pub pr_number: Option<PrNumber>,

    pub comment_id: CommentId,

    /// Comment text. Empty for `deleted` actions.
    pub body: String,

    pub author_login: String,
}
