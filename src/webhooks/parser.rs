//! Webhook payload decoding.
//!
//! Decoders are looked up by the event-type header value in a
//! [`DecoderTable`]. Supporting a new event kind means registering one more
//! decoder, not growing a match.
//!
//! # Outcomes
//!
//! - `Ok(Some(event))` - a registered event type decoded successfully
//! - `Ok(None)` - no decoder for this event type (ignored, not an error)
//! - `Err(e)` - malformed payload or missing required fields

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{CommentId, PrNumber, RepoId};

use super::events::{CommentAction, CommentEvent, EventKind, InboundEvent};

#[derive(Debug, Error)]
pub enum ParseError {
    /// Not JSON, or JSON missing a field the decoder needs.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognized {event_type} action {action:?}")]
    UnknownAction {
        event_type: &'static str,
        action: String,
    },
}

/// Decodes a raw payload into an event.
pub type Decoder = fn(&[u8]) -> Result<InboundEvent, ParseError>;

/// Registry of payload decoders keyed by event-type header value.
#[derive(Debug, Clone, Default)]
pub struct DecoderTable {
    decoders: HashMap<String, Decoder>,
}

impl DecoderTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with decoders for every GitHub event kind we handle.
    pub fn github() -> Self {
        let mut table = Self::new();
        table.register(EventKind::MergeRequestComment.as_str(), decode_issue_comment);
        table
    }

    /// Registers a decoder; a later registration for the same event type wins.
    pub fn register(&mut self, event_type: impl Into<String>, decoder: Decoder) {
        self.decoders.insert(event_type.into(), decoder);
    }

    /// Returns whether a decoder exists for `event_type`.
    pub fn handles(&self, event_type: &str) -> bool {
        self.decoders.contains_key(event_type)
    }

    /// Decodes `payload` with the decoder registered for `event_type`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hookline::webhooks::DecoderTable;
    ///
    /// let payload = br#"{
    ///     "action": "created",
    ///     "comment": { "id": 1, "body": "/lgtm", "user": { "login": "octocat" } },
    ///     "issue": { "number": 7, "pull_request": { "url": "..." } },
    ///     "repository": { "owner": { "login": "acme" }, "name": "widgets" }
    /// }"#;
    ///
    /// let table = DecoderTable::github();
    /// let event = table.decode("issue_comment", payload).unwrap().unwrap();
    /// assert_eq!(event.repo().to_string(), "acme/widgets");
    ///
    /// // Event types without a decoder are ignored.
    /// assert!(table.decode("deployment", payload).unwrap().is_none());
    /// ```
    pub fn decode(
        &self,
        event_type: &str,
        payload: &[u8],
    ) -> Result<Option<InboundEvent>, ParseError> {
        match self.decoders.get(event_type) {
            Some(decoder) => decoder(payload).map(Some),
            None => Ok(None),
        }
    }
}

// Shapes shared by several payloads. Fields we never read are left out;
// serde ignores unknown keys.

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

// issue_comment

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: String,
    comment: RawComment,
    issue: RawIssue,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    body: Option<String>,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    // Present only when the issue is a pull request.
    pull_request: Option<serde_json::Value>,
}

fn decode_issue_comment(payload: &[u8]) -> Result<InboundEvent, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => CommentAction::Created,
        "edited" => CommentAction::Edited,
        "deleted" => CommentAction::Deleted,
        other => {
            return Err(ParseError::UnknownAction {
                event_type: "issue_comment",
                action: other.to_string(),
            });
        }
    };

    let pr_number = raw.issue.pull_request.map(|_| PrNumber(raw.issue.number));

    Ok(InboundEvent::MergeRequestComment(CommentEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        action,
        pr_number,
        comment_id: CommentId(raw.comment.id),
        body: raw.comment.body.unwrap_or_default(),
        author_login: raw.comment.user.login,
    }))
}
