//! GitHub API error types.
//!
//! Errors are classified as transient or permanent. Handler failures are not
//! retried by the dispatcher, but the classification is logged so an operator
//! can tell a flaky upstream from a misconfiguration.

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Likely to succeed later: 5xx, 429, a rate-limited 403, or a network
    /// failure with no response at all.
    Transient,

    /// Requires a change on our side (credentials, permissions, bad input).
    Permanent,
}

impl GitHubErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, GitHubErrorKind::Transient)
    }
}

/// A GitHub API error with its classification.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {code}): {}", self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    fn bare(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        GitHubApiError {
            kind,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::bare(GitHubErrorKind::Permanent, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::bare(GitHubErrorKind::Transient, message)
    }

    /// Classifies an octocrab error by status code, falling back to the
    /// message text when no status is available.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = match &err {
            octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
            _ => None,
        };
        let message = err.to_string();
        GitHubApiError {
            kind: classify(status_code, &message),
            status_code,
            message,
            source: Some(err),
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "api rate", "abuse detection"];

const NETWORK_MARKERS: &[&str] = &["timeout", "timed out", "connection", "network", "dns"];

fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    let transient = match status_code {
        Some(429) | Some(500..=599) => true,
        Some(403) => mentions_any(message, RATE_LIMIT_MARKERS),
        Some(_) => false,
        None => mentions_any(message, NETWORK_MARKERS),
    };
    if transient {
        GitHubErrorKind::Transient
    } else {
        GitHubErrorKind::Permanent
    }
}

fn mentions_any(message: &str, markers: &[&str]) -> bool {
    let message = message.to_lowercase();
    markers.iter().any(|m| message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_status() {
        assert_eq!(classify(Some(429), ""), GitHubErrorKind::Transient);
        assert_eq!(classify(Some(502), ""), GitHubErrorKind::Transient);
        assert_eq!(classify(Some(404), "Not Found"), GitHubErrorKind::Permanent);
        assert_eq!(
            classify(Some(403), "API rate limit exceeded"),
            GitHubErrorKind::Transient
        );
        assert_eq!(
            classify(Some(403), "Resource not accessible by integration"),
            GitHubErrorKind::Permanent
        );
    }

    #[test]
    fn classify_without_status_uses_message() {
        assert_eq!(
            classify(None, "connection reset by peer"),
            GitHubErrorKind::Transient
        );
        assert_eq!(classify(None, "request timed out"), GitHubErrorKind::Transient);
        assert_eq!(
            classify(None, "invalid header value"),
            GitHubErrorKind::Permanent
        );
    }

    #[test]
    fn display_includes_status_when_known() {
        let err = GitHubApiError {
            kind: GitHubErrorKind::Permanent,
            status_code: Some(404),
            message: "Not Found".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "GitHub API error (HTTP 404): Not Found");
        assert_eq!(
            GitHubApiError::transient("boom").to_string(),
            "GitHub API error: boom"
        );
    }

    #[test]
    fn retriable_follows_kind() {
        assert!(GitHubApiError::transient("x").is_retriable());
        assert!(!GitHubApiError::permanent("x").is_retriable());
    }
}
