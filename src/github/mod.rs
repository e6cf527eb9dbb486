//! GitHub API client used by plugin handlers.
//!
//! Plugins talk to the hosting service only through the [`VcsClient`] trait,
//! so they can be tested against an in-memory client.

mod client;
mod error;

pub use client::{OctocrabClient, VcsClient};
pub use error::{GitHubApiError, GitHubErrorKind};
