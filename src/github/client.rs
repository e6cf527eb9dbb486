//! The VCS client handlers use to mutate remote resources.
//!
//! [`VcsClient`] is the seam between plugins and the hosting service.
//! [`OctocrabClient`] implements it against the GitHub REST API; tests use an
//! in-memory implementation. Implementations must be safe to share between
//! concurrently running handlers. The dispatcher does not pool or rate-limit
//! calls.

use async_trait::async_trait;
use octocrab::Octocrab;

use super::error::GitHubApiError;
use crate::config::AppConfig;
use crate::types::{PrNumber, RepoId};

/// Page size used when listing labels.
const LABELS_PER_PAGE: u8 = 100;

/// Operations plugins may perform on a merge request.
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Returns the names of the labels currently on the merge request.
    async fn labels(&self, repo: &RepoId, pr: PrNumber) -> Result<Vec<String>, GitHubApiError>;

    /// Adds labels to the merge request, keeping existing ones.
    async fn add_labels(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        labels: &[String],
    ) -> Result<(), GitHubApiError>;

    /// Removes one label from the merge request.
    async fn remove_label(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        label: &str,
    ) -> Result<(), GitHubApiError>;

    /// Posts a comment on the merge request conversation.
    async fn create_comment(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        body: &str,
    ) -> Result<(), GitHubApiError>;
}

/// A [`VcsClient`] backed by octocrab.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds a client from the application settings.
    ///
    /// Uses `token` for authentication when present and `base_url` to target
    /// a GitHub Enterprise instance.
    pub fn from_config(config: &AppConfig) -> Result<Self, GitHubApiError> {
        let mut builder = Octocrab::builder();
        if let Some(token) = &config.token {
            builder = builder.personal_token(token.clone());
        }
        if let Some(base_url) = &config.base_url {
            builder = builder
                .base_uri(base_url.as_str())
                .map_err(GitHubApiError::from_octocrab)?;
        }
        let client = builder.build().map_err(GitHubApiError::from_octocrab)?;
        Ok(Self::new(client))
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl VcsClient for OctocrabClient {
    async fn labels(&self, repo: &RepoId, pr: PrNumber) -> Result<Vec<String>, GitHubApiError> {
        let mut page = 1u32;
        let mut names = Vec::new();

        loop {
            let result = self
                .client
                .issues(&repo.owner, &repo.repo)
                .list_labels_for_issue(pr.0)
                .per_page(LABELS_PER_PAGE)
                .page(page)
                .send()
                .await
                .map_err(GitHubApiError::from_octocrab)?;

            let is_last_page = result.items.len() < usize::from(LABELS_PER_PAGE);
            names.extend(result.items.into_iter().map(|label| label.name));

            if is_last_page {
                break;
            }
            page += 1;
        }

        Ok(names)
    }

    async fn add_labels(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        labels: &[String],
    ) -> Result<(), GitHubApiError> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .add_labels(pr.0, labels)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }

    async fn remove_label(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        label: &str,
    ) -> Result<(), GitHubApiError> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .remove_label(pr.0, label)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }

    async fn create_comment(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        body: &str,
    ) -> Result<(), GitHubApiError> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .create_comment(pr.0, body)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }
}
