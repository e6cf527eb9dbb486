//! Shared test utilities and arbitrary generators for property-based testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;

use crate::config::{AgentOptions, AppConfig, ConfigAgent, RoutingConfig};
use crate::dispatch::Dispatcher;
use crate::github::{GitHubApiError, GitHubErrorKind, VcsClient};
use crate::plugins::{ExecutionContext, PluginRegistry};
use crate::types::{CommentId, PrNumber, RepoId};
use crate::webhooks::{CommentAction, CommentEvent, InboundEvent};

/// A `created` comment on merge request #1.
pub fn comment_event(owner: &str, repo: &str, actor: &str, body: &str) -> InboundEvent {
    InboundEvent::MergeRequestComment(CommentEvent {
        repo: RepoId::new(owner, repo),
        action: CommentAction::Created,
        pr_number: Some(PrNumber(1)),
        comment_id: CommentId(1001),
        body: body.to_string(),
        author_login: actor.to_string(),
    })
}

/// Builds a routing table from `(key, plugins)` pairs.
pub fn routing(entries: &[(&str, &[&str])]) -> RoutingConfig {
    RoutingConfig::new(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect(),
    )
}

/// Routing tables over a tiny key space so generated owners and repos
/// actually hit entries. Plugin names are drawn from `p`..`s`.
pub fn arb_routing_config() -> impl Strategy<Value = RoutingConfig> {
    prop::collection::btree_map(
        prop_oneof!["[a-c]", "[a-c]/[x-z]"],
        prop::collection::vec("[p-s]", 0..4),
        0..6,
    )
    .prop_map(|plugins: BTreeMap<String, Vec<String>>| RoutingConfig::new(plugins))
}

/// Invocations observed by a [`recording_registry`], as `plugin@owner/repo`.
pub type Invocations = Arc<Mutex<Vec<String>>>;

/// A registry where each named plugin records its invocation and succeeds.
pub fn recording_registry(names: &[&str]) -> (PluginRegistry, Invocations) {
    let invocations: Invocations = Arc::default();
    let mut registry = PluginRegistry::new();
    for name in names {
        let log = Arc::clone(&invocations);
        registry.register(*name, move |ctx: ExecutionContext, event: Arc<InboundEvent>| {
            let log = Arc::clone(&log);
            async move {
                log.lock()
                    .unwrap()
                    .push(format!("{}@{}", ctx.plugin(), event.repo()));
                Ok(())
            }
        });
    }
    (registry, invocations)
}

/// Sorted copy of the recorded invocations.
pub fn sorted(invocations: &Invocations) -> Vec<String> {
    let mut calls = invocations.lock().unwrap().clone();
    calls.sort();
    calls
}

/// A dispatcher over fixed snapshots. The agents never refresh.
pub fn test_dispatcher(
    registry: PluginRegistry,
    routing: RoutingConfig,
    app: AppConfig,
    client: Arc<dyn VcsClient>,
) -> Dispatcher {
    Dispatcher::new(
        Arc::new(registry),
        Arc::new(routing_agent(routing)),
        Arc::new(app_agent(app)),
        client,
    )
}

pub fn routing_agent(routing: RoutingConfig) -> ConfigAgent<RoutingConfig> {
    ConfigAgent::new("plugins.yaml", routing, AgentOptions::default())
}

pub fn app_agent(app: AppConfig) -> ConfigAgent<AppConfig> {
    ConfigAgent::new("config.yaml", app, AgentOptions::default())
}

/// In-memory [`VcsClient`] that keeps labels per merge request and counts
/// mutating calls.
#[derive(Debug, Default)]
pub struct RecordingClient {
    labels: Mutex<HashMap<(RepoId, PrNumber), Vec<String>>>,
    comments: Mutex<Vec<String>>,
    mutations: AtomicUsize,
    label_reads: AtomicUsize,
    failure: Option<(GitHubErrorKind, String)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every call fails with an error like `err`.
    pub fn failing(err: GitHubApiError) -> Self {
        RecordingClient {
            failure: Some((err.kind, err.message)),
            ..Self::default()
        }
    }

    pub fn set_labels<I, S>(&self, repo: &RepoId, pr: PrNumber, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.lock().unwrap().insert(
            (repo.clone(), pr),
            labels.into_iter().map(Into::into).collect(),
        );
    }

    pub fn labels_on(&self, repo: &RepoId, pr: PrNumber) -> Vec<String> {
        self.labels
            .lock()
            .unwrap()
            .get(&(repo.clone(), pr))
            .cloned()
            .unwrap_or_default()
    }

    pub fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn label_reads(&self) -> usize {
        self.label_reads.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), GitHubApiError> {
        match &self.failure {
            Some((GitHubErrorKind::Transient, message)) => {
                Err(GitHubApiError::transient(message.clone()))
            }
            Some((GitHubErrorKind::Permanent, message)) => {
                Err(GitHubApiError::permanent(message.clone()))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VcsClient for RecordingClient {
    async fn labels(&self, repo: &RepoId, pr: PrNumber) -> Result<Vec<String>, GitHubApiError> {
        self.check_failure()?;
        self.label_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels_on(repo, pr))
    }

    async fn add_labels(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        labels: &[String],
    ) -> Result<(), GitHubApiError> {
        self.check_failure()?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut all = self.labels.lock().unwrap();
        let current = all.entry((repo.clone(), pr)).or_default();
        for label in labels {
            if !current.contains(label) {
                current.push(label.clone());
            }
        }
        Ok(())
    }

    async fn remove_label(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        label: &str,
    ) -> Result<(), GitHubApiError> {
        self.check_failure()?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut all = self.labels.lock().unwrap();
        if let Some(current) = all.get_mut(&(repo.clone(), pr)) {
            current.retain(|l| l != label);
        }
        Ok(())
    }

    async fn create_comment(
        &self,
        _repo: &RepoId,
        _pr: PrNumber,
        body: &str,
    ) -> Result<(), GitHubApiError> {
        self.check_failure()?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        self.comments.lock().unwrap().push(body.to_string());
        Ok(())
    }
}
