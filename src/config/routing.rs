//! Plugin routing table (`plugins.yaml`).
//!
//! Plugins are enabled per repository or per organization:
//!
//! ```yaml
//! plugins:
//!   acme:
//!     - lgtm
//!   acme/widgets:
//!     - size
//! ```
//!
//! An org-level entry applies to every repository under that org. A
//! repo-level entry adds to the org list; it does not replace it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::agent::ConfigDocument;
use super::error::ConfigError;
use crate::types::RepoId;

/// Routing table from `"owner"` or `"owner/repo"` to plugin names.
///
/// Plugin names are not checked against any registry; names nobody
/// registered are skipped at dispatch time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub plugins: BTreeMap<String, Vec<String>>,
}

impl RoutingConfig {
    pub fn new(plugins: BTreeMap<String, Vec<String>>) -> Self {
        RoutingConfig { plugins }
    }

    /// Returns the plugin names enabled for `repo`: the org-level list
    /// followed by the repo-level list. Duplicates are kept.
    pub fn plugins_for(&self, repo: &RepoId) -> Vec<&str> {
        routing_keys(repo)
            .iter()
            .filter_map(|key| self.plugins.get(key))
            .flatten()
            .map(String::as_str)
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for key in self.plugins.keys() {
            let well_formed = if key.contains('/') {
                key.parse::<RepoId>().is_ok()
            } else {
                !key.is_empty()
            };
            if !well_formed {
                return Err(ConfigError::invalid(
                    "plugins",
                    format!("routing key {key:?} is not \"org\" or \"org/repo\""),
                ));
            }
        }
        Ok(())
    }
}

/// The two keys an event's origin is looked up under: the owner alone, then
/// `owner/repo`.
pub fn routing_keys(repo: &RepoId) -> [String; 2] {
    [repo.owner.clone(), repo.full_name()]
}

impl ConfigDocument for RoutingConfig {
    const NAME: &'static str = "plugins";

    fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: RoutingConfig = if text.trim().is_empty() {
            RoutingConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };

        config.validate()?;

        if config.plugins.is_empty() {
            warn!("No plugins specified, check syntax?");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::arb_routing_config;
    use proptest::prelude::*;

    fn config(entries: &[(&str, &[&str])]) -> RoutingConfig {
        RoutingConfig::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn parses_plugins_document() {
        let yaml = "plugins:\n  acme:\n    - lgtm\n  acme/widgets:\n    - size\n    - lgtm\n";
        let parsed = RoutingConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            parsed,
            config(&[("acme", &["lgtm"]), ("acme/widgets", &["size", "lgtm"])])
        );
    }

    #[test]
    fn empty_document_is_empty_table() {
        let parsed = RoutingConfig::from_yaml("").unwrap();
        assert!(parsed.plugins.is_empty());
        let parsed = RoutingConfig::from_yaml("plugins: {}\n").unwrap();
        assert!(parsed.plugins.is_empty());
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        let result = RoutingConfig::from_yaml("plugins:\n  acme: lgtm\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for key in ["\"\"", "/widgets", "acme/", "acme/widgets/extra"] {
            let yaml = format!("plugins:\n  {key}:\n    - lgtm\n");
            let result = RoutingConfig::from_yaml(&yaml);
            assert!(
                matches!(result, Err(ConfigError::Validation { .. })),
                "key {key} should be rejected"
            );
        }
    }

    #[test]
    fn org_entries_apply_to_every_repo() {
        let table = config(&[("acme", &["lgtm"])]);
        assert_eq!(table.plugins_for(&RepoId::new("acme", "widgets")), ["lgtm"]);
        assert_eq!(table.plugins_for(&RepoId::new("acme", "gadgets")), ["lgtm"]);
        assert!(table.plugins_for(&RepoId::new("other", "widgets")).is_empty());
    }

    #[test]
    fn repo_entries_are_additive_org_first() {
        let table = config(&[("acme", &["lgtm"]), ("acme/widgets", &["size", "lgtm"])]);
        assert_eq!(
            table.plugins_for(&RepoId::new("acme", "widgets")),
            ["lgtm", "size", "lgtm"]
        );
    }

    #[test]
    fn repo_key_does_not_match_other_owner() {
        let table = config(&[("acme/widgets", &["lgtm"])]);
        assert!(table.plugins_for(&RepoId::new("evil", "widgets")).is_empty());
    }

    proptest! {
        #[test]
        fn plugins_for_is_org_then_repo_list(
            table in arb_routing_config(),
            owner in "[a-c]",
            repo in "[x-z]",
        ) {
            let id = RepoId::new(&owner, &repo);
            let mut expected: Vec<String> = Vec::new();
            expected.extend(table.plugins.get(&owner).cloned().unwrap_or_default());
            expected.extend(table.plugins.get(&id.full_name()).cloned().unwrap_or_default());

            let actual: Vec<String> = table.plugins_for(&id).into_iter().map(String::from).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn yaml_reload_resolves_identically(table in arb_routing_config()) {
            let text = serde_yaml::to_string(&table).unwrap();
            let reloaded = RoutingConfig::from_yaml(&text).unwrap();
            prop_assert_eq!(&reloaded, &table);
        }
    }
}
