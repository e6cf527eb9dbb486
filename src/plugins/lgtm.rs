//! The `lgtm` plugin.
//!
//! Reviewers approve a merge request by commenting `/lgtm` on its own line,
//! which adds the `lgtm` label. `/lgtm cancel` removes it again.
//!
//! A comment with no command line never touches labels, and only newly
//! created comments count: editing or deleting a comment is ignored.

use std::sync::Arc;

use tracing::{debug, info};

use super::PluginError;
use super::context::ExecutionContext;
use super::registry::PluginRegistry;
use crate::webhooks::{CommentAction, InboundEvent};

/// Name the plugin is registered under.
pub const PLUGIN_NAME: &str = "lgtm";

/// Label applied to approved merge requests.
pub const LGTM_LABEL: &str = "lgtm";

/// What a comment asks the plugin to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LgtmCommand {
    Approve,
    Cancel,
}

/// Finds the first `/lgtm` command in a comment body.
///
/// A command must occupy a whole line (surrounding whitespace allowed).
/// Matching is case-insensitive.
///
/// ```
/// use hookline::plugins::lgtm::{LgtmCommand, parse_lgtm};
///
/// assert_eq!(parse_lgtm("/lgtm"), Some(LgtmCommand::Approve));
/// assert_eq!(parse_lgtm("nice work\n  /LGTM cancel "), Some(LgtmCommand::Cancel));
/// assert_eq!(parse_lgtm("I think /lgtm"), None);
/// ```
pub fn parse_lgtm(body: &str) -> Option<LgtmCommand> {
    body.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        let command = tokens.next()?;
        if !command.eq_ignore_ascii_case("/lgtm") {
            return None;
        }
        match (tokens.next(), tokens.next()) {
            (None, _) => Some(LgtmCommand::Approve),
            (Some(arg), None) if arg.eq_ignore_ascii_case("cancel") => Some(LgtmCommand::Cancel),
            _ => None,
        }
    })
}

pub fn register(registry: &mut PluginRegistry) {
    registry.register(PLUGIN_NAME, handle);
}

async fn handle(ctx: ExecutionContext, event: Arc<InboundEvent>) -> Result<(), PluginError> {
    let InboundEvent::MergeRequestComment(comment) = event.as_ref();

    if comment.action != CommentAction::Created {
        return Ok(());
    }
    let Some(pr) = comment.pr_number else {
        return Ok(());
    };
    let Some(command) = parse_lgtm(&comment.body) else {
        return Ok(());
    };

    let labels = ctx.client().labels(&comment.repo, pr).await?;
    let has_label = labels.iter().any(|l| l == LGTM_LABEL);

    match command {
        LgtmCommand::Approve if has_label => {
            debug!(pr = %pr, "Label already present");
        }
        LgtmCommand::Approve => {
            ctx.client()
                .add_labels(&comment.repo, pr, &[LGTM_LABEL.to_string()])
                .await?;
            info!(pr = %pr, "Added lgtm label");
        }
        LgtmCommand::Cancel if has_label => {
            ctx.client()
                .remove_label(&comment.repo, pr, LGTM_LABEL)
                .await?;
            info!(pr = %pr, "Removed lgtm label");
        }
        LgtmCommand::Cancel => {
            debug!(pr = %pr, "Label not present");
        }
    }

    Ok(())
}
