//! Issue-tracker references and commands found in prompts.

use orcbot_config::TrackerConfig;
use orcbot_core::{IssueReference, IssueTracker};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

static URL_PATTERN: OnceLock<Regex> = OnceLock::new();
static ISSUE_KEY_PATTERN: OnceLock<Regex> = OnceLock::new();

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn url_pattern() -> &'static Regex {
    // chat platforms wrap links as <url|label>
    URL_PATTERN.get_or_init(|| {
        Regex::new(r"https?://[^\s<>|]+").expect("Static regex pattern is guaranteed to be valid")
    })
}

#[expect(
    clippy::expect_used,
    reason = "Static regex pattern validated at compile time"
)]
fn issue_key_pattern() -> &'static Regex {
    ISSUE_KEY_PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Z][A-Z0-9]+-[0-9]+\b")
            .expect("Static regex pattern is guaranteed to be valid")
    })
}

/// Find the first issue key inside a tracker URL in `text`.
///
/// A URL only counts when its lowercased form contains one of
/// `domain_hints`; keys outside such URLs are ignored.
#[must_use]
pub fn extract_issue_key(text: &str, domain_hints: &[String]) -> Option<IssueReference> {
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|url| {
            let lower = url.to_lowercase();
            domain_hints
                .iter()
                .any(|hint| !hint.is_empty() && lower.contains(&hint.to_lowercase()))
        })
        .find_map(|url| issue_key_pattern().find(url))
        .map(|key| IssueReference {
            key: key.as_str().to_string(),
        })
}

/// Result of a handled create command. Exactly one reply is posted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateCommandOutcome {
    Created { key: String, reply: String },
    MissingSummary { reply: String },
    Failed { reply: String },
}

impl CreateCommandOutcome {
    #[must_use]
    pub fn reply(&self) -> &str {
        match self {
            Self::Created { reply, .. }
            | Self::MissingSummary { reply }
            | Self::Failed { reply } => reply,
        }
    }
}

/// Best-effort prompt enrichment from the issue tracker.
///
/// Without a tracker every operation is a no-op.
#[derive(Clone)]
pub struct IssueEnricher {
    tracker: Option<Arc<dyn IssueTracker>>,
    domain_hints: Vec<String>,
    command_prefix: String,
}

impl IssueEnricher {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tracker: None,
            domain_hints: Vec::new(),
            command_prefix: String::new(),
        }
    }

    #[must_use]
    pub fn new(tracker: Arc<dyn IssueTracker>, config: &TrackerConfig) -> Self {
        Self {
            tracker: Some(tracker),
            domain_hints: config.domain_hints.clone(),
            command_prefix: config.create_command_prefix.clone(),
        }
    }

    #[must_use]
    pub fn extract_key(&self, text: &str) -> Option<IssueReference> {
        extract_issue_key(text, &self.domain_hints)
    }

    /// Append the referenced issue's summary and description to `prompt`.
    ///
    /// Returns the prompt unchanged when there is no reference or the
    /// lookup fails.
    pub async fn augment(&self, prompt: &str) -> String {
        let Some(tracker) = &self.tracker else {
            return prompt.to_string();
        };
        let Some(reference) = self.extract_key(prompt) else {
            return prompt.to_string();
        };

        match tracker.get_issue(&reference.key).await {
            Ok(details) => {
                info!("Augmenting prompt with issue {}", reference.key);
                format!(
                    "{prompt}\n\nContext from issue {}:\nSummary: {}\nDescription: {}",
                    reference.key, details.summary, details.description
                )
            }
            Err(e) => {
                warn!("Failed to fetch issue {}: {e}", reference.key);
                prompt.to_string()
            }
        }
    }

    /// Handle `<prefix> <summary>` by creating an issue.
    ///
    /// Returns `None` when `prompt` is not a create command. `description`
    /// is stored as the issue body.
    pub async fn try_create_command(
        &self,
        prompt: &str,
        description: &str,
    ) -> Option<CreateCommandOutcome> {
        let tracker = self.tracker.as_ref()?;
        let summary = self.command_summary(prompt)?;

        if summary.is_empty() {
            return Some(CreateCommandOutcome::MissingSummary {
                reply: format!(
                    "Please add a summary after `{}` so I know what the ticket is about.",
                    self.command_prefix
                ),
            });
        }

        let outcome = match tracker.create_issue(summary, description).await {
            Ok(key) => {
                let reply = tracker.browse_url(&key).map_or_else(
                    || format!("Created ticket {key}."),
                    |url| format!("Created ticket {key}: {url}"),
                );
                CreateCommandOutcome::Created { key, reply }
            }
            Err(e) => {
                warn!("Failed to create issue: {e}");
                CreateCommandOutcome::Failed {
                    reply: "Sorry, I couldn't create that ticket. Please try again later."
                        .to_string(),
                }
            }
        };
        Some(outcome)
    }

    /// The trimmed text after the command prefix, if `prompt` starts with it.
    fn command_summary<'a>(&self, prompt: &'a str) -> Option<&'a str> {
        if self.command_prefix.is_empty() {
            return None;
        }
        let prompt = prompt.trim_start();
        let head = prompt.get(..self.command_prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.command_prefix) {
            return None;
        }
        Some(prompt[self.command_prefix.len()..].trim())
    }
}
