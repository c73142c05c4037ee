//! Error types shared by the loader pipeline.

use std::ops::Range;

use thiserror::Error;

/// Retrieving a fragment failed. Single attempt, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to fetch '{location}': {reason}")]
    Transport { location: String, reason: String },
    #[error("fetching '{location}' returned status {status}")]
    Status { location: String, status: u16 },
    #[error("no fragment at '{location}'")]
    Missing { location: String },
}

impl FetchError {
    pub fn location(&self) -> &str {
        match self {
            Self::Transport { location, .. }
            | Self::Status { location, .. }
            | Self::Missing { location } => location,
        }
    }
}

/// One problem found while lexing or building the fragment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupIssue {
    pub span: Range<usize>,
    pub message: String,
}

/// Markup that could not be turned into a fragment.
///
/// Keeps the source so [`MarkupError::report`] can render labelled spans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed markup in '{location}': {}", first_message(.issues))]
pub struct MarkupError {
    pub location: String,
    pub source_text: String,
    pub issues: Vec<MarkupIssue>,
}

fn first_message(issues: &[MarkupIssue]) -> &str {
    issues
        .first()
        .map(|issue| issue.message.as_str())
        .unwrap_or("unknown error")
}

/// The designated mount point could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("mount element '{mount_id}' not found")]
    Missing { mount_id: String },
    #[error("mount element '{mount_id}' rejected content: {reason}")]
    Rejected { mount_id: String, reason: String },
}

/// Raised by a script host when a single script did not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ScriptError {
    pub reason: String,
}

impl ScriptError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A script of a load that failed to load or execute.
///
/// Reported through [`crate::LoadReport`]; it never stalls the barrier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script {script} failed: {reason}")]
pub struct ScriptLoadError {
    /// Locator of an external script, or `inline #<index>`.
    pub script: String,
    pub reason: String,
}

/// A load failed before its scripts started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] MarkupError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error("load of '{location}' was superseded by a newer request")]
    Superseded { location: String },
}

/// A started load did not reach the ready state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("a newer screen was mounted before this one finished")]
    Superseded,
    #[error("script host dropped a pending script without settling it")]
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid date '{input}', expected YYYY-MM-DD")]
    InvalidDate { input: String },
}
