use serde::Serialize;
use yd_dapp_core::{DappError, FollowUp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    Error,
    Info,
}

/// A status line or toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub tone: Tone,
    pub message: String,
}

impl Feedback {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Info,
            message: message.into(),
        }
    }

    pub fn failed(prefix: &str, err: &DappError) -> Self {
        Self::error(format!("{prefix}: {err}"))
    }

    /// Status line for the dependent half of a two-step write.
    pub fn follow_up(what: &str, outcome: &FollowUp) -> Self {
        match outcome {
            FollowUp::Skipped(reason) => Self::info(format!("{what} skipped: {reason}")),
            FollowUp::Succeeded(hash) => Self::success(format!("{what} submitted (tx: {hash})")),
            FollowUp::Failed(err) => Self::error(format!("{what} failed: {err}")),
        }
    }
}
