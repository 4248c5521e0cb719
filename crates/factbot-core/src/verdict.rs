//! Classification verdicts

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome tag of a single classification call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictTag {
    /// No answer within the deadline, or admission was rejected
    Timeout,
    Grammatical,
    Ungrammatical,
    Harmful,
    Unsure,
    ContainsMisinformation,
    DoesNotContainMisinformation,
    ContainsOpinion,
}

impl VerdictTag {
    /// Stable snake_case name, used for logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Grammatical => "grammatical",
            Self::Ungrammatical => "ungrammatical",
            Self::Harmful => "harmful",
            Self::Unsure => "unsure",
            Self::ContainsMisinformation => "contains_misinformation",
            Self::DoesNotContainMisinformation => "does_not_contain_misinformation",
            Self::ContainsOpinion => "contains_opinion",
        }
    }

    /// Tags that produce a visible moderation action (reply + delete)
    pub fn requires_moderation(&self) -> bool {
        matches!(self, Self::Harmful | Self::ContainsMisinformation)
    }

    /// Tags that reject input at the structural stage
    pub fn rejects_structure(&self) -> bool {
        matches!(self, Self::Ungrammatical | Self::Harmful)
    }
}

impl fmt::Display for VerdictTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classification outcome plus human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub tag: VerdictTag,
    pub reason: String,
}

impl Verdict {
    /// Create a new verdict
    pub fn new(tag: VerdictTag, reason: impl Into<String>) -> Self {
        Self {
            tag,
            reason: reason.into(),
        }
    }

    /// Verdict for a call that missed its deadline
    pub fn timeout() -> Self {
        Self::new(VerdictTag::Timeout, "completion deadline expired")
    }

    /// Verdict for a message turned away while a reset is in progress
    pub fn reset_in_progress() -> Self {
        Self::new(VerdictTag::Timeout, Error::ResetInProgress.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        self.tag == VerdictTag::Timeout
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.tag)
        } else {
            write!(f, "{}: {}", self.tag, self.reason)
        }
    }
}
