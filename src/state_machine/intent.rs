//! Closed set of query intents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Category assigned to a query by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Questions about documentation, processes, technical details
    Knowledge,
    /// New employee questions, getting started
    Onboarding,
    /// Team metrics, performance, sprint data
    TeamAnalysis,
    /// Output quality review
    Evaluator,
    /// Greetings and small talk
    DirectResponse,
    /// Query too ambiguous to act on
    Clarification,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intent: {0}")]
pub struct UnknownIntent(pub String);

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Knowledge,
        Intent::Onboarding,
        Intent::TeamAnalysis,
        Intent::Evaluator,
        Intent::DirectResponse,
        Intent::Clarification,
    ];

    /// Wire token, as the classifier emits it
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Knowledge => "knowledge",
            Intent::Onboarding => "onboarding",
            Intent::TeamAnalysis => "team_analysis",
            Intent::Evaluator => "evaluator",
            Intent::DirectResponse => "direct_response",
            Intent::Clarification => "clarification",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = UnknownIntent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| UnknownIntent(s.to_string()))
    }
}
