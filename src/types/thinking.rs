//! Observability records of high-level decisions made during research.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of decision a `ThinkingStep` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThinkingStepType {
    Planning,
    QueryGeneration,
    Searching,
    ContentExtraction,
    SufficiencyEvaluation,
    IterationDecision,
    FindingSynthesis,
    OutlineGeneration,
    SectionWriting,
    FinalReview,
}

/// One observability record appended to `ResearchState.thinking_steps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingStep {
    pub step_type: ThinkingStepType,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub data: Option<HashMap<String, String>>,
}

impl ThinkingStep {
    pub fn new(step_type: ThinkingStepType, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            step_type,
            title: title.into(),
            description: description.into(),
            timestamp: Utc::now(),
            duration_ms: None,
            data: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }
}
