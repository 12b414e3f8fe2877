//! Findings and information gaps produced by the Analysis Agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One atomic, sourced claim extracted from one source by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub claim: String,
    pub source_id: String,
    pub evidence_quote: Option<String>,
    pub verification_score: f32,
    pub verified: bool,
    pub iteration_discovered: u32,
    pub discovered_at: DateTime<Utc>,
}

impl Finding {
    /// A finding counts as verified once its score reaches this threshold.
    pub const VERIFIED_THRESHOLD: f32 = 0.7;

    pub fn new(
        id: impl Into<String>,
        claim: impl Into<String>,
        source_id: impl Into<String>,
        verification_score: f32,
        iteration_discovered: u32,
    ) -> Self {
        let verification_score = verification_score.clamp(0.0, 1.0);
        Self {
            id: id.into(),
            claim: claim.into(),
            source_id: source_id.into(),
            evidence_quote: None,
            verification_score,
            verified: verification_score >= Self::VERIFIED_THRESHOLD,
            iteration_discovered,
            discovered_at: Utc::now(),
        }
    }

    pub fn with_evidence_quote(mut self, quote: impl Into<String>) -> Self {
        self.evidence_quote = Some(quote.into());
        self
    }

    /// The lowercased first-50-chars dedup key used to collapse near-duplicate claims.
    pub fn dedup_key(&self) -> String {
        let lower = self.claim.to_lowercase();
        lower.chars().take(50).collect()
    }
}

/// Priority of a self-identified information gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GapPriority {
    High,
    Medium,
    Low,
}

impl GapPriority {
    /// Parse case-insensitively; unknown strings default to Medium.
    pub fn parse_or_medium(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "high" => GapPriority::High,
            "low" => GapPriority::Low,
            _ => GapPriority::Medium,
        }
    }

    /// Gap priority → follow-up sub-question priority mapping:
    /// High→1, Medium→2, Low→3.
    pub fn as_sub_question_priority(self) -> i32 {
        match self {
            GapPriority::High => 1,
            GapPriority::Medium => 2,
            GapPriority::Low => 3,
        }
    }
}

/// A self-identified deficit in the accumulated evidence, with a proposed
/// follow-up query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationGap {
    pub description: String,
    pub suggested_query: String,
    pub priority: GapPriority,
    pub identified_at: DateTime<Utc>,
}

impl InformationGap {
    pub fn new(
        description: impl Into<String>,
        suggested_query: impl Into<String>,
        priority: GapPriority,
    ) -> Self {
        Self {
            description: description.into(),
            suggested_query: suggested_query.into(),
            priority,
            identified_at: Utc::now(),
        }
    }
}
