use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voxauth_analysis::FraudIndicator;

/// The kind of prompt a challenge poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeKind {
    /// Speak the current time and date.
    Temporal,
    /// Speak facts from the user's own profile.
    Personal,
    /// Read a code shown on screen.
    VisualCorrelation,
    /// Follow a spoken-manner instruction (pace, repetition).
    Liveness,
    /// Repeat phrases in more than one language.
    Multilingual,
    /// Answer a literal arithmetic problem.
    Mathematical,
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Temporal => "temporal",
            Self::Personal => "personal",
            Self::VisualCorrelation => "visual_correlation",
            Self::Liveness => "liveness",
            Self::Multilingual => "multilingual",
            Self::Mathematical => "mathematical",
        };
        f.write_str(s)
    }
}

/// Difficulty controls the keyword match threshold during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// What a correct response must contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expected {
    /// Literal tokens matched case-insensitively as substrings of the
    /// transcript. Substring matching tolerates transcription noise
    /// while still requiring the semantic content.
    Keywords(Vec<String>),
    /// A numeric answer, accepted in digit or word form.
    Number(i64),
}

/// A generated challenge with a single absolute validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub phrase: String,
    pub kind: ChallengeKind,
    pub difficulty: Difficulty,
    pub issued_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub expected: Expected,
    /// Code to render on screen for visual-correlation challenges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_code: Option<String>,
}

impl Challenge {
    /// A response received after `valid_until` is always rejected,
    /// regardless of content.
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}

/// Result of validating a spoken response against a challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChallengeOutcome {
    /// The transcript satisfied the challenge.
    Matched { confidence: f32 },
    /// The transcript did not satisfy the challenge.
    NoMatch {
        confidence: f32,
        reason: String,
        indicator: FraudIndicator,
    },
    /// The validity window had already closed; content was not checked.
    Expired {
        reason: String,
        indicator: FraudIndicator,
    },
}

impl ChallengeOutcome {
    pub fn matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Self::Matched { confidence } | Self::NoMatch { confidence, .. } => *confidence,
            Self::Expired { .. } => 0.0,
        }
    }

    pub fn fraud_indicator(&self) -> Option<FraudIndicator> {
        match self {
            Self::Matched { .. } => None,
            Self::NoMatch { indicator, .. } | Self::Expired { indicator, .. } => Some(*indicator),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Matched { .. } => "",
            Self::NoMatch { reason, .. } | Self::Expired { reason, .. } => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_strict() {
        let now = Utc::now();
        let c = Challenge {
            phrase: "say something".into(),
            kind: ChallengeKind::Temporal,
            difficulty: Difficulty::Easy,
            issued_at: now,
            valid_until: now + Duration::seconds(30),
            expected: Expected::Keywords(vec!["something".into()]),
            display_code: None,
        };
        assert!(!c.expired_at(now + Duration::seconds(30)));
        assert!(c.expired_at(now + Duration::seconds(31)));
    }

    #[test]
    fn kind_display() {
        assert_eq!(ChallengeKind::VisualCorrelation.to_string(), "visual_correlation");
        assert_eq!(ChallengeKind::Mathematical.to_string(), "mathematical");
    }
}
