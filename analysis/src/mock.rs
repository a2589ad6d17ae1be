//! Deterministic in-memory analyzer implementations for tests and the
//! `enrolltest` harness. Responses are keyed by audio content hash with
//! a configurable default, so a test can script one clip at a time.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::AnalysisError;
use crate::ports::{
    FaceEnrollmentLookup, Notifier, QualityAnalyzer, SpeakerEmbedder, SpoofDetector, Transcriber,
};
use crate::types::{AudioClip, Notification, QualityReport, SpoofReport};

/// Quality analyzer with a default report and per-clip overrides.
pub struct MockQualityAnalyzer {
    default: QualityReport,
    overrides: Mutex<HashMap<String, QualityReport>>,
}

impl MockQualityAnalyzer {
    /// Clean default: quality 0.9, SNR 30 dB, 5 s.
    pub fn new() -> Self {
        Self::with_default(QualityReport {
            quality_score: 0.9,
            snr_db: 30.0,
            duration_seconds: 5.0,
            issues: Vec::new(),
        })
    }

    pub fn with_default(default: QualityReport) -> Self {
        Self {
            default,
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, content_hash: &str, report: QualityReport) {
        self.overrides.lock().insert(content_hash.to_string(), report);
    }
}

impl Default for MockQualityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QualityAnalyzer for MockQualityAnalyzer {
    async fn assess(&self, clip: &AudioClip) -> Result<QualityReport, AnalysisError> {
        let hash = clip.content_hash();
        Ok(self
            .overrides
            .lock()
            .get(&hash)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Transcriber returning scripted text per clip.
pub struct MockTranscriber {
    default: String,
    overrides: Mutex<HashMap<String, String>>,
}

impl MockTranscriber {
    pub fn new(default: &str) -> Self {
        Self {
            default: default.to_string(),
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, content_hash: &str, text: &str) {
        self.overrides
            .lock()
            .insert(content_hash.to_string(), text.to_string());
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, AnalysisError> {
        let hash = clip.content_hash();
        Ok(self
            .overrides
            .lock()
            .get(&hash)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Embedder with scripted vectors and optional failure injection.
///
/// Without an override, the embedding is derived deterministically from
/// the clip's content hash, so distinct clips get distinct but stable
/// vectors.
pub struct MockEmbedder {
    dim: usize,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    failing: Mutex<HashSet<String>>,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn set(&self, content_hash: &str, embedding: Vec<f32>) {
        self.overrides
            .lock()
            .insert(content_hash.to_string(), embedding);
    }

    /// Make extraction fail for the given clip.
    pub fn fail_for(&self, content_hash: &str) {
        self.failing.lock().insert(content_hash.to_string());
    }
}

#[async_trait]
impl SpeakerEmbedder for MockEmbedder {
    async fn extract(&self, clip: &AudioClip) -> Result<Vec<f32>, AnalysisError> {
        let hash = clip.content_hash();
        if self.failing.lock().contains(&hash) {
            return Err(AnalysisError::Extraction(format!(
                "scripted failure for {hash}"
            )));
        }
        if let Some(e) = self.overrides.lock().get(&hash) {
            return Ok(e.clone());
        }
        // Derive a stable pseudo-embedding from the hash bytes.
        let bytes = hash.as_bytes();
        Ok((0..self.dim)
            .map(|i| (bytes[i % bytes.len()] as f32 - 96.0) / 32.0)
            .collect())
    }

    fn model_id(&self) -> &str {
        "mock-embedder-v1"
    }
}

/// Spoof detector: clean by default, scripted reports per clip.
pub struct MockSpoofDetector {
    overrides: Mutex<HashMap<String, SpoofReport>>,
}

impl MockSpoofDetector {
    pub fn new() -> Self {
        Self {
            overrides: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, content_hash: &str, report: SpoofReport) {
        self.overrides.lock().insert(content_hash.to_string(), report);
    }
}

impl Default for MockSpoofDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpoofDetector for MockSpoofDetector {
    async fn detect(&self, clip: &AudioClip) -> Result<SpoofReport, AnalysisError> {
        let hash = clip.content_hash();
        Ok(self
            .overrides
            .lock()
            .get(&hash)
            .cloned()
            .unwrap_or_else(SpoofReport::clean))
    }
}

/// Face enrollment lookup returning a fixed per-user timestamp.
pub struct MockFaceLookup {
    records: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MockFaceLookup {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, user_id: &str, validated_at: DateTime<Utc>) {
        self.records.lock().insert(user_id.to_string(), validated_at);
    }
}

impl Default for MockFaceLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceEnrollmentLookup for MockFaceLookup {
    async fn latest_validated(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AnalysisError> {
        Ok(self.records.lock().get(user_id).copied())
    }
}

/// Notifier that records every message for later assertion.
pub struct MockNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: Notification) -> Result<(), AnalysisError> {
        self.sent.lock().push(message);
        Ok(())
    }
}
