use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use upiscan_core::{ExtractedPayment, Extractor, NormalizedText};

use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{EngineError, RecognitionEngine};

/// A first pass shorter than this (after stripping whitespace) is treated as
/// low-yield and triggers a second pass on the enhanced image.
const SECOND_PASS_THRESHOLD: usize = 80;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

/// The result of scanning one payment screenshot.
///
/// `error` is set only when the recognition stage itself failed; in that case
/// `raw_text` is empty and `extracted` carries no fields. Extractors that
/// simply find nothing are not errors — their fields are just absent.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Accumulated engine output across one or two passes.
    pub raw_text: String,
    /// Best-effort structured fields pulled out of `raw_text`.
    pub extracted: ExtractedPayment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Orchestrates: recognize → (conditional enhanced second pass) → normalize →
/// run every extractor → assemble.
///
/// Holds no shared mutable state; any number of scans may run concurrently,
/// each over its own image bytes.
pub struct ExtractionPipeline<R: RecognitionEngine> {
    engine: R,
}

impl<R: RecognitionEngine> ExtractionPipeline<R> {
    pub fn new(engine: R) -> Self {
        Self { engine }
    }

    /// Scan a screenshot file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ScanResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(self.process_bytes(&bytes))
    }

    /// Scan raw image bytes. Engine and enhancement failures surface in the
    /// result's `error` field rather than as an `Err` — a payment stub can
    /// still be created with no extracted fields.
    pub fn process_bytes(&self, image_bytes: &[u8]) -> ScanResult {
        let raw_text = match self.recognize_with_fallback(image_bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "recognition failed");
                return ScanResult {
                    raw_text: String::new(),
                    extracted: ExtractedPayment::default(),
                    error: Some(e.to_string()),
                };
            }
        };

        let normalized = NormalizedText::from_raw(&raw_text);
        tracing::debug!(lines = ?normalized.lines, "normalized recognition output");
        let extracted = Extractor::extract(&normalized);

        ScanResult { raw_text, extracted, error: None }
    }

    /// First recognition pass, plus a second pass over the enhanced image
    /// when the first came back nearly empty. The second pass appends to the
    /// accumulated text; the enhanced image lives only for this call.
    fn recognize_with_fallback(&self, image_bytes: &[u8]) -> Result<String, PipelineError> {
        let mut raw = self.engine.recognize(image_bytes)?;
        if raw.trim().len() < SECOND_PASS_THRESHOLD {
            tracing::debug!(
                first_pass_len = raw.trim().len(),
                "low-yield first pass, re-running on enhanced image"
            );
            let enhanced = preprocess::enhance(image_bytes)?;
            let second = self.engine.recognize(&enhanced)?;
            raw.push('\n');
            raw.push_str(&second);
        }
        Ok(raw)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
