use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Image decode error: {0}")]
    Decode(String),
    #[error("Recognition engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available — build with `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over the external image-to-text recognition engine.
/// Implementations accept raw PNG/JPEG image bytes and return whatever text
/// the engine produced, garbled or not — cleanup is the extractor's job.
pub trait RecognitionEngine: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, EngineError>;
}

// ── Mock engine (always available, used for tests) ────────────────────────────

/// Returns a pre-set string — lets the extraction pipeline be tested without
/// Tesseract installed.
pub struct MockEngine {
    pub text: String,
}

impl MockEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl RecognitionEngine for MockEngine {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, EngineError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract engine (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_engine {
    use super::{EngineError, RecognitionEngine};
    use leptess::LepTess;

    pub struct TesseractEngine {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractEngine {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl RecognitionEngine for TesseractEngine {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, EngineError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| EngineError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| EngineError::Decode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| EngineError::Engine(e.to_string()))
        }
    }
}
