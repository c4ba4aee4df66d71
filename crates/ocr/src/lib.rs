pub mod pipeline;
pub mod preprocess;
pub mod recognizer;

pub use pipeline::{ExtractionPipeline, PipelineError, ScanResult};
pub use preprocess::{enhance, PreprocessError};
pub use recognizer::{EngineError, MockEngine, RecognitionEngine};
