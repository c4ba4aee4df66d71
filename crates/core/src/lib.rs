pub mod extract;
pub mod normalize;
pub mod types;

pub use extract::Extractor;
pub use normalize::NormalizedText;
pub use types::{ExtractedPayment, PaymentStatus};
