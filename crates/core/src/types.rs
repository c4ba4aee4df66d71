use serde::{Deserialize, Serialize};

/// Completion state read off the screenshot text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Success => write!(f, "Success"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Success" => Ok(PaymentStatus::Success),
            "Failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("Unknown payment status: '{other}'")),
        }
    }
}

/// Best-effort fields pulled out of one screenshot. Every field is optional:
/// an extractor that finds nothing leaves its field unset, and the serialized
/// form omits absent keys rather than emitting nulls.
///
/// Nothing here is authoritative — downstream consumers treat each value as a
/// hint subject to manual correction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedPayment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    /// Matched substring kept verbatim, original format preserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
}

impl ExtractedPayment {
    /// True when no extractor found anything.
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.transaction_id.is_none()
            && self.upi_id.is_none()
            && self.date.is_none()
            && self.sender_name.is_none()
            && self.receiver_name.is_none()
            && self.status.is_none()
    }
}
