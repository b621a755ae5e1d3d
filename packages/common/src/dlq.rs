use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mq::Message;

/// Error codes written onto submissions when processing dead-letters.
pub struct SubmissionDlqErrorCode;

impl SubmissionDlqErrorCode {
    /// Worker failed to process a judge job after exhausting retries.
    pub const WORKER_PROCESSING_FAILED: &'static str = "WORKER_PROCESSING_FAILED";
    /// Server failed to process a judge update after exhausting retries.
    pub const RESULT_PROCESSING_FAILED: &'static str = "RESULT_PROCESSING_FAILED";
}

/// Error codes for dead-lettered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DlqErrorCode {
    /// All retry attempts exhausted.
    MaxRetriesExceeded,
    /// Failed to deserialize message payload.
    DeserializationError,
}

impl DlqErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED",
            Self::DeserializationError => "DESERIALIZATION_ERROR",
        }
    }
}

impl std::fmt::Display for DlqErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type of message that ended up in the dead letter queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqMessageType {
    /// Failed judge job (server -> worker message)
    JudgeJob,
    /// Failed judge update (worker -> server message)
    JudgeUpdate,
}

impl DlqMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JudgeJob => "judge_job",
            Self::JudgeUpdate => "judge_update",
        }
    }
}

impl std::fmt::Display for DlqMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope for transporting failed messages to the DLQ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEnvelope {
    /// Original message ID (job_id).
    pub message_id: String,
    /// Type of message that failed.
    pub message_type: DlqMessageType,
    /// Associated submission ID.
    ///
    /// `None` when the submission ID cannot be determined
    /// (e.g., deserialization failed before extracting it).
    pub submission_id: Option<i32>,
    /// Full serialized message payload.
    pub payload: serde_json::Value,
    /// Machine-readable error code.
    pub error_code: DlqErrorCode,
    /// Error message from the last failed attempt.
    pub error_message: String,
    /// Number of attempts made before dead-lettering.
    pub attempts: u8,
    /// When the message was dead-lettered.
    pub failed_at: DateTime<Utc>,
}

impl Message for DlqEnvelope {
    fn message_type() -> &'static str {
        "dlq_envelope"
    }

    fn message_id(&self) -> &str {
        &self.message_id
    }
}
