#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a submission during the judging lifecycle.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Waiting to be picked up by a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// Claimed by a worker; compiling or running test cases.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Running"))]
    Running,
    /// Every test case passed.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Passed"))]
    Passed,
    /// At least one test case produced wrong output.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Failed"))]
    Failed,
    /// Source failed to compile.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CompilationError"))]
    CompilationError,
    /// Program crashed or exited with a non-zero code.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RuntimeError"))]
    RuntimeError,
    /// Exceeded the effective time limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TimeLimitExceeded"))]
    TimeLimitExceeded,
    /// Exceeded the effective memory limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MemoryLimitExceeded"))]
    MemoryLimitExceeded,
    /// Judging infrastructure failed after exhausting retries.
    ///
    /// Internal terminal state; the error code lives on the submission row.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SystemError"))]
    SystemError,
}

impl SubmissionStatus {
    /// Returns true if judging is complete and the status will never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Returns true if every test case passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Running,
        Self::Passed,
        Self::Failed,
        Self::CompilationError,
        Self::RuntimeError,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::SystemError,
    ];

    /// All terminal statuses.
    pub const TERMINAL: &'static [SubmissionStatus] = &[
        Self::Passed,
        Self::Failed,
        Self::CompilationError,
        Self::RuntimeError,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::SystemError,
    ];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::CompilationError => "CompilationError",
            Self::RuntimeError => "RuntimeError",
            Self::TimeLimitExceeded => "TimeLimitExceeded",
            Self::MemoryLimitExceeded => "MemoryLimitExceeded",
            Self::SystemError => "SystemError",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Running" => Ok(Self::Running),
            "Passed" => Ok(Self::Passed),
            "Failed" => Ok(Self::Failed),
            "CompilationError" => Ok(Self::CompilationError),
            "RuntimeError" => Ok(Self::RuntimeError),
            "TimeLimitExceeded" => Ok(Self::TimeLimitExceeded),
            "MemoryLimitExceeded" => Ok(Self::MemoryLimitExceeded),
            "SystemError" => Ok(Self::SystemError),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Verdict for a single executed test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum CaseVerdict {
    /// Output matched the expected output.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Passed"))]
    Passed,
    /// Program finished but output did not match.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WrongOutput"))]
    WrongOutput,
    /// Killed after exceeding the effective time limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TimeLimitExceeded"))]
    TimeLimitExceeded,
    /// Exceeded the effective memory limit.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MemoryLimitExceeded"))]
    MemoryLimitExceeded,
    /// Crashed or exited with a non-zero code.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "RuntimeError"))]
    RuntimeError,
    /// Never executed (compilation failed before this case ran).
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Skipped"))]
    Skipped,
}

impl CaseVerdict {
    /// Fault severity used when collapsing per-case verdicts into a submission
    /// status: memory outranks time, time outranks runtime faults, runtime
    /// faults outrank wrong output. Passed and Skipped carry no fault.
    pub fn severity(&self) -> u8 {
        match self {
            Self::MemoryLimitExceeded => 4,
            Self::TimeLimitExceeded => 3,
            Self::RuntimeError => 2,
            Self::WrongOutput => 1,
            Self::Passed | Self::Skipped => 0,
        }
    }

    /// The submission-level status this verdict maps to when it is the
    /// dominant fault.
    pub fn submission_status(&self) -> SubmissionStatus {
        match self {
            Self::Passed => SubmissionStatus::Passed,
            Self::WrongOutput => SubmissionStatus::Failed,
            Self::TimeLimitExceeded => SubmissionStatus::TimeLimitExceeded,
            Self::MemoryLimitExceeded => SubmissionStatus::MemoryLimitExceeded,
            Self::RuntimeError => SubmissionStatus::RuntimeError,
            Self::Skipped => SubmissionStatus::CompilationError,
        }
    }

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::WrongOutput => "WrongOutput",
            Self::TimeLimitExceeded => "TimeLimitExceeded",
            Self::MemoryLimitExceeded => "MemoryLimitExceeded",
            Self::RuntimeError => "RuntimeError",
            Self::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for CaseVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
