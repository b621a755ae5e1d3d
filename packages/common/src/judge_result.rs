use serde::{Deserialize, Serialize};

use crate::mq::Message;
use crate::status::{CaseVerdict, SubmissionStatus};

/// Structured error info attached to a `SystemError` result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeErrorInfo {
    /// Machine-readable error code (e.g., "WORKER_PROCESSING_FAILED").
    pub code: String,
    /// Human-readable error description.
    pub message: String,
}

impl JudgeErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result for a single test case execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseJudgeResult {
    /// Test case ID that was executed.
    pub test_case_id: i32,
    /// Position within the dataset.
    pub index_no: i32,
    /// Verdict for this test case.
    pub verdict: CaseVerdict,
    /// Points earned (full case weight on pass, zero otherwise).
    pub score: i32,
    /// Wall time in milliseconds, `None` for skipped cases.
    pub time_ms: Option<i32>,
    /// Peak memory in kilobytes, `None` when not measured.
    pub memory_kb: Option<i32>,
}

/// Message published by the worker on the result queue.
///
/// `Started` claims the Pending -> Running transition; `Completed` carries the
/// terminal verdict. The server owns the submission row and applies both.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JudgeUpdate {
    Started {
        job_id: String,
        submission_id: i32,
    },
    Completed(JudgeResult),
}

impl JudgeUpdate {
    pub fn submission_id(&self) -> i32 {
        match self {
            Self::Started { submission_id, .. } => *submission_id,
            Self::Completed(result) => result.submission_id,
        }
    }
}

impl Message for JudgeUpdate {
    fn message_type() -> &'static str {
        "judge_update"
    }

    fn message_id(&self) -> &str {
        match self {
            Self::Started { job_id, .. } => job_id,
            Self::Completed(result) => &result.job_id,
        }
    }
}

/// Final verdict from the worker after judging a submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeResult {
    /// Original job ID.
    pub job_id: String,
    /// Submission that was judged.
    pub submission_id: i32,
    /// Terminal status after judging.
    pub status: SubmissionStatus,
    /// Number of test cases that passed.
    pub passed_testcase: i32,
    /// Total number of test cases in the job.
    pub total_testcase: i32,
    /// Points earned across all test cases.
    pub score: i32,
    /// Maximum wall time across executed cases (milliseconds).
    pub total_time: Option<i32>,
    /// Maximum memory across executed cases (kilobytes).
    pub total_memory: Option<i32>,
    /// Compiler output (stdout/stderr), when compilation ran.
    pub compile_output: Option<String>,
    /// Structured error info (only for SystemError status).
    pub error_info: Option<JudgeErrorInfo>,
    /// Individual test case results.
    pub test_case_results: Vec<TestCaseJudgeResult>,
}

impl JudgeResult {
    /// Collapse executed per-case results into a submission verdict.
    ///
    /// Passed requires every case to pass. Otherwise the fault category with
    /// the highest severity wins, and within that category the earliest case
    /// index is the representative. Time and memory are maxima, not sums.
    pub fn from_cases(
        job_id: String,
        submission_id: i32,
        compile_output: Option<String>,
        cases: Vec<TestCaseJudgeResult>,
    ) -> Self {
        let total = cases.len() as i32;
        let passed = cases
            .iter()
            .filter(|c| c.verdict == CaseVerdict::Passed)
            .count() as i32;
        let score = cases.iter().map(|c| c.score).sum();
        let total_time = cases.iter().filter_map(|c| c.time_ms).max();
        let total_memory = cases.iter().filter_map(|c| c.memory_kb).max();

        let status = if passed == total {
            SubmissionStatus::Passed
        } else {
            cases
                .iter()
                .filter(|c| c.verdict.severity() > 0)
                .max_by_key(|c| (c.verdict.severity(), std::cmp::Reverse(c.index_no)))
                .map(|c| c.verdict.submission_status())
                .unwrap_or(SubmissionStatus::Failed)
        };

        Self {
            job_id,
            submission_id,
            status,
            passed_testcase: passed,
            total_testcase: total,
            score,
            total_time,
            total_memory,
            compile_output,
            error_info: None,
            test_case_results: cases,
        }
    }

    /// Result for a submission whose source failed to compile: every case is
    /// skipped and no score is awarded.
    pub fn compilation_error(
        job_id: String,
        submission_id: i32,
        compile_output: String,
        case_ids: Vec<(i32, i32)>,
    ) -> Self {
        let test_case_results = case_ids
            .into_iter()
            .map(|(test_case_id, index_no)| TestCaseJudgeResult {
                test_case_id,
                index_no,
                verdict: CaseVerdict::Skipped,
                score: 0,
                time_ms: None,
                memory_kb: None,
            })
            .collect::<Vec<_>>();

        Self {
            job_id,
            submission_id,
            status: SubmissionStatus::CompilationError,
            passed_testcase: 0,
            total_testcase: test_case_results.len() as i32,
            score: 0,
            total_time: None,
            total_memory: None,
            compile_output: Some(compile_output),
            error_info: None,
            test_case_results,
        }
    }

    /// Result indicating the judging infrastructure failed.
    pub fn system_error(job_id: String, submission_id: i32, error_info: JudgeErrorInfo) -> Self {
        Self {
            job_id,
            submission_id,
            status: SubmissionStatus::SystemError,
            passed_testcase: 0,
            total_testcase: 0,
            score: 0,
            total_time: None,
            total_memory: None,
            compile_output: None,
            error_info: Some(error_info),
            test_case_results: vec![],
        }
    }
}
