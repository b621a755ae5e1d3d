use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::limits::EffectiveLimits;
use crate::mq::Message;

/// Test case reference carried in a judge job. Input/output blobs are fetched
/// by the worker at execution time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCaseSpec {
    /// Test case ID
    pub id: i32,
    /// Position within the dataset, used for deterministic fault reporting
    pub index_no: i32,
    /// Blob ref for the input fed to the program
    pub input_ref: String,
    /// Blob ref for the expected output
    pub output_ref: String,
    /// Points awarded when this case passes
    pub score: i32,
}

/// A judge job message sent to the worker queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeJob {
    /// Job identifier (UUID)
    pub job_id: String,
    /// ID of the submission being judged
    pub submission_id: i32,
    /// ID of the problem
    pub problem_id: i32,
    /// Language code (e.g., "cpp", "python")
    pub language: String,
    /// Fully rendered source, templates already applied
    pub source: String,
    /// Limits this job runs under
    pub limits: EffectiveLimits,
    /// Test cases to run, in dataset order
    pub test_cases: Vec<TestCaseSpec>,
}

impl JudgeJob {
    /// Create a new judge job with a generated UUID.
    pub fn new(
        submission_id: i32,
        problem_id: i32,
        language: String,
        source: String,
        limits: EffectiveLimits,
        test_cases: Vec<TestCaseSpec>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            submission_id,
            problem_id,
            language,
            source,
            limits,
            test_cases,
        }
    }

    /// Total points available across all test cases.
    pub fn max_score(&self) -> i32 {
        self.test_cases.iter().map(|tc| tc.score).sum()
    }
}

impl Message for JudgeJob {
    fn message_type() -> &'static str {
        "judge_job"
    }

    fn message_id(&self) -> &str {
        &self.job_id
    }
}
