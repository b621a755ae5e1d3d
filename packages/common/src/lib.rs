pub mod config;
pub mod dlq;
pub mod judge_job;
pub mod judge_result;
pub mod limits;
pub mod mq;
pub mod retry;
pub mod status;
pub mod storage;
pub mod template;

pub use status::{CaseVerdict, SubmissionStatus};
