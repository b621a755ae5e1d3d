pub mod assignment;
pub mod assignment_problem;
pub mod assignment_user;
pub mod best_submission;
pub mod class;
pub mod dataset;
pub mod exam_activity_log;
pub mod language;
pub mod problem;
pub mod problem_language;
pub mod problem_tag;
pub mod submission;
pub mod tag;
pub mod test_case;
pub mod test_case_result;
pub mod user;
