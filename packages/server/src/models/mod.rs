pub mod assignment;
pub mod grading;
pub mod shared;
pub mod submission;
