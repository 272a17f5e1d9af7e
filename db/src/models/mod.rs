pub mod assignment;
pub mod assignment_submission;
pub mod scheduled_task;

pub use assignment::Entity as Assignment;
pub use assignment_submission::Entity as AssignmentSubmission;
pub use scheduled_task::Entity as ScheduledTask;
