pub mod m202601100001_create_assignments;
pub mod m202601100002_create_assignment_submissions;
pub mod m202601100003_create_scheduled_tasks;
