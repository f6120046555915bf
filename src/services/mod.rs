pub mod application_wizard;
pub mod file_validation;
pub mod interview_workflow;
pub mod notification;
