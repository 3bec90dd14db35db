//! Business operations. Each staff-facing service method takes the caller's
//! session and runs its role gate before reading or writing anything.

pub mod activity;
pub mod applications;
pub mod assignments;
pub mod candidates;
pub mod dashboard;
pub mod email;
pub mod evaluations;
pub mod interviews;
pub mod jobs;
pub mod notifications;
pub mod progress;
pub mod recipients;
pub mod scope;
pub mod settings;
pub mod uploads;
pub mod users;
pub mod validation;
