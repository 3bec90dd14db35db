pub mod activity;
pub mod application;
pub mod assignment;
pub mod evaluation;
pub mod interview;
pub mod job;
pub mod notification;
pub mod user;

pub use activity::ActivityEntry;
pub use application::{Answer, Application, ProgressEvent, Resume};
pub use assignment::Assignment;
pub use evaluation::{ExternalProfile, HrEvaluation};
pub use interview::{Interview, Transcription};
pub use job::{JobForm, Question, QuestionType};
pub use notification::Notification;
pub use user::User;
