pub mod auth;
pub mod response;

pub use auth::{require_staff_session, session_middleware, CurrentSession};
pub use response::{ApiResponse, ApiResult};
