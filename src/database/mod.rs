pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{is_transient, DatabaseError, DatabaseManager};
pub use repository::Repository;
