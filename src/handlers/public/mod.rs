// handlers/public/mod.rs - Public handlers (no session required)
//
// The candidate-facing apply flow and the recording upload it depends on.
// Inputs come from anonymous callers and are validated by the services.
//
// Route Prefix: /apply/* and /api/upload/*

pub mod apply;
pub mod upload;

pub use apply::{apply_begin, apply_form, apply_progress, apply_submit};
pub use upload::upload_video;
