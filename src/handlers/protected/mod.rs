// handlers/protected/mod.rs - Staff handlers (session required)
//
// Every handler reads the `CurrentSession` injected by the session
// middleware and hands it to a service, which runs the role gate before
// touching data.
//
// Route Prefix: /api/*

pub mod applications;
pub mod assignments;
pub mod auth;
pub mod candidates;
pub mod dashboard;
pub mod evaluations;
pub mod interviews;
pub mod jobs;
pub mod notifications;
