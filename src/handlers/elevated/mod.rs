// handlers/elevated/mod.rs - Administrative handlers
//
// System settings, outbound email, user management and the activity log.
// Most of these admit admins and super-admins only; settings reads are open
// to staff but redact secrets below super-admin.
//
// Route Prefix: /api/*

pub mod activity;
pub mod email;
pub mod settings;
pub mod users;
