// handlers/mod.rs - Three handler tiers
//
// Public (no session) → Protected (any staff session) → Elevated (admin and
// super-admin surfaces). The tier only groups routes; every protected and
// elevated handler still goes through its service's role gate.

pub mod elevated;
pub mod protected;
pub mod public;
