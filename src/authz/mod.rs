//! Role-based access control: session resolution, role gates and the
//! permission descriptors generated from the gated operation registry.

pub mod gates;
pub mod permissions;
pub mod role;
pub mod session;

pub use gates::{
    authorize, check_job_operation, require_admin, require_admin_or_super, require_job_owner_or_super, require_reviewer_or_above,
    require_reviewer_or_admin, require_staff, require_super_admin, AuthzError, Gate,
};
pub use permissions::{descriptor_for, ops, Capability, PermissionDescriptor, Resource, RowScope};
pub use role::Role;
pub use session::{resolve_session, OrgScope, Session};
