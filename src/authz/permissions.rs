//! Capability descriptors per role.
//!
//! Descriptors are derived from [`REGISTRY`], the same operation table the
//! handlers pass to [`authorize`](super::authorize). A role can only be
//! described as able to do something some gated operation actually lets
//! it do.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{Gate, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Users,
    JobForms,
    Applications,
    Evaluations,
    Questions,
    Answers,
    Resumes,
    Notifications,
    ActivityLog,
    Interviews,
    ExternalProfiles,
    Organizations,
    Assignments,
    Settings,
}

impl Resource {
    pub const ALL: [Resource; 14] = [
        Resource::Users,
        Resource::JobForms,
        Resource::Applications,
        Resource::Evaluations,
        Resource::Questions,
        Resource::Answers,
        Resource::Resumes,
        Resource::Notifications,
        Resource::ActivityLog,
        Resource::Interviews,
        Resource::ExternalProfiles,
        Resource::Organizations,
        Resource::Assignments,
        Resource::Settings,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Read,
    Create,
    Update,
    Delete,
}

/// Declared row visibility for a role on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowScope {
    All,
    SameOrganization,
    SameOrganizationReviewersOnly,
    OrganizationViaJobForm,
    OrganizationViaApplication,
    OwnJobForms,
    OrganizationJobForms,
    OwnOrganization,
    OwnUser,
}

pub fn row_scope(role: Role, resource: Resource) -> RowScope {
    use Resource::*;
    match role {
        Role::SuperAdmin => RowScope::All,
        Role::Admin => match resource {
            Users | JobForms | ActivityLog => RowScope::SameOrganization,
            Applications => RowScope::OrganizationViaJobForm,
            Evaluations | Answers | Resumes | Interviews | ExternalProfiles | Assignments => {
                RowScope::OrganizationViaApplication
            }
            Questions => RowScope::OwnJobForms,
            Organizations => RowScope::OwnOrganization,
            Notifications => RowScope::OwnUser,
            Settings => RowScope::All,
        },
        Role::Reviewer => match resource {
            Users => RowScope::SameOrganizationReviewersOnly,
            JobForms => RowScope::SameOrganization,
            Applications => RowScope::OrganizationViaJobForm,
            Evaluations | Answers | Resumes | Interviews | ExternalProfiles | Assignments => {
                RowScope::OrganizationViaApplication
            }
            Questions => RowScope::OrganizationJobForms,
            Organizations => RowScope::OwnOrganization,
            Notifications | ActivityLog => RowScope::OwnUser,
            Settings => RowScope::All,
        },
    }
}

/// A privileged operation: its gate and every (resource, capability) it exercises.
#[derive(Debug)]
pub struct Operation {
    pub name: &'static str,
    pub gate: Gate,
    pub effects: &'static [(Resource, Capability)],
}

macro_rules! operation {
    ($ident:ident, $name:literal, $gate:ident, [$(($res:ident, $cap:ident)),* $(,)?]) => {
        pub const $ident: Operation = Operation {
            name: $name,
            gate: Gate::$gate,
            effects: &[$((Resource::$res, Capability::$cap)),*],
        };
    };
}

/// Every gated operation the service exposes.
pub mod ops {
    use super::{Capability, Gate, Operation, Resource};

    // Jobs
    operation!(LIST_JOBS, "jobs.list", Staff, [(JobForms, Read), (Applications, Read)]);
    operation!(GET_JOB, "jobs.get", Staff, [(JobForms, Read), (Questions, Read)]);
    operation!(CREATE_JOB, "jobs.create", AdminOrSuper, [(JobForms, Create), (Questions, Create), (ActivityLog, Create)]);
    operation!(UPDATE_JOB, "jobs.update", JobOwnerOrSuper, [(JobForms, Update), (Questions, Create), (Questions, Delete)]);
    operation!(CLOSE_JOB, "jobs.close", JobOwnerOrSuper, [(JobForms, Update)]);
    // Deleting a job removes its applications and everything hanging off them
    operation!(DELETE_JOB, "jobs.delete", JobOwnerOrSuper, [
        (JobForms, Delete), (Questions, Delete), (Applications, Delete), (Answers, Delete),
        (Resumes, Delete), (Evaluations, Delete), (Interviews, Delete), (Assignments, Delete),
        (ExternalProfiles, Delete),
    ]);
    operation!(LIST_ORGANIZATION_USERS, "jobs.organization_users", AdminOrSuper, [(Users, Read)]);

    // Applications and candidates
    operation!(LIST_INCOMPLETE, "applications.incomplete", Staff, [(Applications, Read), (Answers, Read), (Resumes, Read)]);
    operation!(LIST_CANDIDATES, "candidates.list", Staff, [
        (Applications, Read), (Resumes, Read), (ExternalProfiles, Read), (Evaluations, Read),
    ]);
    operation!(GET_CANDIDATE, "candidates.get", Staff, [
        (Applications, Read), (Resumes, Read), (ExternalProfiles, Read), (Evaluations, Read), (Answers, Read),
    ]);

    // Notifications
    operation!(COUNT_UNREAD_NOTIFICATIONS, "notifications.unread_count", Staff, [(Notifications, Read)]);
    operation!(LIST_NOTIFICATIONS, "notifications.list", Staff, [(Notifications, Read)]);
    operation!(READ_ALL_USERS_NOTIFICATIONS, "notifications.scope_all", SuperAdmin, [(Notifications, Read)]);
    operation!(MARK_NOTIFICATION_READ, "notifications.mark_read", Staff, [(Notifications, Update)]);
    operation!(MARK_ALL_NOTIFICATIONS_READ, "notifications.mark_all_read", Staff, [(Notifications, Update)]);

    // Interviews
    operation!(CREATE_INTERVIEW, "interviews.create", AdminOrSuper, [(Interviews, Create), (Notifications, Create)]);
    operation!(LIST_INTERVIEWS, "interviews.list", Staff, [(Interviews, Read)]);
    operation!(GET_INTERVIEW, "interviews.get", Staff, [(Interviews, Read)]);
    operation!(DELETE_INTERVIEW, "interviews.delete", AdminOrSuper, [(Interviews, Delete)]);
    operation!(ANALYZE_INTERVIEW, "interviews.analyze", AdminOrSuper, [(Interviews, Update), (Notifications, Create)]);

    // Assignments
    operation!(CREATE_ASSIGNMENT, "assignments.create", AdminOrSuper, [(Assignments, Create)]);
    operation!(LIST_ASSIGNMENTS, "assignments.list", Staff, [(Assignments, Read)]);
    operation!(GET_ASSIGNMENT, "assignments.get", Staff, [(Assignments, Read)]);
    operation!(DELETE_ASSIGNMENT, "assignments.delete", AdminOrSuper, [(Assignments, Delete)]);

    // Evaluations
    operation!(UPSERT_HR_EVALUATION, "evaluations.hr_upsert", ReviewerOrAbove, [(Evaluations, Create), (Evaluations, Update)]);
    operation!(GET_HR_EVALUATION, "evaluations.hr_get", Staff, [(Evaluations, Read)]);
    operation!(LIST_EVALUATIONS, "evaluations.list", ReviewerOrAdmin, [(Evaluations, Read), (Applications, Read)]);

    // Settings and email
    operation!(GET_SETTINGS, "settings.get", Staff, [(Settings, Read)]);
    operation!(UPDATE_SETTINGS, "settings.update", SuperAdmin, [(Settings, Update)]);
    operation!(SEND_INTERVIEW_INVITATION, "email.interview_invitation", AdminOrSuper, [(Settings, Read)]);

    // Dashboard
    operation!(DASHBOARD_STATS, "dashboard.stats", Staff, [(JobForms, Read), (Applications, Read)]);
    operation!(RECENT_CANDIDATES, "dashboard.recent_candidates", Staff, [(Applications, Read), (Resumes, Read)]);

    // Users and activity
    operation!(LIST_USERS, "users.list", AdminOrSuper, [(Users, Read)]);
    operation!(SET_USER_STATUS, "users.set_status", SuperAdmin, [(Users, Update)]);
    operation!(SET_USER_ROLE, "users.set_role", SuperAdmin, [(Users, Update)]);
    operation!(LIST_ACTIVITY, "activity.list", AdminOrSuper, [(ActivityLog, Read)]);

    operation!(VIEW_PERMISSIONS, "permissions.view", Staff, []);
}

pub const REGISTRY: &[&Operation] = &[
    &ops::LIST_JOBS,
    &ops::GET_JOB,
    &ops::CREATE_JOB,
    &ops::UPDATE_JOB,
    &ops::CLOSE_JOB,
    &ops::DELETE_JOB,
    &ops::LIST_ORGANIZATION_USERS,
    &ops::LIST_INCOMPLETE,
    &ops::LIST_CANDIDATES,
    &ops::GET_CANDIDATE,
    &ops::COUNT_UNREAD_NOTIFICATIONS,
    &ops::LIST_NOTIFICATIONS,
    &ops::READ_ALL_USERS_NOTIFICATIONS,
    &ops::MARK_NOTIFICATION_READ,
    &ops::MARK_ALL_NOTIFICATIONS_READ,
    &ops::CREATE_INTERVIEW,
    &ops::LIST_INTERVIEWS,
    &ops::GET_INTERVIEW,
    &ops::DELETE_INTERVIEW,
    &ops::ANALYZE_INTERVIEW,
    &ops::CREATE_ASSIGNMENT,
    &ops::LIST_ASSIGNMENTS,
    &ops::GET_ASSIGNMENT,
    &ops::DELETE_ASSIGNMENT,
    &ops::UPSERT_HR_EVALUATION,
    &ops::GET_HR_EVALUATION,
    &ops::LIST_EVALUATIONS,
    &ops::GET_SETTINGS,
    &ops::UPDATE_SETTINGS,
    &ops::SEND_INTERVIEW_INVITATION,
    &ops::DASHBOARD_STATS,
    &ops::RECENT_CANDIDATES,
    &ops::LIST_USERS,
    &ops::SET_USER_STATUS,
    &ops::SET_USER_ROLE,
    &ops::LIST_ACTIVITY,
    &ops::VIEW_PERMISSIONS,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePermissions {
    pub can_read: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub row_scope: RowScope,
}

impl ResourcePermissions {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.can_read,
            Capability::Create => self.can_create,
            Capability::Update => self.can_update,
            Capability::Delete => self.can_delete,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionDescriptor {
    pub role: Role,
    pub resources: BTreeMap<Resource, ResourcePermissions>,
}

impl PermissionDescriptor {
    pub fn get(&self, resource: Resource) -> &ResourcePermissions {
        // Every resource is populated by `descriptor_for`
        &self.resources[&resource]
    }
}

/// True when some registered operation admitting `role` exercises `capability` on `resource`.
pub fn is_granted(role: Role, resource: Resource, capability: Capability) -> bool {
    REGISTRY.iter().any(|op| {
        op.gate.admits(role) && op.effects.iter().any(|&(r, c)| r == resource && c == capability)
    })
}

pub fn descriptor_for(role: Role) -> PermissionDescriptor {
    let resources = Resource::ALL
        .iter()
        .map(|&resource| {
            let permissions = ResourcePermissions {
                can_read: is_granted(role, resource, Capability::Read),
                can_create: is_granted(role, resource, Capability::Create),
                can_update: is_granted(role, resource, Capability::Update),
                can_delete: is_granted(role, resource, Capability::Delete),
                row_scope: row_scope(role, resource),
            };
            (resource, permissions)
        })
        .collect();

    PermissionDescriptor { role, resources }
}
