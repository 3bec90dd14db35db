use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::authz::{authorize, ops, OrgScope, Session};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub total_candidates: i64,
    pub new_applications: i64,
    pub interviews_scheduled: i64,
    pub offers_made: i64,
    pub hires: i64,
    pub rejection_rate: i64,
}

/// Percentage of all candidates that were rejected, rounded
pub fn rejection_rate(rejected: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (rejected as f64 / total as f64 * 100.0).round() as i64
}

/// Midnight UTC on the first day of `now`'s month
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    match first.and_hms_opt(0, 0, 0) {
        Some(midnight) => Utc.from_utc_datetime(&midnight),
        None => now,
    }
}

enum Filter {
    None,
    JobStatus(&'static str),
    ApplicationStatus(&'static str),
    CreatedSince(DateTime<Utc>),
}

pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn stats(&self, session: Option<&Session>) -> Result<DashboardStats, ApiError> {
        let session = authorize(session, &ops::DASHBOARD_STATS)?;
        let scope = session.org_scope();
        let month = start_of_month(Utc::now());

        let (total_jobs, active_jobs, total_candidates, new_applications, interviews, offers, hires, rejected) = tokio::try_join!(
            self.count_jobs(scope, Filter::None),
            self.count_jobs(scope, Filter::JobStatus("active")),
            self.count_applications(scope, Filter::None),
            self.count_applications(scope, Filter::CreatedSince(month)),
            self.count_applications(scope, Filter::ApplicationStatus("interview")),
            self.count_applications(scope, Filter::ApplicationStatus("offer")),
            self.count_applications(scope, Filter::ApplicationStatus("hired")),
            self.count_applications(scope, Filter::ApplicationStatus("rejected")),
        )?;

        Ok(DashboardStats {
            total_jobs,
            active_jobs,
            total_candidates,
            new_applications,
            interviews_scheduled: interviews,
            offers_made: offers,
            hires,
            rejection_rate: rejection_rate(rejected, total_candidates),
        })
    }

    async fn count_jobs(&self, scope: OrgScope, filter: Filter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT count(*) FROM job_forms jf WHERE TRUE");
        scope.push_filter(&mut qb, "jf.organization_id");
        if let Filter::JobStatus(status) = filter {
            qb.push(" AND jf.status = ").push_bind(status);
        }
        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn count_applications(&self, scope: OrgScope, filter: Filter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT count(*) FROM applications a JOIN job_forms jf ON jf.id = a.job_form_id WHERE TRUE",
        );
        scope.push_filter(&mut qb, "jf.organization_id");
        match filter {
            Filter::ApplicationStatus(status) => {
                qb.push(" AND a.status = ").push_bind(status);
            }
            Filter::CreatedSince(since) => {
                qb.push(" AND a.created_at >= ").push_bind(since);
            }
            Filter::None | Filter::JobStatus(_) => {}
        }
        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_rate_rounds() {
        assert_eq!(rejection_rate(1, 3), 33);
        assert_eq!(rejection_rate(2, 3), 67);
        assert_eq!(rejection_rate(0, 10), 0);
    }

    #[test]
    fn rejection_rate_without_candidates_is_zero() {
        assert_eq!(rejection_rate(0, 0), 0);
        assert_eq!(rejection_rate(5, 0), 0);
    }

    #[test]
    fn month_starts_at_midnight_on_the_first() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 15, 42, 7).unwrap();
        assert_eq!(start_of_month(now), Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap());
    }
}
