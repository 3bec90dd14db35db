use sqlx::{postgres::PgRow, FromRow, PgPool};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Row access shared by the per-application child tables
/// (interviews, assignments, resumes and the like).
pub struct Repository<'p, T> {
    table: &'static str,
    columns: &'static str,
    pool: &'p PgPool,
    _phantom: PhantomData<T>,
}

impl<'p, T> Repository<'p, T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    /// `table` and `columns` are compile-time constants, never user input.
    pub fn new(table: &'static str, columns: &'static str, pool: &'p PgPool) -> Self {
        Self {
            table,
            columns,
            pool,
            _phantom: PhantomData,
        }
    }

    pub async fn select_one(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", self.columns, self.table);
        Ok(sqlx::query_as::<_, T>(&sql).bind(id).fetch_optional(self.pool).await?)
    }

    pub async fn select_404(&self, id: Uuid, not_found: &str) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(not_found.to_string()))
    }

    pub async fn select_by_application(&self, application_id: Uuid, newest_first: bool) -> Result<Vec<T>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE application_id = $1 ORDER BY created_at {}",
            self.columns,
            self.table,
            if newest_first { "DESC" } else { "ASC" }
        );
        Ok(sqlx::query_as::<_, T>(&sql).bind(application_id).fetch_all(self.pool).await?)
    }

    /// Returns whether a row was removed
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = sqlx::query(&sql).bind(id).execute(self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Organization of the job form owning the row's application.
    /// Outer `None` when the row does not exist.
    pub async fn owning_organization(&self, id: Uuid) -> Result<Option<Option<Uuid>>, DatabaseError> {
        let sql = format!(
            "SELECT jf.organization_id FROM {} t \
             JOIN applications a ON a.id = t.application_id \
             JOIN job_forms jf ON jf.id = a.job_form_id \
             WHERE t.id = $1",
            self.table
        );
        Ok(sqlx::query_scalar::<_, Option<Uuid>>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }
}
