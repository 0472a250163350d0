//! Department Repository
//!
//! Departments are static reference data mirrored from the rule matrix.

use sqlx::{FromRow, PgPool};

use prodtrack_models::{Department, DepartmentCode};
use prodtrack_utils::{validate_model, TrackerResult};

pub struct DepartmentRepository {
    pool: PgPool,
}

impl DepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts every department in a single transaction.
    pub async fn sync(&self, departments: &[Department]) -> TrackerResult<usize> {
        let mut tx = self.pool.begin().await?;

        for department in departments {
            validate_model(department)?;
            sqlx::query(
                r#"
                INSERT INTO departments (code, name, responsibilities)
                VALUES ($1, $2, $3)
                ON CONFLICT (code) DO UPDATE SET
                    name = EXCLUDED.name,
                    responsibilities = EXCLUDED.responsibilities
                "#,
            )
            .bind(department.code.as_str())
            .bind(&department.name)
            .bind(serde_json::to_value(&department.responsibilities)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(count = departments.len(), "Synchronized departments");
        Ok(departments.len())
    }

    pub async fn list(&self) -> TrackerResult<Vec<Department>> {
        let rows: Vec<DepartmentRow> =
            sqlx::query_as("SELECT code, name, responsibilities FROM departments ORDER BY code")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| -> TrackerResult<Department> {
                Ok(Department {
                    code: DepartmentCode::new(row.code),
                    name: row.name,
                    responsibilities: serde_json::from_value(row.responsibilities)?,
                })
            })
            .collect()
    }
}

#[derive(Debug, FromRow)]
struct DepartmentRow {
    code: String,
    name: String,
    responsibilities: serde_json::Value,
}
