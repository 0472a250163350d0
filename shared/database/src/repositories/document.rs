//! Document Repository
//!
//! Soft-deleted and archived documents are kept for history but never
//! returned as uploads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use prodtrack_models::{DepartmentCode, DepartmentSet, Document, DocumentStatus};
use prodtrack_utils::{validate_model, TrackerError, TrackerResult};

use crate::store::DocumentStore;

const DOCUMENT_COLUMNS: &str = r#"
    id, category_key, file_name, product_id, batch_id, primary_owner_department,
    secondary_access_departments, deadline, status, version, uploaded_by,
    created_at, updated_at, deleted_at
"#;

const COUNTABLE: &str = "deleted_at IS NULL AND status IN ('active', 'draft')";

pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn find_document(&self, id: Uuid) -> TrackerResult<Option<Document>> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Document::try_from).transpose()
    }

    async fn save_document(&self, document: &Document) -> TrackerResult<()> {
        validate_model(document)?;

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, category_key, file_name, product_id, batch_id, primary_owner_department,
                 secondary_access_departments, deadline, status, version, uploaded_by,
                 created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                file_name = EXCLUDED.file_name,
                secondary_access_departments = EXCLUDED.secondary_access_departments,
                deadline = EXCLUDED.deadline,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at,
                deleted_at = EXCLUDED.deleted_at
            "#,
        )
        .bind(document.id)
        .bind(&document.category_key)
        .bind(&document.file_name)
        .bind(document.product_id)
        .bind(document.batch_id)
        .bind(document.primary_owner_department.as_str())
        .bind(document.secondary_access_departments.encode())
        .bind(document.deadline)
        .bind(document.status.as_str())
        .bind(document.version)
        .bind(document.uploaded_by)
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(document.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn documents_for_product(&self, product_id: Uuid) -> TrackerResult<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM documents WHERE product_id = $1 AND {} ORDER BY created_at, id",
            DOCUMENT_COLUMNS, COUNTABLE
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn documents_with_deadline_before(
        &self,
        until: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> TrackerResult<Vec<Document>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM documents
            WHERE deadline IS NOT NULL AND deadline <= $1 AND {}
            ORDER BY deadline, id
            OFFSET $2 LIMIT $3
            "#,
            DOCUMENT_COLUMNS, COUNTABLE
        ))
        .bind(until)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }
}

/// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    category_key: String,
    file_name: String,
    product_id: Option<Uuid>,
    batch_id: Option<Uuid>,
    primary_owner_department: String,
    secondary_access_departments: serde_json::Value,
    deadline: Option<DateTime<Utc>>,
    status: String,
    version: i32,
    uploaded_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = TrackerError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let status = DocumentStatus::from_str(&row.status).ok_or_else(|| {
            TrackerError::database(format!("Unknown document status '{}'", row.status))
        })?;

        Ok(Self {
            id: row.id,
            category_key: row.category_key,
            file_name: row.file_name,
            product_id: row.product_id,
            batch_id: row.batch_id,
            primary_owner_department: DepartmentCode::new(row.primary_owner_department),
            secondary_access_departments: DepartmentSet::decode(&row.secondary_access_departments)?,
            deadline: row.deadline,
            status,
            version: row.version,
            uploaded_by: row.uploaded_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}
