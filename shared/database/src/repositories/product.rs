//! Product Repository
//!
//! Uses runtime SQL queries to avoid requiring DATABASE_URL at compile time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use prodtrack_models::{CompletenessReport, DepartmentCode, DepartmentSet, Product, ProductStatus};
use prodtrack_utils::{validate_model, TrackerError, TrackerResult};

use crate::store::ProductStore;

const PRODUCT_COLUMNS: &str = r#"
    id, code, name, brand, description, detailed_description, specifications,
    ingredients, usage, instructions, storage, development_reason,
    similar_products, usp, primary_owner_department, secondary_access_departments,
    status, compliance_percentage, completeness_score, missing_fields,
    validation_errors, last_completeness_check, created_at, updated_at
"#;

pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn find_product(&self, id: Uuid) -> TrackerResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list_products(&self, offset: i64, limit: i64) -> TrackerResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products ORDER BY created_at, id OFFSET $1 LIMIT $2",
            PRODUCT_COLUMNS
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn list_products_for_department(
        &self,
        department: &DepartmentCode,
        offset: i64,
        limit: i64,
    ) -> TrackerResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM products
            WHERE primary_owner_department = $1
               OR secondary_access_departments @> jsonb_build_array($1::text)
            ORDER BY created_at, id
            OFFSET $2 LIMIT $3
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(department.as_str())
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn save_product(&self, product: &Product) -> TrackerResult<()> {
        validate_model(product)?;

        sqlx::query(
            r#"
            INSERT INTO products
                (id, code, name, brand, description, detailed_description, specifications,
                 ingredients, usage, instructions, storage, development_reason,
                 similar_products, usp, primary_owner_department, secondary_access_departments,
                 status, compliance_percentage, completeness_score, missing_fields,
                 validation_errors, last_completeness_check, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24)
            ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                brand = EXCLUDED.brand,
                description = EXCLUDED.description,
                detailed_description = EXCLUDED.detailed_description,
                specifications = EXCLUDED.specifications,
                ingredients = EXCLUDED.ingredients,
                usage = EXCLUDED.usage,
                instructions = EXCLUDED.instructions,
                storage = EXCLUDED.storage,
                development_reason = EXCLUDED.development_reason,
                similar_products = EXCLUDED.similar_products,
                usp = EXCLUDED.usp,
                primary_owner_department = EXCLUDED.primary_owner_department,
                secondary_access_departments = EXCLUDED.secondary_access_departments,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(&product.detailed_description)
        .bind(&product.specifications)
        .bind(&product.ingredients)
        .bind(&product.usage)
        .bind(&product.instructions)
        .bind(&product.storage)
        .bind(&product.development_reason)
        .bind(&product.similar_products)
        .bind(&product.usp)
        .bind(product.primary_owner_department.as_str())
        .bind(product.secondary_access_departments.encode())
        .bind(product.status.as_str())
        .bind(product.compliance_percentage)
        .bind(product.completeness_score)
        .bind(serde_json::to_value(&product.missing_fields)?)
        .bind(serde_json::to_value(&product.validation_errors)?)
        .bind(product.last_completeness_check)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn cache_completeness(
        &self,
        product_id: Uuid,
        report: &CompletenessReport,
    ) -> TrackerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                completeness_score = $2,
                missing_fields = $3,
                validation_errors = $4,
                last_completeness_check = $5
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(report.completeness_score)
        .bind(serde_json::to_value(&report.missing_fields)?)
        .bind(serde_json::to_value(&report.validation_errors)?)
        .bind(report.checked_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::not_found(format!("product {}", product_id)));
        }
        Ok(())
    }

    async fn cache_compliance(&self, product_id: Uuid, compliance_percentage: f64) -> TrackerResult<()> {
        let result = sqlx::query("UPDATE products SET compliance_percentage = $2 WHERE id = $1")
            .bind(product_id)
            .bind(compliance_percentage)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::not_found(format!("product {}", product_id)));
        }
        Ok(())
    }
}

/// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    code: String,
    name: String,
    brand: Option<String>,
    description: Option<String>,
    detailed_description: Option<String>,
    specifications: Option<String>,
    ingredients: Option<String>,
    usage: Option<String>,
    instructions: Option<String>,
    storage: Option<String>,
    development_reason: Option<String>,
    similar_products: Option<String>,
    usp: Option<String>,
    primary_owner_department: String,
    secondary_access_departments: serde_json::Value,
    status: String,
    compliance_percentage: f64,
    completeness_score: f64,
    missing_fields: serde_json::Value,
    validation_errors: serde_json::Value,
    last_completeness_check: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = TrackerError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status = ProductStatus::from_str(&row.status).ok_or_else(|| {
            TrackerError::database(format!("Unknown product status '{}'", row.status))
        })?;

        Ok(Self {
            id: row.id,
            code: row.code,
            name: row.name,
            brand: row.brand,
            description: row.description,
            detailed_description: row.detailed_description,
            specifications: row.specifications,
            ingredients: row.ingredients,
            usage: row.usage,
            instructions: row.instructions,
            storage: row.storage,
            development_reason: row.development_reason,
            similar_products: row.similar_products,
            usp: row.usp,
            primary_owner_department: DepartmentCode::new(row.primary_owner_department),
            secondary_access_departments: DepartmentSet::decode(&row.secondary_access_departments)?,
            status,
            compliance_percentage: row.compliance_percentage,
            completeness_score: row.completeness_score,
            missing_fields: serde_json::from_value(row.missing_fields)?,
            validation_errors: serde_json::from_value(row.validation_errors)?,
            last_completeness_check: row.last_completeness_check,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
