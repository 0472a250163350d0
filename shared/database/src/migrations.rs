use anyhow::Result;
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            code VARCHAR(10) PRIMARY KEY,
            name VARCHAR NOT NULL,
            responsibilities JSONB NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id UUID PRIMARY KEY,
            code VARCHAR(50) NOT NULL UNIQUE,
            name VARCHAR NOT NULL,
            brand TEXT,
            description TEXT,
            detailed_description TEXT,
            specifications TEXT,
            ingredients TEXT,
            usage TEXT,
            instructions TEXT,
            storage TEXT,
            development_reason TEXT,
            similar_products TEXT,
            usp TEXT,
            primary_owner_department VARCHAR(10) NOT NULL,
            secondary_access_departments JSONB NOT NULL DEFAULT '[]',
            status VARCHAR NOT NULL,
            compliance_percentage DOUBLE PRECISION NOT NULL DEFAULT 0,
            completeness_score DOUBLE PRECISION NOT NULL DEFAULT 0,
            missing_fields JSONB NOT NULL DEFAULT '[]',
            validation_errors JSONB NOT NULL DEFAULT '{}',
            last_completeness_check TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id UUID PRIMARY KEY,
            category_key VARCHAR(100) NOT NULL,
            file_name VARCHAR NOT NULL,
            product_id UUID REFERENCES products(id),
            batch_id UUID,
            primary_owner_department VARCHAR(10) NOT NULL,
            secondary_access_departments JSONB NOT NULL DEFAULT '[]',
            deadline TIMESTAMPTZ,
            status VARCHAR NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            uploaded_by UUID,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            deleted_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id UUID PRIMARY KEY,
            alert_type VARCHAR NOT NULL,
            priority VARCHAR NOT NULL,
            title VARCHAR NOT NULL,
            message TEXT NOT NULL,
            primary_responsible_department VARCHAR(10) NOT NULL,
            secondary_involved_departments JSONB NOT NULL DEFAULT '[]',
            product_id UUID,
            document_id UUID,
            batch_id UUID,
            entity_key VARCHAR NOT NULL,
            dedup_scope VARCHAR NOT NULL,
            status VARCHAR NOT NULL,
            due_date TIMESTAMPTZ,
            resolved_at TIMESTAMPTZ,
            resolved_by UUID,
            resolution_notes TEXT,
            metadata JSONB NOT NULL DEFAULT 'null',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_primary_owner ON products(primary_owner_department)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_secondary_access ON products USING GIN(secondary_access_departments)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_product_id ON documents(product_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_deadline ON documents(deadline) WHERE deleted_at IS NULL")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alerts_entity_key ON alerts(entity_key)")
        .execute(pool)
        .await?;

    // One blocking alert per (type, entity), scoped per dedup policy
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uq_alerts_unresolved
        ON alerts(alert_type, entity_key)
        WHERE dedup_scope = 'unresolved' AND status IN ('open', 'in_progress')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uq_alerts_open_only
        ON alerts(alert_type, entity_key)
        WHERE dedup_scope = 'open_only' AND status = 'open'
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("PostgreSQL migrations completed");
    Ok(())
}
