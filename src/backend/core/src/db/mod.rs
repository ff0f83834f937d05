//! Database layer for Atrium.
//!
//! Uses PostgreSQL for persistent storage with sqlx. Query functions accept
//! the optional [`Constraint`] produced by an access decision and translate
//! it into a `WHERE` clause, so a `Filter` decision is enforced at the row
//! level and a foreign-tenant record is simply absent from every result set.
//! Denials never reach this layer; callers reject them first.

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::access::Constraint;
use crate::collections::{
    FormRecord, MediaRecord, SubmissionRecord, TenantRecord, UserRecord,
};
use crate::error::{AtriumError, Result};

/// Database connection and operations.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AtriumError::from(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Users
    // ═══════════════════════════════════════════════════════════════════════════

    /// Look up a user by email. Unscoped: used by the login flow before any
    /// actor exists.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// List users within the given scope.
    pub async fn list_users(&self, constraint: Option<&Constraint>) -> Result<Vec<UserRecord>> {
        let rows = match constraint {
            None => {
                sqlx::query_as::<_, UserRecord>(
                    r#"
                    SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
                    FROM users
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query_as::<_, UserRecord>(
                    r#"
                    SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
                    FROM users
                    WHERE tenant_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(tenant.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            Some(Constraint::IdEquals(id)) => {
                sqlx::query_as::<_, UserRecord>(
                    r#"
                    SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
                    FROM users
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "users")),
        };

        Ok(rows)
    }

    /// Get one user within the given scope. A row outside the scope is
    /// indistinguishable from a missing row.
    pub async fn get_user(
        &self,
        id: &str,
        constraint: Option<&Constraint>,
    ) -> Result<Option<UserRecord>> {
        let row = match constraint {
            None => {
                sqlx::query_as::<_, UserRecord>(
                    r#"
                    SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
                    FROM users
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query_as::<_, UserRecord>(
                    r#"
                    SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
                    FROM users
                    WHERE id = $1 AND tenant_id = $2
                    "#,
                )
                .bind(id)
                .bind(tenant.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
            Some(Constraint::IdEquals(own_id)) => {
                sqlx::query_as::<_, UserRecord>(
                    r#"
                    SELECT id, email, role, tenant_id, password_hash, created_at, updated_at
                    FROM users
                    WHERE id = $1 AND id = $2
                    "#,
                )
                .bind(id)
                .bind(own_id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "users")),
        };

        Ok(row)
    }

    /// Insert a new user.
    pub async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, role, tenant_id, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.tenant.as_ref().map(|t| t.id().as_str()))
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write back a modified user. The tenant column is intentionally not
    /// part of the update: a tenant reference is immutable once set.
    pub async fn update_user(&self, user: &UserRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, role = $3, password_hash = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a user within the given scope. Returns the number of rows
    /// removed (0 when the row was outside the scope).
    pub async fn delete_user(&self, id: &str, constraint: Option<&Constraint>) -> Result<u64> {
        let result = match constraint {
            None => {
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query("DELETE FROM users WHERE id = $1 AND tenant_id = $2")
                    .bind(id)
                    .bind(tenant.as_str())
                    .execute(&self.pool)
                    .await?
            }
            Some(other) => return Err(inapplicable(other, "users")),
        };

        Ok(result.rows_affected())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Tenants
    // ═══════════════════════════════════════════════════════════════════════════

    /// List tenants within the given scope.
    pub async fn list_tenants(
        &self,
        constraint: Option<&Constraint>,
    ) -> Result<Vec<TenantRecord>> {
        let rows = match constraint {
            None => {
                sqlx::query_as::<_, TenantRecord>(
                    "SELECT id, name, slug, created_at FROM tenants ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            // For the tenants table the "own row" scope is an id match.
            Some(Constraint::IdEquals(id)) => {
                sqlx::query_as::<_, TenantRecord>(
                    "SELECT id, name, slug, created_at FROM tenants WHERE id = $1",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "tenants")),
        };

        Ok(rows)
    }

    /// Get one tenant within the given scope.
    pub async fn get_tenant(
        &self,
        id: &str,
        constraint: Option<&Constraint>,
    ) -> Result<Option<TenantRecord>> {
        let row = match constraint {
            None => {
                sqlx::query_as::<_, TenantRecord>(
                    "SELECT id, name, slug, created_at FROM tenants WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(Constraint::IdEquals(own_id)) => {
                sqlx::query_as::<_, TenantRecord>(
                    "SELECT id, name, slug, created_at FROM tenants WHERE id = $1 AND id = $2",
                )
                .bind(id)
                .bind(own_id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "tenants")),
        };

        Ok(row)
    }

    /// Insert a new tenant.
    pub async fn insert_tenant(&self, tenant: &TenantRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, slug, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(tenant.id.as_str())
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(tenant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Media
    // ═══════════════════════════════════════════════════════════════════════════

    /// List media within the given scope.
    pub async fn list_media(&self, constraint: Option<&Constraint>) -> Result<Vec<MediaRecord>> {
        let rows = match constraint {
            None => {
                sqlx::query_as::<_, MediaRecord>(
                    r#"
                    SELECT id, tenant_id, alt, filename, mime_type, filesize, created_at
                    FROM media
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query_as::<_, MediaRecord>(
                    r#"
                    SELECT id, tenant_id, alt, filename, mime_type, filesize, created_at
                    FROM media
                    WHERE tenant_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(tenant.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "media")),
        };

        Ok(rows)
    }

    /// Get one media record within the given scope.
    pub async fn get_media(
        &self,
        id: &str,
        constraint: Option<&Constraint>,
    ) -> Result<Option<MediaRecord>> {
        let row = match constraint {
            None => {
                sqlx::query_as::<_, MediaRecord>(
                    r#"
                    SELECT id, tenant_id, alt, filename, mime_type, filesize, created_at
                    FROM media
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query_as::<_, MediaRecord>(
                    r#"
                    SELECT id, tenant_id, alt, filename, mime_type, filesize, created_at
                    FROM media
                    WHERE id = $1 AND tenant_id = $2
                    "#,
                )
                .bind(id)
                .bind(tenant.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "media")),
        };

        Ok(row)
    }

    /// Insert a new media record.
    pub async fn insert_media(&self, media: &MediaRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media (id, tenant_id, alt, filename, mime_type, filesize, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(media.id.as_str())
        .bind(media.tenant.id().as_str())
        .bind(&media.alt)
        .bind(&media.filename)
        .bind(&media.mime_type)
        .bind(media.filesize)
        .bind(media.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Update a media record's alt text within the given scope. Returns the
    /// number of rows touched.
    pub async fn update_media_alt(
        &self,
        id: &str,
        alt: &str,
        constraint: Option<&Constraint>,
    ) -> Result<u64> {
        let result = match constraint {
            None => {
                sqlx::query("UPDATE media SET alt = $2 WHERE id = $1")
                    .bind(id)
                    .bind(alt)
                    .execute(&self.pool)
                    .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query("UPDATE media SET alt = $2 WHERE id = $1 AND tenant_id = $3")
                    .bind(id)
                    .bind(alt)
                    .bind(tenant.as_str())
                    .execute(&self.pool)
                    .await?
            }
            Some(other) => return Err(inapplicable(other, "media")),
        };

        Ok(result.rows_affected())
    }

    /// Delete a media record within the given scope.
    pub async fn delete_media(&self, id: &str, constraint: Option<&Constraint>) -> Result<u64> {
        let result = match constraint {
            None => {
                sqlx::query("DELETE FROM media WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query("DELETE FROM media WHERE id = $1 AND tenant_id = $2")
                    .bind(id)
                    .bind(tenant.as_str())
                    .execute(&self.pool)
                    .await?
            }
            Some(other) => return Err(inapplicable(other, "media")),
        };

        Ok(result.rows_affected())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Forms
    // ═══════════════════════════════════════════════════════════════════════════

    /// List forms within the given scope.
    pub async fn list_forms(&self, constraint: Option<&Constraint>) -> Result<Vec<FormRecord>> {
        let rows = match constraint {
            None => {
                sqlx::query_as::<_, FormRecord>(
                    r#"
                    SELECT id, tenant_id, title, fields, confirmation_message, created_at, updated_at
                    FROM forms
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(Constraint::TenantEquals(tenant)) => {
                sqlx::query_as::<_, FormRecord>(
                    r#"
                    SELECT id, tenant_id, title, fields, confirmation_message, created_at, updated_at
                    FROM forms
                    WHERE tenant_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(tenant.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "forms")),
        };

        Ok(rows)
    }

    /// Get one form by ID, unscoped.
    ///
    /// Used by the public form contract and as the ownership lookup for
    /// Update/Delete decisions, which must see the persisted record before
    /// any filtering.
    pub async fn get_form(&self, id: &str) -> Result<Option<FormRecord>> {
        let row = sqlx::query_as::<_, FormRecord>(
            r#"
            SELECT id, tenant_id, title, fields, confirmation_message, created_at, updated_at
            FROM forms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert a new form.
    pub async fn insert_form(&self, form: &FormRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO forms (id, tenant_id, title, fields, confirmation_message, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(form.id.as_str())
        .bind(form.tenant.id().as_str())
        .bind(&form.title)
        .bind(serde_json::to_value(&form.fields)?)
        .bind(&form.confirmation_message)
        .bind(form.created_at)
        .bind(form.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write back a modified form definition. The tenant column is not part
    /// of the update: a tenant reference is immutable once set.
    pub async fn update_form(&self, form: &FormRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE forms
            SET title = $2, fields = $3, confirmation_message = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(form.id.as_str())
        .bind(&form.title)
        .bind(serde_json::to_value(&form.fields)?)
        .bind(&form.confirmation_message)
        .bind(form.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a form and its submissions.
    pub async fn delete_form(&self, id: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM form_submissions WHERE form_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Form Submissions
    // ═══════════════════════════════════════════════════════════════════════════

    /// Insert a new form submission.
    pub async fn insert_submission(&self, submission: &SubmissionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO form_submissions (id, form_id, submission_data, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(submission.id.as_str())
        .bind(submission.form.as_str())
        .bind(serde_json::to_value(&submission.submission_data)?)
        .bind(submission.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List submissions within the given scope. The parent-form scope joins
    /// through `forms` since submissions have no tenant column of their own.
    pub async fn list_submissions(
        &self,
        constraint: Option<&Constraint>,
    ) -> Result<Vec<SubmissionRecord>> {
        let rows = match constraint {
            None => {
                sqlx::query_as::<_, SubmissionRecord>(
                    r#"
                    SELECT id, form_id, submission_data, created_at
                    FROM form_submissions
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(Constraint::ParentFormTenantEquals(tenant)) => {
                sqlx::query_as::<_, SubmissionRecord>(
                    r#"
                    SELECT s.id, s.form_id, s.submission_data, s.created_at
                    FROM form_submissions s
                    JOIN forms f ON f.id = s.form_id
                    WHERE f.tenant_id = $1
                    ORDER BY s.created_at DESC
                    "#,
                )
                .bind(tenant.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            Some(other) => return Err(inapplicable(other, "form_submissions")),
        };

        Ok(rows)
    }
}

/// The access rules only emit constraints that fit each collection's shape;
/// anything else reaching this layer is a wiring bug, not a user error.
fn inapplicable(constraint: &Constraint, collection: &str) -> AtriumError {
    AtriumError::internal(format!(
        "constraint {:?} is not applicable to the {} collection",
        constraint, collection
    ))
}
