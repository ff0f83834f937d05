//! The Users collection: authenticated accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::access::{Candidate, Role, TenantId, TenantRef, UserId};

/// A stored user account.
///
/// The password hash never leaves the database layer in serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    /// Required for every non-super-admin account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantRef>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// The ownership view used for Update/Delete decisions.
    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: Some(self.id.as_str().to_string()),
            tenant: self.tenant.clone(),
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role_raw: String = row.try_get("role")?;
        let role = Role::parse(&role_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: format!("unknown role value: {}", role_raw).into(),
        })?;

        Ok(Self {
            id: UserId::new(row.try_get::<String, _>("id")?),
            email: row.try_get("email")?,
            role,
            tenant: row
                .try_get::<Option<String>, _>("tenant_id")?
                .map(|t| TenantRef::Id(TenantId::new(t))),
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
