//! The Tenants collection: the isolation boundaries themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::access::{Candidate, TenantId, TenantRef};

/// A stored tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl TenantRecord {
    /// A tenant row is owned by itself.
    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: Some(self.id.as_str().to_string()),
            tenant: Some(TenantRef::Id(self.id.clone())),
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for TenantRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: TenantId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
