//! The Media collection: uploaded asset metadata.
//!
//! Byte storage is the upload collaborator's concern; this collection carries
//! the tenant-owned metadata the access rules reason about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt;
use uuid::Uuid;

use crate::access::{Candidate, TenantId, TenantRef};

/// Strongly-typed media identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_uuid() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored media asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: MediaId,
    /// Always present: media is tenant-stamped at creation.
    pub tenant: TenantRef,
    pub alt: String,
    pub filename: String,
    pub mime_type: String,
    pub filesize: i64,
    pub created_at: DateTime<Utc>,
}

impl MediaRecord {
    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: Some(self.id.as_str().to_string()),
            tenant: Some(self.tenant.clone()),
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for MediaRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: MediaId::new(row.try_get::<String, _>("id")?),
            tenant: TenantRef::Id(TenantId::new(row.try_get::<String, _>("tenant_id")?)),
            alt: row.try_get("alt")?,
            filename: row.try_get("filename")?,
            mime_type: row.try_get("mime_type")?,
            filesize: row.try_get("filesize")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_carries_tenant() {
        let record = MediaRecord {
            id: MediaId::new("m1"),
            tenant: TenantRef::Id(TenantId::new("t1")),
            alt: "logo".to_string(),
            filename: "logo.png".to_string(),
            mime_type: "image/png".to_string(),
            filesize: 1024,
            created_at: Utc::now(),
        };

        let candidate = record.candidate();
        assert_eq!(candidate.id.as_deref(), Some("m1"));
        assert_eq!(candidate.tenant_id().map(TenantId::as_str), Some("t1"));
    }
}
