//! The Forms and Form Submissions collections.
//!
//! A form is a tenant-owned definition of fields; a submission is an
//! anonymous response bound to its parent form. Submissions carry no tenant
//! column of their own; their tenant is always derived through the parent
//! form, which is how the access rules scope them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt;
use uuid::Uuid;

use crate::access::{Candidate, FormId, TenantId, TenantRef};

// ═══════════════════════════════════════════════════════════════════════════════
// Forms
// ═══════════════════════════════════════════════════════════════════════════════

/// One field in a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub label: String,
    /// Input kind as rendered by the front-end (`text`, `email`, `number`, ...).
    pub block_type: String,
    #[serde(default)]
    pub required: bool,
}

/// A stored form definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: FormId,
    /// Always present: forms are tenant-stamped at creation.
    pub tenant: TenantRef,
    pub title: String,
    pub fields: Vec<FormField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormRecord {
    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: Some(self.id.as_str().to_string()),
            tenant: Some(self.tenant.clone()),
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for FormRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let fields_json: serde_json::Value = row.try_get("fields")?;
        let fields = serde_json::from_value(fields_json).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "fields".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Self {
            id: FormId::new(row.try_get::<String, _>("id")?),
            tenant: TenantRef::Id(TenantId::new(row.try_get::<String, _>("tenant_id")?)),
            title: row.try_get("title")?,
            fields,
            confirmation_message: row.try_get("confirmation_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Form Submissions
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed submission identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

impl SubmissionId {
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

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One submitted field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionValue {
    pub field: String,
    pub value: String,
}

/// A stored form response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub form: FormId,
    pub submission_data: Vec<SubmissionValue>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for SubmissionRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let data_json: serde_json::Value = row.try_get("submission_data")?;
        let submission_data = serde_json::from_value(data_json).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "submission_data".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Self {
            id: SubmissionId::new(row.try_get::<String, _>("id")?),
            form: FormId::new(row.try_get::<String, _>("form_id")?),
            submission_data,
            created_at: row.try_get("created_at")?,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_candidate_carries_tenant() {
        let record = FormRecord {
            id: FormId::new("f1"),
            tenant: TenantRef::Id(TenantId::new("t1")),
            title: "Contact".to_string(),
            fields: vec![],
            confirmation_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let candidate = record.candidate();
        assert_eq!(candidate.id.as_deref(), Some("f1"));
        assert_eq!(candidate.tenant_id().map(TenantId::as_str), Some("t1"));
    }

    #[test]
    fn test_form_field_wire_format() {
        let field = FormField {
            name: "email".to_string(),
            label: "Email".to_string(),
            block_type: "email".to_string(),
            required: true,
        };

        let json = serde_json::to_string(&field).unwrap();
        assert!(json.contains("\"blockType\":\"email\""));

        // `required` defaults to false when omitted.
        let parsed: FormField =
            serde_json::from_str(r#"{"name":"n","label":"N","blockType":"text"}"#).unwrap();
        assert!(!parsed.required);
    }

    #[test]
    fn test_submission_wire_format() {
        let record = SubmissionRecord {
            id: SubmissionId::new("s1"),
            form: FormId::new("f1"),
            submission_data: vec![SubmissionValue {
                field: "email".to_string(),
                value: "a@b.test".to_string(),
            }],
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"submissionData\""));
    }
}
