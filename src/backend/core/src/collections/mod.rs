//! The protected resource collections.
//!
//! Every record type (except a user acting on itself, and submissions, which
//! derive theirs through the parent form) carries a tenant reference set by
//! the stamping hook at creation time, and exposes a `candidate()` ownership
//! view for record-level access decisions.

pub mod forms;
pub mod media;
pub mod tenants;
pub mod users;

pub use forms::{FormField, FormRecord, SubmissionId, SubmissionRecord, SubmissionValue};
pub use media::{MediaId, MediaRecord};
pub use tenants::TenantRecord;
pub use users::UserRecord;
