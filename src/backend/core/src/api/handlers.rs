//! API request handlers with proper error propagation.
//!
//! All handlers return `Result<impl IntoResponse, AtriumError>` so that
//! errors are automatically converted to appropriate HTTP status codes via
//! the `IntoResponse` implementation on `AtriumError`.
//!
//! The pattern is the same everywhere: build the actor from the request
//! context, evaluate the access rules, reject denials, and hand the
//! resulting constraint to the database layer. Ownership-dependent mutations
//! (Form Update/Delete, a user editing their own account) load the persisted
//! record first and pass its candidate view into the decision.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::access::{
    decide, stamp_tenant, AccessContext, Actor, Candidate, Decision, FormId, Operation,
    ResourceKind, Role, TenantId, TenantRef, UserId,
};
use crate::collections::{
    FormField, FormRecord, MediaId, MediaRecord, SubmissionId, SubmissionRecord, SubmissionValue,
    TenantRecord, UserRecord,
};
use crate::error::AtriumError;
use crate::middleware::auth::{AuthContext, Claims};

/// Evaluate the access rules, turning a denial into an error response.
fn authorize(
    actor: Option<&Actor>,
    resource: ResourceKind,
    operation: Operation,
    candidate: Option<&Candidate>,
) -> Result<Decision, AtriumError> {
    match decide(actor, resource, operation, candidate) {
        Decision::Deny(reason) => Err(AtriumError::denied(reason)),
        decision => Ok(decision),
    }
}

fn hash_password(password: &str) -> Result<String, AtriumError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AtriumError::internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserRecord,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(AtriumError::invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AtriumError::invalid_credentials());
    }

    let claims = Claims::new(
        user.id.as_str(),
        user.role.as_str(),
        user.tenant.as_ref().map(|t| t.id().as_str().to_string()),
        state.auth.token_ttl,
    )
    .with_email(user.email.as_str());

    let token = state
        .auth
        .issue_token(&claims)
        .map_err(|e| AtriumError::internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(ApiResponse::success(LoginResponse { token, user })))
}

/// The authenticated account's own record, read back through the same rules
/// as any other user read.
pub async fn me(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::User, Operation::Read, None)?;

    let user = state
        .db
        .get_user(&ctx.user_id, decision.constraint())
        .await?
        .ok_or_else(|| AtriumError::not_found("User", &ctx.user_id))?;

    Ok(Json(ApiResponse::success(user)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    pub tenant: Option<TenantRef>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::User, Operation::Read, None)?;

    let users = state.db.list_users(decision.constraint()).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    State(state): State<AppState>,
    access: AccessContext,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let creator = access
        .actor
        .as_ref()
        .ok_or_else(|| AtriumError::unauthenticated("Creating users requires authentication"))?;

    if req.email.trim().is_empty() {
        return Err(AtriumError::validation("Email cannot be empty"));
    }
    if req.password.len() < 8 {
        return Err(AtriumError::validation(
            "Password must be at least 8 characters",
        ));
    }

    let role = Role::parse(&req.role)
        .ok_or_else(|| AtriumError::validation(format!("Unknown role: {}", req.role)))?;

    // Only a super-admin may mint another super-admin.
    if role == Role::SuperAdmin && Role::parse(&creator.role) != Some(Role::SuperAdmin) {
        return Err(AtriumError::forbidden(
            "Only a super-admin can create super-admin accounts",
        ));
    }

    let mut tenant = req.tenant;
    stamp_tenant(creator, &mut tenant);

    // Every non-super-admin account must end up with a tenant.
    if role != Role::SuperAdmin && tenant.is_none() {
        return Err(AtriumError::validation(
            "A tenant is required for this role",
        ));
    }

    let now = Utc::now();
    let user = UserRecord {
        id: UserId::from_uuid(),
        email: req.email,
        role,
        tenant,
        password_hash: hash_password(&req.password)?,
        created_at: now,
        updated_at: now,
    };

    state.db.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "User created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::User, Operation::Read, None)?;

    let user = state
        .db
        .get_user(&id, decision.constraint())
        .await?
        .ok_or_else(|| AtriumError::not_found("User", &id))?;

    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();

    // The ownership check runs against the persisted record.
    let mut user = state
        .db
        .get_user(&id, None)
        .await?
        .ok_or_else(|| AtriumError::not_found("User", &id))?;

    let candidate = user.candidate();
    let decision = authorize(
        Some(&actor),
        ResourceKind::User,
        Operation::Update,
        Some(&candidate),
    )?;

    // A filter decision still has to admit this particular row.
    if let Some(constraint) = decision.constraint() {
        state
            .db
            .get_user(&id, Some(constraint))
            .await?
            .ok_or_else(|| AtriumError::not_found("User", &id))?;
    }

    if let Some(email) = req.email {
        if email.trim().is_empty() {
            return Err(AtriumError::validation("Email cannot be empty"));
        }
        user.email = email;
    }
    if let Some(password) = req.password {
        if password.len() < 8 {
            return Err(AtriumError::validation(
                "Password must be at least 8 characters",
            ));
        }
        user.password_hash = hash_password(&password)?;
    }
    user.updated_at = Utc::now();

    state.db.update_user(&user).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::User, Operation::Delete, None)?;

    let removed = state.db.delete_user(&id, decision.constraint()).await?;
    if removed == 0 {
        return Err(AtriumError::not_found("User", &id));
    }

    tracing::info!(user_id = %id, deleted_by = %actor.id, "User deleted");
    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Media
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateMediaRequest {
    pub alt: String,
    pub filename: String,
    pub mime_type: String,
    pub filesize: i64,
    pub tenant: Option<TenantRef>,
}

#[derive(Deserialize)]
pub struct UpdateMediaRequest {
    pub alt: String,
}

pub async fn list_media(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Media, Operation::Read, None)?;

    let media = state.db.list_media(decision.constraint()).await?;
    Ok(Json(ApiResponse::success(media)))
}

pub async fn create_media(
    State(state): State<AppState>,
    access: AccessContext,
    Json(req): Json<CreateMediaRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let creator = access
        .actor
        .as_ref()
        .ok_or_else(|| AtriumError::unauthenticated("Uploading media requires authentication"))?;

    if req.alt.trim().is_empty() {
        return Err(AtriumError::validation("Alt text cannot be empty"));
    }
    if req.filename.trim().is_empty() {
        return Err(AtriumError::validation("Filename cannot be empty"));
    }

    let mut tenant = req.tenant;
    stamp_tenant(creator, &mut tenant);
    let tenant = tenant.ok_or_else(|| AtriumError::validation("A tenant is required for media"))?;

    let media = MediaRecord {
        id: MediaId::from_uuid(),
        tenant,
        alt: req.alt,
        filename: req.filename,
        mime_type: req.mime_type,
        filesize: req.filesize,
        created_at: Utc::now(),
    };

    state.db.insert_media(&media).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(media))))
}

pub async fn get_media(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Media, Operation::Read, None)?;

    let media = state
        .db
        .get_media(&id, decision.constraint())
        .await?
        .ok_or_else(|| AtriumError::not_found("Media", &id))?;

    Ok(Json(ApiResponse::success(media)))
}

pub async fn update_media(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateMediaRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Media, Operation::Update, None)?;

    if req.alt.trim().is_empty() {
        return Err(AtriumError::validation("Alt text cannot be empty"));
    }

    // The scoped UPDATE leaves foreign-tenant rows untouched, so a
    // cross-tenant id behaves exactly like a missing record.
    let touched = state
        .db
        .update_media_alt(&id, &req.alt, decision.constraint())
        .await?;
    if touched == 0 {
        return Err(AtriumError::not_found("Media", &id));
    }

    let media = state
        .db
        .get_media(&id, decision.constraint())
        .await?
        .ok_or_else(|| AtriumError::not_found("Media", &id))?;

    Ok(Json(ApiResponse::success(media)))
}

pub async fn delete_media(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Media, Operation::Delete, None)?;

    let removed = state.db.delete_media(&id, decision.constraint()).await?;
    if removed == 0 {
        return Err(AtriumError::not_found("Media", &id));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tenants
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub slug: Option<String>,
}

pub async fn list_tenants(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Tenant, Operation::Read, None)?;

    let tenants = state.db.list_tenants(decision.constraint()).await?;
    Ok(Json(ApiResponse::success(tenants)))
}

pub async fn create_tenant(
    State(state): State<AppState>,
    _access: AccessContext,
    Json(req): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    if req.name.trim().is_empty() {
        return Err(AtriumError::validation("Tenant name cannot be empty"));
    }

    let slug = req.slug.unwrap_or_else(|| slugify(&req.name));

    let tenant = TenantRecord {
        id: TenantId::from_uuid(),
        name: req.name,
        slug,
        created_at: Utc::now(),
    };

    state.db.insert_tenant(&tenant).await?;
    tracing::info!(tenant_id = %tenant.id, "Tenant created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(tenant))))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Tenant, Operation::Read, None)?;

    let tenant = state
        .db
        .get_tenant(&id, decision.constraint())
        .await?
        .ok_or_else(|| AtriumError::not_found("Tenant", &id))?;

    Ok(Json(ApiResponse::success(tenant)))
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// ═══════════════════════════════════════════════════════════════════════════════
// Forms
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub struct CreateFormRequest {
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(rename = "confirmationMessage")]
    pub confirmation_message: Option<String>,
    pub tenant: Option<TenantRef>,
}

#[derive(Deserialize)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub fields: Option<Vec<FormField>>,
    #[serde(rename = "confirmationMessage")]
    pub confirmation_message: Option<String>,
}

/// Public view of a form: what an anonymous renderer needs, nothing more.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFormView {
    pub id: FormId,
    pub title: String,
    pub fields: Vec<FormField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_message: Option<String>,
}

impl From<FormRecord> for PublicFormView {
    fn from(form: FormRecord) -> Self {
        Self {
            id: form.id,
            title: form.title,
            fields: form.fields,
            confirmation_message: form.confirmation_message,
        }
    }
}

pub async fn list_forms(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(Some(&actor), ResourceKind::Form, Operation::Read, None)?;

    let forms = state.db.list_forms(decision.constraint()).await?;
    Ok(Json(ApiResponse::success(forms)))
}

pub async fn create_form(
    State(state): State<AppState>,
    access: AccessContext,
    Json(req): Json<CreateFormRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let creator = access
        .actor
        .as_ref()
        .ok_or_else(|| AtriumError::unauthenticated("Creating forms requires authentication"))?;

    if req.title.trim().is_empty() {
        return Err(AtriumError::validation("Form title cannot be empty"));
    }

    let mut tenant = req.tenant;
    stamp_tenant(creator, &mut tenant);
    let tenant = tenant.ok_or_else(|| AtriumError::validation("A tenant is required for forms"))?;

    let now = Utc::now();
    let form = FormRecord {
        id: FormId::from_uuid(),
        tenant,
        title: req.title,
        fields: req.fields,
        confirmation_message: req.confirmation_message,
        created_at: now,
        updated_at: now,
    };

    state.db.insert_form(&form).await?;
    tracing::info!(form_id = %form.id, "Form created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(form))))
}

/// Fetch a form definition by identifier.
///
/// This is the public delivery contract consumed by the form renderer; it is
/// reachable without an actor and returns the public view only. Management
/// reads go through the scoped `/api/forms` listing.
pub async fn public_get_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let form = state
        .db
        .get_form(&id)
        .await?
        .ok_or_else(|| AtriumError::not_found("Form", &id))?;

    Ok(Json(PublicFormView::from(form)))
}

pub async fn update_form(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(req): Json<UpdateFormRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();

    // Ownership is decided on the persisted record's tenant, never on
    // anything the client sent.
    let mut form = state
        .db
        .get_form(&id)
        .await?
        .ok_or_else(|| AtriumError::not_found("Form", &id))?;

    let candidate = form.candidate();
    authorize(
        Some(&actor),
        ResourceKind::Form,
        Operation::Update,
        Some(&candidate),
    )?;

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(AtriumError::validation("Form title cannot be empty"));
        }
        form.title = title;
    }
    if let Some(fields) = req.fields {
        form.fields = fields;
    }
    if let Some(message) = req.confirmation_message {
        form.confirmation_message = Some(message);
    }
    form.updated_at = Utc::now();

    state.db.update_form(&form).await?;
    Ok(Json(ApiResponse::success(form)))
}

pub async fn delete_form(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();

    let form = state
        .db
        .get_form(&id)
        .await?
        .ok_or_else(|| AtriumError::not_found("Form", &id))?;

    let candidate = form.candidate();
    authorize(
        Some(&actor),
        ResourceKind::Form,
        Operation::Delete,
        Some(&candidate),
    )?;

    state.db.delete_form(&id).await?;
    tracing::info!(form_id = %id, deleted_by = %actor.id, "Form deleted");

    Ok(Json(ApiResponse::success(serde_json::json!({ "id": id }))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Form Submissions
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormRequest {
    pub form: String,
    pub submission_data: Vec<SubmissionValue>,
}

/// Submit a form response.
///
/// Reachable with or without an actor: (no actor, FormSubmission, Create) is
/// the access rules' single anonymous allow.
pub async fn create_form_submission(
    State(state): State<AppState>,
    ctx: Option<AuthContext>,
    Json(req): Json<SubmitFormRequest>,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.as_ref().map(AuthContext::to_actor);
    authorize(
        actor.as_ref(),
        ResourceKind::FormSubmission,
        Operation::Create,
        None,
    )?;

    // A submission must land on an existing form.
    let form = state
        .db
        .get_form(&req.form)
        .await?
        .ok_or_else(|| AtriumError::validation("Unknown form"))?;

    let submission = SubmissionRecord {
        id: SubmissionId::from_uuid(),
        form: form.id.clone(),
        submission_data: req.submission_data,
        created_at: Utc::now(),
    };

    state.db.insert_submission(&submission).await?;
    tracing::info!(form_id = %form.id, submission_id = %submission.id, "Form submission received");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(submission))))
}

pub async fn list_form_submissions(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<impl IntoResponse, AtriumError> {
    let actor = ctx.to_actor();
    let decision = authorize(
        Some(&actor),
        ResourceKind::FormSubmission,
        Operation::Read,
        None,
    )?;

    let submissions = state.db.list_submissions(decision.constraint()).await?;
    Ok(Json(ApiResponse::success(submissions)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_authorize_maps_denials_to_errors() {
        let result = authorize(None, ResourceKind::Media, Operation::Read, None);
        assert_eq!(
            result.unwrap_err().code(),
            crate::error::ErrorCode::Unauthenticated
        );

        let anonymous_submit = authorize(None, ResourceKind::FormSubmission, Operation::Create, None);
        assert!(anonymous_submit.unwrap().is_allowed());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("  Spaced  Out  "), "spaced-out");
        assert_eq!(slugify("Already-Slugged"), "already-slugged");
    }

    #[test]
    fn test_public_form_view_hides_tenant() {
        let form = FormRecord {
            id: FormId::new("f1"),
            tenant: TenantRef::Id(TenantId::new("t1")),
            title: "Contact".to_string(),
            fields: vec![],
            confirmation_message: Some("Thanks!".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = PublicFormView::from(form);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("tenant"));
        assert!(json.contains("confirmationMessage"));
    }
}
