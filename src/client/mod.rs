//! Typed access to the barangay REST backend.
//!
//! Every page talks to the backend through [`PortalApi`]. The production
//! implementation is [`HttpPortalApi`]; tests use the in-memory fake behind
//! the `test-utils` feature.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::*;
use crate::error::Result;

pub mod envelope;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use http::HttpPortalApi;

/// Opaque session token issued by the backend at login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Which set of password-reset endpoints to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Resident,
    Staff,
}

impl Audience {
    fn suffix(&self) -> &'static str {
        match self {
            Audience::Resident => "",
            Audience::Staff => "-staff",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResetStep {
    Forgot { email: String },
    ResendCode { email: String },
    VerifyCode { email: String, code: String },
    ResetPassword { email: String, code: String, new_password: String },
}

impl ResetStep {
    /// Path under `/auth`, e.g. `/auth/verify-code-staff`.
    pub fn path(&self, audience: Audience) -> String {
        let action = match self {
            ResetStep::Forgot { .. } => "forgot",
            ResetStep::ResendCode { .. } => "resend-code",
            ResetStep::VerifyCode { .. } => "verify-code",
            ResetStep::ResetPassword { .. } => "reset-password",
        };
        format!("/auth/{}{}", action, audience.suffix())
    }

    pub fn body(&self) -> Value {
        match self {
            ResetStep::Forgot { email } | ResetStep::ResendCode { email } => json!({ "email": email }),
            ResetStep::VerifyCode { email, code } => json!({ "email": email, "code": code }),
            ResetStep::ResetPassword { email, code, new_password } => json!({
                "email": email,
                "code": code,
                "newPassword": new_password,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    Staff,
    Resident,
}

impl StatsScope {
    pub fn path(&self) -> &'static str {
        match self {
            StatsScope::Staff => "/stats/dashboard",
            StatsScope::Resident => "/stats/dashboard/resident",
        }
    }
}

#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken>;
    async fn logout(&self, token: &SessionToken) -> Result<()>;
    /// `Ok(None)` when the backend does not recognise the session.
    async fn current_identity(&self, token: &SessionToken) -> Result<Option<Identity>>;
    async fn password_reset(&self, audience: Audience, step: &ResetStep) -> Result<()>;

    async fn list_submissions(&self, token: &SessionToken, filter: &SubmissionFilter) -> Result<Vec<Submission>>;
    async fn create_submission(
        &self,
        token: &SessionToken,
        submission: &NewSubmission,
        evidence: Option<&Attachment>,
    ) -> Result<SubmissionReceipt>;
    async fn find_document(&self, token: &SessionToken, code: &str) -> Result<DocumentRecord>;
    async fn update_submission_status(&self, token: &SessionToken, id: &str, status: SubmissionStatus) -> Result<()>;
    async fn complete_submission(&self, token: &SessionToken, id: &str) -> Result<()>;
    async fn submission_qr(&self, token: &SessionToken, id: &str) -> Result<SubmissionQr>;

    async fn list_announcements(&self, token: &SessionToken) -> Result<Vec<Announcement>>;
    async fn list_drafts(&self, token: &SessionToken) -> Result<Vec<Announcement>>;
    async fn list_published(&self, token: Option<&SessionToken>) -> Result<Vec<Announcement>>;
    async fn get_announcement(&self, token: &SessionToken, id: &str) -> Result<Announcement>;
    /// Returns the id of the new record.
    async fn create_announcement(&self, token: &SessionToken, payload: &AnnouncementPayload) -> Result<String>;
    async fn update_announcement(&self, token: &SessionToken, id: &str, payload: &AnnouncementPayload) -> Result<()>;
    /// Returns the URL of the stored image.
    async fn upload_announcement_image(&self, token: &SessionToken, image: &Attachment) -> Result<String>;

    async fn lookup_residents(&self, token: &SessionToken, query: &str) -> Result<Vec<ResidentSummary>>;
    async fn my_profile(&self, token: &SessionToken) -> Result<Profile>;
    async fn update_profile(&self, token: &SessionToken, update: &ProfileUpdate) -> Result<()>;
    async fn dashboard_stats(&self, token: &SessionToken, scope: StatsScope) -> Result<DashboardStats>;
}
