//! In-memory [`PortalApi`] for tests. Records every call so tests can
//! assert what reached the "backend" and what did not.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Audience, Credentials, PortalApi, ResetStep, SessionToken, StatsScope};
use crate::{
    domain::*,
    error::{AppError, Result},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Login(String),
    Logout,
    CurrentIdentity,
    PasswordReset(String),
    ListSubmissions,
    CreateSubmission { submission: NewSubmission, with_evidence: bool },
    FindDocument(String),
    UpdateStatus(String, SubmissionStatus),
    CompleteSubmission(String),
    SubmissionQr(String),
    ListAnnouncements,
    ListDrafts,
    ListPublished,
    GetAnnouncement(String),
    CreateAnnouncement(AnnouncementPayload),
    UpdateAnnouncement(String, AnnouncementPayload),
    UploadImage(String),
    LookupResidents(String),
    MyProfile,
    UpdateProfile,
    DashboardStats(StatsScope),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<ApiCall>,
    identities: HashMap<String, Identity>,
    passwords: HashMap<String, (String, String)>,
    documents: HashMap<String, DocumentRecord>,
    submissions: Vec<Submission>,
    announcements: Vec<Announcement>,
    profile: Profile,
    next_id: u32,
    fail_with: Option<(u16, String)>,
    failing_calls: Vec<(ApiCall, u16, String)>,
}

#[derive(Default)]
pub struct FakePortalApi {
    state: Mutex<FakeState>,
    document_delay: Mutex<Option<Duration>>,
}

impl FakePortalApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend state poisoned")
    }

    /// Accept `token` as a live session for `identity`.
    pub fn with_session(self, token: &str, identity: Identity) -> Self {
        self.lock().identities.insert(token.to_string(), identity);
        self
    }

    /// Let `email`/`password` log in, issuing `token`.
    pub fn with_account(self, email: &str, password: &str, token: &str) -> Self {
        self.lock()
            .passwords
            .insert(email.to_string(), (password.to_string(), token.to_string()));
        self
    }

    pub fn with_document(self, code: &str, record: DocumentRecord) -> Self {
        {
            let mut state = self.lock();
            state.submissions.push(record.submission.clone());
            state.documents.insert(code.to_string(), record);
        }
        self
    }

    pub fn with_submission(self, submission: Submission) -> Self {
        self.lock().submissions.push(submission);
        self
    }

    pub fn with_announcement(self, announcement: Announcement) -> Self {
        self.lock().announcements.push(announcement);
        self
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.lock().profile = profile;
        self
    }

    /// Later calls equal to `call` fail; everything else keeps working.
    pub fn fail_call(&self, call: ApiCall, status: u16, message: &str) {
        self.lock().failing_calls.push((call, status, message.to_string()));
    }

    /// Every later call fails with this backend status and message.
    pub fn fail_with(&self, status: u16, message: &str) {
        self.lock().fail_with = Some((status, message.to_string()));
    }

    /// Delay `find_document` responses.
    pub fn delay_documents(&self, delay: Duration) {
        *self.document_delay.lock().expect("fake delay poisoned") = Some(delay);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.lock().announcements.clone()
    }

    pub fn document(&self, code: &str) -> Option<DocumentRecord> {
        self.lock().documents.get(code).cloned()
    }

    fn record(&self, call: ApiCall) -> Result<()> {
        let mut state = self.lock();
        let failure = state.fail_with.clone().or_else(|| {
            state
                .failing_calls
                .iter()
                .find(|(failing, _, _)| *failing == call)
                .map(|(_, status, message)| (*status, message.clone()))
        });
        state.calls.push(call);
        match failure {
            Some((status, message)) => Err(AppError::Backend { status, message }),
            None => Ok(()),
        }
    }

    fn session(&self, token: &SessionToken) -> Result<Identity> {
        self.lock()
            .identities
            .get(token.as_str())
            .cloned()
            .ok_or(AppError::Backend { status: 401, message: "Not signed in".to_string() })
    }

    fn apply_payload(announcement: &mut Announcement, payload: &AnnouncementPayload) {
        announcement.title = payload.title.clone();
        announcement.content = payload.content.clone();
        announcement.category = payload.category.clone();
        announcement.priority = payload.priority.clone();
        announcement.target_hall = payload.target_hall.clone();
        announcement.event_date = payload.event_date.clone();
        announcement.event_time = payload.event_time.clone();
        announcement.expected_attendees = payload.expected_attendees;
        announcement.tags = payload.tags.clone();
        announcement.image_url = payload.image_url.clone();
        announcement.published = payload.published;
        announcement.published_schedule = payload.published_schedule;
    }
}

#[async_trait]
impl PortalApi for FakePortalApi {
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken> {
        self.record(ApiCall::Login(credentials.email.clone()))?;
        match self.lock().passwords.get(&credentials.email) {
            Some((password, token)) if *password == credentials.password => Ok(SessionToken::new(token.clone())),
            _ => Err(AppError::Backend { status: 401, message: "Invalid email or password".to_string() }),
        }
    }

    async fn logout(&self, token: &SessionToken) -> Result<()> {
        self.record(ApiCall::Logout)?;
        self.lock().identities.remove(token.as_str());
        Ok(())
    }

    async fn current_identity(&self, token: &SessionToken) -> Result<Option<Identity>> {
        self.record(ApiCall::CurrentIdentity)?;
        Ok(self.lock().identities.get(token.as_str()).cloned())
    }

    async fn password_reset(&self, audience: Audience, step: &ResetStep) -> Result<()> {
        self.record(ApiCall::PasswordReset(step.path(audience)))
    }

    async fn list_submissions(&self, token: &SessionToken, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        self.record(ApiCall::ListSubmissions)?;
        self.session(token)?;
        Ok(self
            .lock()
            .submissions
            .iter()
            .filter(|s| filter.kind.map_or(true, |k| s.kind == k))
            .filter(|s| filter.status.map_or(true, |st| s.status == st))
            .cloned()
            .collect())
    }

    async fn create_submission(
        &self,
        token: &SessionToken,
        submission: &NewSubmission,
        evidence: Option<&Attachment>,
    ) -> Result<SubmissionReceipt> {
        self.record(ApiCall::CreateSubmission {
            submission: submission.clone(),
            with_evidence: evidence.is_some(),
        })?;
        self.session(token)?;
        let mut state = self.lock();
        state.next_id += 1;
        let prefix = match submission.kind {
            SubmissionKind::Complaint => "CMP",
            SubmissionKind::DocumentRequest => "DOC",
            SubmissionKind::Inquiry => "INQ",
        };
        Ok(SubmissionReceipt {
            reference: format!("{}-2024-{:04}", prefix, state.next_id),
            status: SubmissionStatus::Pending,
        })
    }

    async fn find_document(&self, token: &SessionToken, code: &str) -> Result<DocumentRecord> {
        self.record(ApiCall::FindDocument(code.to_string()))?;
        let delay = *self.document_delay.lock().expect("fake delay poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.session(token)?;
        self.lock()
            .documents
            .get(code)
            .cloned()
            .ok_or(AppError::Backend { status: 404, message: "Document not found".to_string() })
    }

    async fn update_submission_status(&self, token: &SessionToken, id: &str, status: SubmissionStatus) -> Result<()> {
        self.record(ApiCall::UpdateStatus(id.to_string(), status))?;
        self.session(token)?;
        let mut state = self.lock();
        for submission in state.submissions.iter_mut().filter(|s| s.id == id) {
            submission.status = status;
        }
        Ok(())
    }

    async fn complete_submission(&self, token: &SessionToken, id: &str) -> Result<()> {
        self.record(ApiCall::CompleteSubmission(id.to_string()))?;
        self.session(token)?;
        let mut state = self.lock();
        for record in state.documents.values_mut().filter(|r| r.submission.id == id) {
            record.submission.status = SubmissionStatus::Completed;
        }
        for submission in state.submissions.iter_mut().filter(|s| s.id == id) {
            submission.status = SubmissionStatus::Completed;
        }
        Ok(())
    }

    async fn submission_qr(&self, token: &SessionToken, id: &str) -> Result<SubmissionQr> {
        self.record(ApiCall::SubmissionQr(id.to_string()))?;
        self.session(token)?;
        let state = self.lock();
        let submission = state
            .submissions
            .iter()
            .find(|s| s.id == id)
            .ok_or(AppError::Backend { status: 404, message: "Submission not found".to_string() })?;
        Ok(SubmissionQr::Payload(
            crate::qr::payload::QrPayload::Document(submission.pickup_code().to_string()).encode(),
        ))
    }

    async fn list_announcements(&self, token: &SessionToken) -> Result<Vec<Announcement>> {
        self.record(ApiCall::ListAnnouncements)?;
        self.session(token)?;
        Ok(self.lock().announcements.clone())
    }

    async fn list_drafts(&self, token: &SessionToken) -> Result<Vec<Announcement>> {
        self.record(ApiCall::ListDrafts)?;
        self.session(token)?;
        Ok(self
            .lock()
            .announcements
            .iter()
            .filter(|a| !a.published)
            .cloned()
            .collect())
    }

    async fn list_published(&self, _token: Option<&SessionToken>) -> Result<Vec<Announcement>> {
        self.record(ApiCall::ListPublished)?;
        let now = chrono::Utc::now();
        Ok(self
            .lock()
            .announcements
            .iter()
            .filter(|a| a.state(now) == PublicationState::Published)
            .cloned()
            .collect())
    }

    async fn get_announcement(&self, token: &SessionToken, id: &str) -> Result<Announcement> {
        self.record(ApiCall::GetAnnouncement(id.to_string()))?;
        self.session(token)?;
        self.lock()
            .announcements
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(AppError::Backend { status: 404, message: "Announcement not found".to_string() })
    }

    async fn create_announcement(&self, token: &SessionToken, payload: &AnnouncementPayload) -> Result<String> {
        self.record(ApiCall::CreateAnnouncement(payload.clone()))?;
        self.session(token)?;
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("ann-{}", state.next_id);
        let mut announcement = Announcement {
            id: id.clone(),
            title: String::new(),
            content: String::new(),
            category: String::new(),
            priority: String::new(),
            target_hall: None,
            event_date: None,
            event_time: None,
            expected_attendees: None,
            tags: Vec::new(),
            image_url: None,
            published: false,
            published_schedule: None,
            created_at: Some(chrono::Utc::now()),
        };
        Self::apply_payload(&mut announcement, payload);
        state.announcements.push(announcement);
        Ok(id)
    }

    async fn update_announcement(&self, token: &SessionToken, id: &str, payload: &AnnouncementPayload) -> Result<()> {
        self.record(ApiCall::UpdateAnnouncement(id.to_string(), payload.clone()))?;
        self.session(token)?;
        let mut state = self.lock();
        let announcement = state
            .announcements
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::Backend { status: 404, message: "Announcement not found".to_string() })?;
        Self::apply_payload(announcement, payload);
        Ok(())
    }

    async fn upload_announcement_image(&self, token: &SessionToken, image: &Attachment) -> Result<String> {
        self.record(ApiCall::UploadImage(image.filename.clone()))?;
        self.session(token)?;
        Ok(format!("/uploads/{}", image.filename))
    }

    async fn lookup_residents(&self, token: &SessionToken, query: &str) -> Result<Vec<ResidentSummary>> {
        self.record(ApiCall::LookupResidents(query.to_string()))?;
        self.session(token)?;
        let needle = query.to_lowercase();
        Ok(self
            .lock()
            .documents
            .values()
            .filter(|r| {
                r.resident.name.as_deref().map_or(false, |n| n.to_lowercase().contains(&needle))
                    || r.resident.resident_id.as_deref() == Some(query)
            })
            .map(|r| ResidentSummary {
                id: r.resident.resident_id.clone().unwrap_or_default(),
                resident_id: r.resident.resident_id.clone(),
                name: r.resident.name.clone().unwrap_or_default(),
                email: r.resident.email.clone(),
                phone: r.resident.phone.clone(),
                address: r.resident.address.clone(),
            })
            .collect())
    }

    async fn my_profile(&self, token: &SessionToken) -> Result<Profile> {
        self.record(ApiCall::MyProfile)?;
        self.session(token)?;
        Ok(self.lock().profile.clone())
    }

    async fn update_profile(&self, token: &SessionToken, update: &ProfileUpdate) -> Result<()> {
        self.record(ApiCall::UpdateProfile)?;
        self.session(token)?;
        let mut state = self.lock();
        state.profile.first_name = update.first_name.clone();
        state.profile.middle_name = update.middle_name.clone();
        state.profile.last_name = update.last_name.clone();
        state.profile.email = update.email.clone();
        state.profile.phone = update.phone.clone();
        state.profile.house_number = update.house_number.clone();
        state.profile.street = update.street.clone();
        state.profile.purok = update.purok.clone();
        Ok(())
    }

    async fn dashboard_stats(&self, token: &SessionToken, scope: StatsScope) -> Result<DashboardStats> {
        self.record(ApiCall::DashboardStats(scope))?;
        self.session(token)?;
        let state = self.lock();
        let count = |status: SubmissionStatus| state.submissions.iter().filter(|s| s.status == status).count() as i64;
        Ok(DashboardStats {
            total: state.submissions.len() as i64,
            pending: count(SubmissionStatus::Pending),
            active: count(SubmissionStatus::Active),
            ready: count(SubmissionStatus::Ready),
            resolved: count(SubmissionStatus::Resolved),
            completed: count(SubmissionStatus::Completed),
            cancelled: count(SubmissionStatus::Cancelled),
            residents: 0,
            announcements: state.announcements.len() as i64,
        })
    }
}
