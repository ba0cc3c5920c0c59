use std::time::Duration;

use async_trait::async_trait;
use cookie::Cookie;
use reqwest::{
    header::{COOKIE, SET_COOKIE},
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use serde_json::Value;

use super::envelope::{extract_list, extract_object, unwrap_envelope};
use super::{Audience, Credentials, PortalApi, ResetStep, SessionToken, StatsScope};
use crate::{
    config::BackendConfig,
    domain::*,
    error::{AppError, Result},
};

const ANNOUNCEMENT_LIST_KEYS: &[&str] = &["announcements", "drafts", "data", "items"];
const SUBMISSION_LIST_KEYS: &[&str] = &["submissions", "data", "items"];

/// [`PortalApi`] over HTTP with reqwest. The session token travels both as
/// the backend's session cookie and as a bearer token.
pub struct HttpPortalApi {
    client: Client,
    base_url: String,
    session_cookie: String,
}

impl HttpPortalApi {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, token: &SessionToken) -> RequestBuilder {
        builder
            .header(COOKIE, format!("{}={}", self.session_cookie, token.as_str()))
            .bearer_auth(token.as_str())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        unwrap_envelope(status, &body)
    }

    async fn get(&self, token: &SessionToken, path: &str) -> Result<Value> {
        tracing::debug!("GET {}", path);
        self.send(self.authed(self.client.get(self.url(path)), token)).await
    }

    async fn post_json(&self, token: &SessionToken, path: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", path);
        self.send(self.authed(self.client.post(self.url(path)), token).json(body)).await
    }

    fn file_part(file: &Attachment) -> Result<Part> {
        Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| AppError::BadRequest(format!("Invalid file type: {}", e)))
    }

    fn announcements_from(value: &Value) -> Vec<Announcement> {
        extract_list(value, ANNOUNCEMENT_LIST_KEYS)
            .iter()
            .filter_map(Announcement::from_value)
            .collect()
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn login(&self, credentials: &Credentials) -> Result<SessionToken> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await?;

        let cookie_token = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|raw| raw.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
            .find(|c| c.name() == self.session_cookie && !c.value().is_empty())
            .map(|c| c.value().to_string());

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        let value = unwrap_envelope(status, &body)?;

        first_str(&value, &["token", "accessToken", "sessionToken"])
            .or(cookie_token)
            .map(SessionToken::new)
            .ok_or_else(|| AppError::Backend {
                status,
                message: "Login succeeded but no session was issued".to_string(),
            })
    }

    async fn logout(&self, token: &SessionToken) -> Result<()> {
        self.post_json(token, "/auth/logout", &serde_json::json!({})).await?;
        Ok(())
    }

    async fn current_identity(&self, token: &SessionToken) -> Result<Option<Identity>> {
        match self.get(token, "/auth/me").await {
            Ok(value) => Ok(Identity::from_value(&value)),
            Err(AppError::Backend { status: 401 | 403, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn password_reset(&self, audience: Audience, step: &ResetStep) -> Result<()> {
        let path = step.path(audience);
        tracing::debug!("POST {}", path);
        self.send(self.client.post(self.url(&path)).json(&step.body())).await?;
        Ok(())
    }

    async fn list_submissions(&self, token: &SessionToken, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        let builder = self
            .authed(self.client.get(self.url("/submissions")), token)
            .query(&filter.to_query());
        let value = self.send(builder).await?;

        Ok(extract_list(&value, SUBMISSION_LIST_KEYS)
            .iter()
            .filter_map(Submission::from_value)
            .collect())
    }

    async fn create_submission(
        &self,
        token: &SessionToken,
        submission: &NewSubmission,
        evidence: Option<&Attachment>,
    ) -> Result<SubmissionReceipt> {
        let body = serde_json::to_value(submission)?;
        let value = match evidence {
            None => self.post_json(token, "/submissions", &body).await?,
            Some(file) => {
                let mut form = Form::new();
                if let Value::Object(fields) = &body {
                    for (name, field) in fields {
                        if let Some(text) = text_value(field) {
                            form = form.text(name.clone(), text);
                        }
                    }
                }
                form = form.part("evidence", Self::file_part(file)?);
                tracing::debug!("POST /submissions (multipart)");
                self.send(self.authed(self.client.post(self.url("/submissions")), token).multipart(form))
                    .await?
            }
        };

        SubmissionReceipt::from_value(&value).ok_or_else(|| AppError::Backend {
            status: 200,
            message: "Submission was accepted but no reference number was returned".to_string(),
        })
    }

    async fn find_document(&self, token: &SessionToken, code: &str) -> Result<DocumentRecord> {
        let path = format!("/submissions/document/{}", urlencoding::encode(code));
        let value = self.get(token, &path).await?;
        DocumentRecord::from_value(&value)
            .ok_or_else(|| AppError::NotFound(format!("No document matches code {}", code)))
    }

    async fn update_submission_status(&self, token: &SessionToken, id: &str, status: SubmissionStatus) -> Result<()> {
        let path = format!("/submissions/{}/status", urlencoding::encode(id));
        self.post_json(token, &path, &serde_json::json!({ "status": status.as_str() })).await?;
        Ok(())
    }

    async fn complete_submission(&self, token: &SessionToken, id: &str) -> Result<()> {
        let path = format!("/submissions/{}/complete", urlencoding::encode(id));
        self.post_json(token, &path, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn submission_qr(&self, token: &SessionToken, id: &str) -> Result<SubmissionQr> {
        let path = format!("/submissions/{}/qr", urlencoding::encode(id));
        let value = self.get(token, &path).await?;
        SubmissionQr::from_value(&value)
            .ok_or_else(|| AppError::NotFound("No QR code is available for this submission".to_string()))
    }

    async fn list_announcements(&self, token: &SessionToken) -> Result<Vec<Announcement>> {
        let value = self.get(token, "/announcements").await?;
        Ok(Self::announcements_from(&value))
    }

    async fn list_drafts(&self, token: &SessionToken) -> Result<Vec<Announcement>> {
        let value = self.get(token, "/announcements/drafts").await?;
        Ok(Self::announcements_from(&value))
    }

    async fn list_published(&self, token: Option<&SessionToken>) -> Result<Vec<Announcement>> {
        let builder = self.client.get(self.url("/announcements/published"));
        let builder = match token {
            Some(token) => self.authed(builder, token),
            None => builder,
        };
        let value = self.send(builder).await?;
        Ok(Self::announcements_from(&value))
    }

    async fn get_announcement(&self, token: &SessionToken, id: &str) -> Result<Announcement> {
        let path = format!("/announcements/{}", urlencoding::encode(id));
        let value = self.get(token, &path).await?;
        Announcement::from_value(extract_object(&value, &["announcement", "data"]))
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))
    }

    async fn create_announcement(&self, token: &SessionToken, payload: &AnnouncementPayload) -> Result<String> {
        let value = self.post_json(token, "/announcements", &serde_json::to_value(payload)?).await?;
        let record = extract_object(&value, &["announcement", "data"]);
        first_str(record, &["id", "_id", "announcementId"])
            .or_else(|| first_str(&value, &["id", "_id", "announcementId"]))
            .ok_or_else(|| AppError::Backend {
                status: 200,
                message: "Announcement was saved but no id was returned".to_string(),
            })
    }

    async fn update_announcement(&self, token: &SessionToken, id: &str, payload: &AnnouncementPayload) -> Result<()> {
        let path = format!("/announcements/{}", urlencoding::encode(id));
        tracing::debug!("PATCH {}", path);
        let builder = self
            .authed(self.client.patch(self.url(&path)), token)
            .json(payload);
        self.send(builder).await?;
        Ok(())
    }

    async fn upload_announcement_image(&self, token: &SessionToken, image: &Attachment) -> Result<String> {
        let form = Form::new().part("image", Self::file_part(image)?);
        tracing::debug!("POST /announcements/upload");
        let value = self
            .send(self.authed(self.client.post(self.url("/announcements/upload")), token).multipart(form))
            .await?;
        first_str(&value, &["url", "imageUrl", "path", "location"]).ok_or_else(|| AppError::Backend {
            status: 200,
            message: "Upload finished but no image URL was returned".to_string(),
        })
    }

    async fn lookup_residents(&self, token: &SessionToken, query: &str) -> Result<Vec<ResidentSummary>> {
        let builder = self
            .authed(self.client.get(self.url("/residents/lookup")), token)
            .query(&[("q", query)]);
        let value = self.send(builder).await?;
        Ok(extract_list(&value, &["residents", "results", "data"])
            .iter()
            .filter_map(ResidentSummary::from_value)
            .collect())
    }

    async fn my_profile(&self, token: &SessionToken) -> Result<Profile> {
        let value = self.get(token, "/users/me").await?;
        Ok(Profile::from_value(&value))
    }

    async fn update_profile(&self, token: &SessionToken, update: &ProfileUpdate) -> Result<()> {
        tracing::debug!("PATCH /users/me");
        let builder = self
            .authed(self.client.patch(self.url("/users/me")), token)
            .json(update);
        self.send(builder).await?;
        Ok(())
    }

    async fn dashboard_stats(&self, token: &SessionToken, scope: StatsScope) -> Result<DashboardStats> {
        let value = self.get(token, scope.path()).await?;
        Ok(DashboardStats::from_value(&value))
    }
}
