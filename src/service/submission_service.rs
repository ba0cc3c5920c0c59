use std::sync::Arc;

use validator::Validate;

use crate::{
    client::{PortalApi, SessionToken},
    domain::*,
    error::{AppError, Result},
    qr::{encode_svg, payload::QrPayload},
    web::uploads::{to_attachment, EVIDENCE_EXTENSIONS},
};

/// How a pickup QR reaches the page.
#[derive(Debug, Clone, PartialEq)]
pub enum QrView {
    /// URL or data URL the backend rendered.
    Image(String),
    /// Inline SVG rendered here.
    Svg(String),
}

impl QrView {
    pub fn from_payload(payload: &str) -> Result<Self> {
        encode_svg(payload, 220).map(QrView::Svg)
    }
}

/// Filing and tracking of complaints and document requests.
pub struct SubmissionDesk {
    api: Arc<dyn PortalApi>,
    token: SessionToken,
    max_upload_bytes: usize,
}

impl SubmissionDesk {
    pub fn new(api: Arc<dyn PortalApi>, token: SessionToken, max_upload_bytes: usize) -> Self {
        Self { api, token, max_upload_bytes }
    }

    /// File a complaint. Without evidence the body goes out as JSON;
    /// anonymous complaints carry no contact details.
    pub async fn file_complaint(
        &self,
        form: &ComplaintForm,
        filer: &Identity,
        evidence: Option<(String, Vec<u8>)>,
    ) -> Result<SubmissionReceipt> {
        form.validate()?;

        let evidence = evidence
            .map(|(name, data)| to_attachment(&name, data, EVIDENCE_EXTENSIONS, self.max_upload_bytes))
            .transpose()?;

        let anonymous = form.is_anonymous();
        let (contact_name, contact_email) = if anonymous {
            (None, None)
        } else {
            (Some(filer.display_name.clone()), filer.email.clone())
        };

        let submission = NewSubmission {
            kind: SubmissionKind::Complaint,
            category: form.category.trim().to_string(),
            subject: form.subject.trim().to_string(),
            description: form.description.trim().to_string(),
            priority: normalize_priority(&form.priority),
            location: Some(form.location.trim().to_string()).filter(|l| !l.is_empty()),
            anonymous,
            contact_name,
            contact_email,
            contact_phone: None,
            document_type: None,
            quantity: None,
            fee: None,
        };

        let receipt = self
            .api
            .create_submission(&self.token, &submission, evidence.as_ref())
            .await?;
        tracing::info!("Complaint filed as {}", receipt.reference);
        Ok(receipt)
    }

    /// Request a document from the catalog. The fee is the catalog fee
    /// times the quantity.
    pub async fn request_document(&self, form: &DocumentRequestForm, filer: &Identity) -> Result<SubmissionReceipt> {
        form.validate()?;
        let document = find_document_type(&form.document_type)
            .ok_or_else(|| AppError::Validation(format!("Unknown document type: {}", form.document_type)))?;

        let submission = NewSubmission {
            kind: SubmissionKind::DocumentRequest,
            category: document.name.to_string(),
            subject: format!("{} request", document.name),
            description: form.purpose.trim().to_string(),
            priority: "normal".to_string(),
            location: None,
            anonymous: false,
            contact_name: Some(filer.display_name.clone()),
            contact_email: filer.email.clone(),
            contact_phone: None,
            document_type: Some(document.name.to_string()),
            quantity: Some(form.quantity),
            fee: Some(document.fee * f64::from(form.quantity)),
        };

        let receipt = self.api.create_submission(&self.token, &submission, None).await?;
        tracing::info!("Document request filed as {}", receipt.reference);
        Ok(receipt)
    }

    pub async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        self.api.list_submissions(&self.token, filter).await
    }

    pub async fn set_status(&self, id: &str, status: SubmissionStatus) -> Result<()> {
        self.api.update_submission_status(&self.token, id, status).await?;
        tracing::info!("Submission {} moved to {}", id, status);
        Ok(())
    }

    pub async fn pickup_qr(&self, id: &str) -> Result<QrView> {
        match self.api.submission_qr(&self.token, id).await? {
            SubmissionQr::Image(src) => Ok(QrView::Image(src)),
            SubmissionQr::Payload(payload) => QrView::from_payload(&payload),
        }
    }
}

/// QR for a profile page: residents carry `residentId`, staff `employeeId`.
pub fn identity_qr(identity: &Identity) -> Option<Result<QrView>> {
    let id = identity.lookup_id.clone()?;
    let payload = match identity.role {
        Role::Resident => QrPayload::Resident(id),
        Role::Staff => QrPayload::Employee(id),
    };
    Some(QrView::from_payload(&payload.encode()))
}

fn normalize_priority(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    if ["low", "normal", "high", "urgent"].contains(&lowered.as_str()) {
        lowered
    } else {
        "normal".to_string()
    }
}
