use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{first_bool, first_f64, first_str, first_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Complaint,
    DocumentRequest,
    Inquiry,
}

impl SubmissionKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "complaint" => Some(Self::Complaint),
            "document" | "document_request" | "documentrequest" | "request" => Some(Self::DocumentRequest),
            "inquiry" | "enquiry" => Some(Self::Inquiry),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complaint => "complaint",
            Self::DocumentRequest => "document_request",
            Self::Inquiry => "inquiry",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Complaint => "Complaint",
            Self::DocumentRequest => "Document request",
            Self::Inquiry => "Inquiry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Active,
    Ready,
    Resolved,
    Completed,
    Cancelled,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 6] = [
        Self::Pending,
        Self::Active,
        Self::Ready,
        Self::Resolved,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" | "in_progress" | "processing" => Some(Self::Active),
            "ready" | "ready_for_pickup" => Some(Self::Ready),
            "resolved" => Some(Self::Resolved),
            "completed" | "collected" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Ready => "ready",
            Self::Resolved => "resolved",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Resolved | Self::Cancelled)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidentContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub resident_id: Option<String>,
}

impl ResidentContact {
    pub fn from_value(value: &Value) -> Self {
        Self {
            name: first_str(value, &["name", "fullName", "submitterName", "residentName"]),
            email: first_str(value, &["email", "submitterEmail"]),
            phone: first_str(value, &["phone", "contactNumber", "mobile", "submitterPhone"]),
            address: first_str(value, &["address", "fullAddress"]),
            resident_id: first_str(value, &["residentId", "resident_id"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub kind: SubmissionKind,
    pub category: String,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub status: SubmissionStatus,
    pub anonymous: bool,
    pub contact: ResidentContact,
    pub document_code: Option<String>,
    pub evidence_url: Option<String>,
    pub fee: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Normalizes a backend submission record.
    ///
    /// Key precedence, first present wins:
    /// - id: `id`, `_id`, `submissionId`
    /// - kind: `kind`, `type`, `submissionType` (defaults to complaint)
    /// - category: `category`, `documentType`, `complaintType`
    /// - subject: `subject`, `title`, `documentType`
    /// - description: `description`, `details`, `purpose`
    /// - code: `documentCode`, `code`, `referenceNumber`, `trackingNumber`
    /// - evidence: `evidenceUrl`, `evidence`, `attachment`
    /// - fee: `fee`, `amount`, `feeAmount`
    /// - created: `createdAt`, `created_at`, `dateFiled`
    ///
    /// Contact fields are read from a nested `resident` or `submitter`
    /// object when present, else from the record itself. Unknown statuses
    /// read as pending.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = first_str(value, &["id", "_id", "submissionId"])?;
        let kind = first_str(value, &["kind", "type", "submissionType"])
            .and_then(|k| SubmissionKind::parse(&k))
            .unwrap_or(SubmissionKind::Complaint);
        let anonymous = first_bool(value, &["anonymous", "isAnonymous"]).unwrap_or(false);
        let contact_source = value
            .get("resident")
            .or_else(|| value.get("submitter"))
            .filter(|v| v.is_object())
            .unwrap_or(value);
        let contact = if anonymous {
            ResidentContact::default()
        } else {
            ResidentContact::from_value(contact_source)
        };

        Some(Self {
            id,
            kind,
            category: first_str(value, &["category", "documentType", "complaintType"]).unwrap_or_default(),
            subject: first_str(value, &["subject", "title", "documentType"]).unwrap_or_default(),
            description: first_str(value, &["description", "details", "purpose"]).unwrap_or_default(),
            priority: first_str(value, &["priority"]).unwrap_or_else(|| "normal".to_string()),
            status: first_str(value, &["status"])
                .and_then(|s| SubmissionStatus::parse(&s))
                .unwrap_or(SubmissionStatus::Pending),
            anonymous,
            contact,
            document_code: first_str(value, &["documentCode", "code", "referenceNumber", "trackingNumber"]),
            evidence_url: first_str(value, &["evidenceUrl", "evidence", "attachment"]),
            fee: first_f64(value, &["fee", "amount", "feeAmount"]),
            created_at: first_time(value, &["createdAt", "created_at", "dateFiled"]),
        })
    }

    /// Code used for pickup verification; falls back to the record id.
    pub fn pickup_code(&self) -> &str {
        self.document_code.as_deref().unwrap_or(&self.id)
    }
}

/// Result of a lookup-by-code: the document plus the requesting resident.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub submission: Submission,
    pub resident: ResidentContact,
}

impl DocumentRecord {
    /// Accepts `{submission|document|data: {...}, resident: {...}}` or a
    /// flat submission record.
    pub fn from_value(value: &Value) -> Option<Self> {
        let record = ["submission", "document", "data"]
            .iter()
            .find_map(|key| value.get(*key).filter(|v| v.is_object()))
            .unwrap_or(value);
        let submission = Submission::from_value(record)?;
        let resident = value
            .get("resident")
            .filter(|v| v.is_object())
            .map(ResidentContact::from_value)
            .unwrap_or_else(|| submission.contact.clone());

        Some(Self { submission, resident })
    }
}

/// A document a resident may request, with its processing fee in pesos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentType {
    pub name: &'static str,
    pub fee: f64,
}

pub const DOCUMENT_TYPES: &[DocumentType] = &[
    DocumentType { name: "Barangay Clearance", fee: 50.0 },
    DocumentType { name: "Certificate of Residency", fee: 30.0 },
    DocumentType { name: "Certificate of Indigency", fee: 0.0 },
    DocumentType { name: "Business Clearance", fee: 200.0 },
    DocumentType { name: "Barangay ID", fee: 100.0 },
];

pub fn find_document_type(name: &str) -> Option<&'static DocumentType> {
    DOCUMENT_TYPES.iter().find(|d| d.name.eq_ignore_ascii_case(name.trim()))
}

pub const COMPLAINT_CATEGORIES: &[&str] = &[
    "Noise",
    "Garbage",
    "Road & Drainage",
    "Neighbor Dispute",
    "Public Safety",
    "Other",
];

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ComplaintForm {
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 3, max = 150, message = "Subject must be 3 to 150 characters"))]
    pub subject: String,
    #[validate(length(min = 10, message = "Please describe the complaint in at least 10 characters"))]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub anonymous: Option<String>,
}

impl ComplaintForm {
    pub fn is_anonymous(&self) -> bool {
        matches!(self.anonymous.as_deref(), Some("on" | "true" | "1"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DocumentRequestForm {
    #[validate(length(min = 1, message = "Choose a document type"))]
    pub document_type: String,
    #[validate(length(min = 3, message = "State the purpose of the request"))]
    pub purpose: String,
    #[validate(range(min = 1, max = 10, message = "Quantity must be between 1 and 10"))]
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_priority() -> String {
    "normal".to_string()
}

fn default_quantity() -> u32 {
    1
}

/// Body of `POST /submissions`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    pub kind: SubmissionKind,
    pub category: String,
    pub subject: String,
    pub description: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
}

/// An evidence file attached to a complaint.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the backend returns after a submission is filed.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    /// Identifier shown to the resident verbatim.
    pub reference: String,
    pub status: SubmissionStatus,
}

impl SubmissionReceipt {
    /// Precedence: `complaintId`, `referenceNumber`, `trackingNumber`,
    /// `id`, then the same keys inside a nested `submission` object.
    pub fn from_value(value: &Value) -> Option<Self> {
        const KEYS: &[&str] = &["complaintId", "referenceNumber", "trackingNumber", "id", "_id"];
        let nested = value.get("submission").filter(|v| v.is_object());
        let reference = first_str(value, KEYS).or_else(|| nested.and_then(|n| first_str(n, KEYS)))?;
        let status = first_str(value, &["status"])
            .or_else(|| nested.and_then(|n| first_str(n, &["status"])))
            .and_then(|s| SubmissionStatus::parse(&s))
            .unwrap_or(SubmissionStatus::Pending);

        Some(Self { reference, status })
    }
}

/// Shape of `GET /submissions/:id/qr`: either a ready image or the payload
/// to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionQr {
    Image(String),
    Payload(String),
}

impl SubmissionQr {
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(image) = first_str(value, &["qr", "qrCode", "image", "dataUrl"]) {
            if image.starts_with("data:image/") || image.starts_with("http") {
                return Some(Self::Image(image));
            }
            return Some(Self::Payload(image));
        }
        if let Some(payload) = value.get("payload") {
            return match payload {
                Value::String(s) => Some(Self::Payload(s.clone())),
                other if other.is_object() => Some(Self::Payload(other.to_string())),
                _ => None,
            };
        }
        first_str(value, &["documentId", "documentCode", "code"])
            .map(|code| Self::Payload(crate::qr::payload::QrPayload::Document(code).encode()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub kind: Option<SubmissionKind>,
    pub status: Option<SubmissionStatus>,
    pub mine: bool,
}

impl SubmissionFilter {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(kind) = self.kind {
            query.push(("type", kind.as_str().to_string()));
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if self.mine {
            query.push(("mine", "true".to_string()));
        }
        query
    }
}
