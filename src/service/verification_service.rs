//! Staff-side document verification: look a document up by its pickup
//! code, then mark it collected.

use std::sync::Arc;

use super::scope::PageScope;
use crate::{
    client::{PortalApi, SessionToken},
    domain::{DocumentRecord, SubmissionStatus},
    error::{AppError, Result},
    qr::{
        payload::document_code_from_scan,
        scanner::{FrameSource, Scanner},
    },
};

/// Where a lookup code came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupInput {
    /// Raw text decoded from a QR code.
    Scanned(String),
    /// Typed by staff.
    Manual(String),
}

impl LookupInput {
    pub fn code(&self) -> String {
        match self {
            LookupInput::Scanned(raw) => document_code_from_scan(raw),
            LookupInput::Manual(code) => code.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationState {
    Idle,
    Verifying { code: String },
    /// `code` is what the lookup was made with. Follow-up lookups reuse
    /// it; the record may carry no code of its own.
    Verified { code: String, record: DocumentRecord },
    Error(String),
}

pub struct VerificationDesk {
    api: Arc<dyn PortalApi>,
    token: SessionToken,
    state: VerificationState,
}

impl VerificationDesk {
    pub fn new(api: Arc<dyn PortalApi>, token: SessionToken) -> Self {
        Self { api, token, state: VerificationState::Idle }
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn verified(&self) -> Option<&DocumentRecord> {
        match &self.state {
            VerificationState::Verified { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Code of the verified document as it was looked up.
    pub fn verified_code(&self) -> Option<&str> {
        match &self.state {
            VerificationState::Verified { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = VerificationState::Idle;
    }

    /// Look up a document. Any previous result is cleared first. If the
    /// scope is cancelled before the backend answers, the desk stays in
    /// `Verifying` and the late answer is dropped.
    pub async fn lookup(&mut self, input: LookupInput, scope: &PageScope) -> &VerificationState {
        let code = input.code();
        if code.is_empty() {
            self.state = VerificationState::Error("Enter or scan a document code".to_string());
            return &self.state;
        }

        tracing::debug!("Verifying document {}", code);
        self.state = VerificationState::Verifying { code: code.clone() };

        match scope.run(self.api.find_document(&self.token, &code)).await {
            None => tracing::debug!("Lookup for {} cancelled", code),
            Some(Ok(record)) => self.state = VerificationState::Verified { code, record },
            Some(Err(AppError::Backend { status: 404, .. })) | Some(Err(AppError::NotFound(_))) => {
                self.state = VerificationState::Error(format!("No document found for code {}", code));
            }
            Some(Err(e)) => {
                tracing::warn!("Document lookup for {} failed: {}", code, e);
                self.state = VerificationState::Error(e.user_message());
            }
        }
        &self.state
    }

    /// Scan with the camera, then look the decoded payload up. A busy
    /// camera or unreadable scan lands in `Error`.
    pub async fn scan_and_lookup<S>(&mut self, scanner: &Scanner<S>, scope: &PageScope) -> &VerificationState
    where
        S: FrameSource + 'static,
    {
        let scanned = match scanner.try_acquire() {
            Ok(session) => session.scan(&scope.token()).await,
            Err(e) => Err(e),
        };

        match scanned {
            Ok(raw) => self.lookup(LookupInput::Scanned(raw), scope).await,
            Err(AppError::Cancelled) => &self.state,
            Err(e) => {
                self.state = VerificationState::Error(e.user_message());
                &self.state
            }
        }
    }

    pub fn can_mark_collected(&self) -> bool {
        self.verified()
            .map(|record| record.submission.status != SubmissionStatus::Completed)
            .unwrap_or(false)
    }

    /// Returns `Ok(false)` without calling the backend when the document
    /// was already collected.
    pub async fn mark_collected(&mut self) -> Result<bool> {
        let VerificationState::Verified { code, record } = &mut self.state else {
            return Err(AppError::BadRequest("No verified document to mark as collected".to_string()));
        };

        if record.submission.status == SubmissionStatus::Completed {
            return Ok(false);
        }

        self.api.complete_submission(&self.token, &record.submission.id).await?;
        record.submission.status = SubmissionStatus::Completed;
        tracing::info!("Document {} marked collected", code);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_input_codes() {
        assert_eq!(LookupInput::Scanned(r#"{"documentId":"DOC-1"}"#.into()).code(), "DOC-1");
        assert_eq!(LookupInput::Scanned(" DOC-2 ".into()).code(), "DOC-2");
        assert_eq!(LookupInput::Manual(r#" {"documentId":"X"} "#.into()).code(), r#"{"documentId":"X"}"#);
    }
}
