use std::sync::Arc;
use std::time::Duration;

use barangay_portal::{
    client::{fake::{ApiCall, FakePortalApi}, SessionToken},
    domain::{
        DocumentRecord, Identity, ResidentContact, Role, Submission, SubmissionKind, SubmissionStatus,
    },
    qr::{
        self,
        payload::QrPayload,
        scanner::{Scanner, StillFrames},
    },
    service::{
        scope::PageScope,
        verification_service::{LookupInput, VerificationDesk, VerificationState},
    },
};

fn staff() -> Identity {
    Identity {
        id: "staff-1".to_string(),
        role: Role::Staff,
        display_name: "Maria Santos".to_string(),
        email: None,
        lookup_id: None,
    }
}

fn clearance(code: &str, status: SubmissionStatus) -> DocumentRecord {
    let resident = ResidentContact {
        name: Some("Juan Dela Cruz".to_string()),
        email: Some("juan@example.com".to_string()),
        phone: Some("09171234567".to_string()),
        address: Some("12 Rizal St, Purok 3".to_string()),
        resident_id: Some("RES-0042".to_string()),
    };
    DocumentRecord {
        submission: Submission {
            id: format!("sub-{}", code),
            kind: SubmissionKind::DocumentRequest,
            category: "Barangay Clearance".to_string(),
            subject: "Barangay Clearance".to_string(),
            description: "Employment".to_string(),
            priority: "normal".to_string(),
            status,
            anonymous: false,
            contact: resident.clone(),
            document_code: Some(code.to_string()),
            evidence_url: None,
            fee: Some(50.0),
            created_at: None,
        },
        resident,
    }
}

fn desk(api: &Arc<FakePortalApi>) -> VerificationDesk {
    VerificationDesk::new(api.clone(), SessionToken::new("staff-token"))
}

fn backend() -> Arc<FakePortalApi> {
    Arc::new(
        FakePortalApi::new()
            .with_session("staff-token", staff())
            .with_document("DOC-2024-001", clearance("DOC-2024-001", SubmissionStatus::Ready))
            .with_document("DOC-2024-002", clearance("DOC-2024-002", SubmissionStatus::Ready))
            .with_document("DOC-2024-003", clearance("DOC-2024-003", SubmissionStatus::Completed)),
    )
}

#[tokio::test]
async fn test_unknown_code_shows_error_without_record() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    let state = desk.lookup(LookupInput::Manual("DOC-9999".to_string()), &scope).await;
    assert_eq!(
        state,
        &VerificationState::Error("No document found for code DOC-9999".to_string())
    );
    assert!(desk.verified().is_none());
    assert!(!desk.can_mark_collected());

    Ok(())
}

#[tokio::test]
async fn test_scanned_json_payload_looks_up_document_id() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    desk.lookup(LookupInput::Scanned(r#"{"documentId":"DOC-2024-001"}"#.to_string()), &scope)
        .await;

    assert_eq!(api.calls(), vec![ApiCall::FindDocument("DOC-2024-001".to_string())]);
    let record = desk.verified().expect("document verified");
    assert_eq!(record.resident.name.as_deref(), Some("Juan Dela Cruz"));
    assert!(desk.can_mark_collected());

    Ok(())
}

#[tokio::test]
async fn test_manual_code_is_used_verbatim() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    desk.lookup(LookupInput::Manual("DOC-2024-002".to_string()), &scope).await;

    assert_eq!(api.calls(), vec![ApiCall::FindDocument("DOC-2024-002".to_string())]);
    assert!(matches!(desk.state(), VerificationState::Verified { .. }));

    Ok(())
}

#[tokio::test]
async fn test_collected_document_is_not_completed_twice() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    desk.lookup(LookupInput::Manual("DOC-2024-003".to_string()), &scope).await;
    assert!(!desk.can_mark_collected());

    assert!(!desk.mark_collected().await?);
    assert!(!api
        .calls()
        .iter()
        .any(|call| matches!(call, ApiCall::CompleteSubmission(_))));

    Ok(())
}

#[tokio::test]
async fn test_mark_collected_completes_ready_document() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    desk.lookup(LookupInput::Manual("DOC-2024-001".to_string()), &scope).await;
    assert!(desk.mark_collected().await?);

    assert!(api
        .calls()
        .contains(&ApiCall::CompleteSubmission("sub-DOC-2024-001".to_string())));
    assert_eq!(
        api.document("DOC-2024-001").map(|r| r.submission.status),
        Some(SubmissionStatus::Completed)
    );
    assert!(!desk.can_mark_collected());

    Ok(())
}

#[tokio::test]
async fn test_cancelled_lookup_drops_late_response() -> anyhow::Result<()> {
    let api = backend();
    api.delay_documents(Duration::from_millis(500));
    let mut desk = desk(&api);
    let scope = PageScope::new();

    let canceller = scope.canceller();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let state = desk.lookup(LookupInput::Manual("DOC-2024-001".to_string()), &scope).await;
    assert_eq!(
        state,
        &VerificationState::Verifying { code: "DOC-2024-001".to_string() }
    );
    assert!(desk.verified().is_none());

    Ok(())
}

#[tokio::test]
async fn test_camera_scan_feeds_lookup() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    let payload = QrPayload::Document("DOC-2024-002".to_string()).encode();
    let frame = qr::encode_matrix(&payload)?.to_frame(4, 4);
    let scanner = Scanner::new(StillFrames::new([frame]));

    desk.scan_and_lookup(&scanner, &scope).await;

    assert_eq!(api.calls(), vec![ApiCall::FindDocument("DOC-2024-002".to_string())]);
    assert!(matches!(desk.state(), VerificationState::Verified { .. }));
    assert!(!scanner.is_busy());

    Ok(())
}

#[tokio::test]
async fn test_busy_camera_is_an_error() -> anyhow::Result<()> {
    let api = backend();
    let mut desk = desk(&api);
    let scope = PageScope::new();

    let scanner = Scanner::new(StillFrames::new(Vec::new()));
    let _held = scanner.try_acquire()?;

    let state = desk.scan_and_lookup(&scanner, &scope).await;
    assert!(matches!(state, VerificationState::Error(_)));
    assert!(api.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_verified_code_is_the_looked_up_code() -> anyhow::Result<()> {
    let mut record = clearance("DOC-2024-009", SubmissionStatus::Ready);
    record.submission.id = "sub-42".to_string();
    record.submission.document_code = None;
    let api = Arc::new(
        FakePortalApi::new()
            .with_session("staff-token", staff())
            .with_document("DOC-2024-009", record),
    );
    let mut desk = desk(&api);
    let scope = PageScope::new();

    desk.lookup(LookupInput::Manual(" DOC-2024-009 ".to_string()), &scope).await;
    assert_eq!(desk.verified_code(), Some("DOC-2024-009"));
    assert_eq!(desk.verified().map(|r| r.submission.pickup_code()), Some("sub-42"));

    // Looking up again by the verified code finds the same document
    let code = desk.verified_code().map(str::to_string).unwrap_or_default();
    desk.lookup(LookupInput::Manual(code), &scope).await;
    assert!(desk.mark_collected().await?);
    assert_eq!(
        api.calls(),
        vec![
            ApiCall::FindDocument("DOC-2024-009".to_string()),
            ApiCall::FindDocument("DOC-2024-009".to_string()),
            ApiCall::CompleteSubmission("sub-42".to_string()),
        ]
    );

    Ok(())
}
