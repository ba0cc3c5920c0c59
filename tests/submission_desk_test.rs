use std::sync::Arc;

use barangay_portal::{
    client::{fake::{ApiCall, FakePortalApi}, SessionToken},
    domain::{
        ComplaintForm, DocumentRequestForm, Identity, ResidentContact, Role, Submission, SubmissionKind,
        SubmissionStatus,
    },
    error::AppError,
    service::submission_service::{QrView, SubmissionDesk},
};

const MAX_UPLOAD: usize = 1024 * 1024;

fn resident() -> Identity {
    Identity {
        id: "juan".to_string(),
        role: Role::Resident,
        display_name: "Juan Dela Cruz".to_string(),
        email: Some("juan@example.com".to_string()),
        lookup_id: Some("RES-0042".to_string()),
    }
}

fn complaint(anonymous: Option<&str>) -> ComplaintForm {
    ComplaintForm {
        category: "Sanitation".to_string(),
        subject: "Uncollected garbage".to_string(),
        description: "Garbage has not been collected on Mabini St for two weeks.".to_string(),
        location: "  ".to_string(),
        priority: "HIGH".to_string(),
        anonymous: anonymous.map(str::to_string),
    }
}

fn setup() -> (Arc<FakePortalApi>, SubmissionDesk) {
    let api = Arc::new(FakePortalApi::new().with_session("res-token", resident()));
    let desk = SubmissionDesk::new(api.clone(), SessionToken::new("res-token"), MAX_UPLOAD);
    (api, desk)
}

fn filed(api: &FakePortalApi) -> Vec<(barangay_portal::domain::NewSubmission, bool)> {
    api.calls()
        .into_iter()
        .filter_map(|call| match call {
            ApiCall::CreateSubmission { submission, with_evidence } => Some((submission, with_evidence)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_complaint_without_evidence_is_plain_submission() -> anyhow::Result<()> {
    let (api, desk) = setup();

    let receipt = desk.file_complaint(&complaint(None), &resident(), None).await?;
    assert_eq!(receipt.reference, "CMP-2024-0001");
    assert_eq!(receipt.status, SubmissionStatus::Pending);

    let filed = filed(&api);
    assert_eq!(filed.len(), 1);
    let (submission, with_evidence) = &filed[0];
    assert!(!with_evidence);
    assert!(!submission.anonymous);
    assert_eq!(submission.priority, "high");
    assert_eq!(submission.location, None);
    assert_eq!(submission.contact_name.as_deref(), Some("Juan Dela Cruz"));

    Ok(())
}

#[tokio::test]
async fn test_anonymous_complaint_carries_no_contact() -> anyhow::Result<()> {
    let (api, desk) = setup();
    let evidence = Some(("photo.jpg".to_string(), vec![0xFF, 0xD8, 0xFF]));

    desk.file_complaint(&complaint(Some("on")), &resident(), evidence).await?;

    let (submission, with_evidence) = filed(&api).remove(0);
    assert!(submission.anonymous);
    assert!(with_evidence);
    assert_eq!(submission.contact_name, None);
    assert_eq!(submission.contact_email, None);

    Ok(())
}

#[tokio::test]
async fn test_invalid_complaint_is_not_sent() -> anyhow::Result<()> {
    let (api, desk) = setup();
    let form = ComplaintForm {
        description: "short".to_string(),
        ..complaint(None)
    };

    let result = desk.file_complaint(&form, &resident(), None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let oversized = Some(("scan.pdf".to_string(), vec![0u8; MAX_UPLOAD + 1]));
    let result = desk.file_complaint(&complaint(None), &resident(), oversized).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert!(filed(&api).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_document_fee_scales_with_quantity() -> anyhow::Result<()> {
    let (api, desk) = setup();
    let form = DocumentRequestForm {
        document_type: "Barangay Clearance".to_string(),
        purpose: "Employment".to_string(),
        quantity: 3,
    };

    desk.request_document(&form, &resident()).await?;

    let (submission, _) = filed(&api).remove(0);
    assert_eq!(submission.kind, SubmissionKind::DocumentRequest);
    assert_eq!(submission.fee, Some(150.0));
    assert_eq!(submission.document_type.as_deref(), Some("Barangay Clearance"));

    let unknown = DocumentRequestForm {
        document_type: "Passport".to_string(),
        ..form
    };
    assert!(matches!(
        desk.request_document(&unknown, &resident()).await,
        Err(AppError::Validation(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_pickup_qr_renders_document_payload() -> anyhow::Result<()> {
    let submission = Submission {
        id: "sub-7".to_string(),
        kind: SubmissionKind::DocumentRequest,
        category: "Barangay ID".to_string(),
        subject: "Barangay ID request".to_string(),
        description: "Identification".to_string(),
        priority: "normal".to_string(),
        status: SubmissionStatus::Ready,
        anonymous: false,
        contact: ResidentContact::default(),
        document_code: Some("DOC-2024-007".to_string()),
        evidence_url: None,
        fee: Some(100.0),
        created_at: None,
    };
    let api = Arc::new(
        FakePortalApi::new()
            .with_session("res-token", resident())
            .with_submission(submission),
    );
    let desk = SubmissionDesk::new(api.clone(), SessionToken::new("res-token"), MAX_UPLOAD);

    match desk.pickup_qr("sub-7").await? {
        QrView::Svg(svg) => assert!(svg.contains("<svg")),
        other => panic!("expected svg, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_status_update_reaches_backend() -> anyhow::Result<()> {
    let (api, desk) = setup();

    desk.set_status("sub-1", SubmissionStatus::Resolved).await?;
    assert!(api
        .calls()
        .contains(&ApiCall::UpdateStatus("sub-1".to_string(), SubmissionStatus::Resolved)));

    api.fail_with(503, "Maintenance");
    let err = desk.set_status("sub-1", SubmissionStatus::Active).await.unwrap_err();
    assert_eq!(err.user_message(), "Maintenance");

    Ok(())
}
