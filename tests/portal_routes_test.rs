use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use barangay_portal::{
    api::create_app,
    auth::CsrfService,
    client::{fake::{ApiCall, FakePortalApi}, SessionToken},
    config::Settings,
    domain::{
        Announcement, DocumentRecord, Identity, ResidentContact, Role, Submission, SubmissionKind,
        SubmissionStatus,
    },
    qr::{self, payload::QrPayload},
    service::ServiceContext,
};

const SECRET: &str = "test-csrf-secret";

fn identity(id: &str, role: Role, name: &str) -> Identity {
    Identity {
        id: id.to_string(),
        role,
        display_name: name.to_string(),
        email: Some(format!("{}@example.com", id)),
        lookup_id: None,
    }
}

fn backend() -> Arc<FakePortalApi> {
    Arc::new(
        FakePortalApi::new()
            .with_session("res-token", identity("juan", Role::Resident, "Juan Dela Cruz"))
            .with_session("staff-token", identity("maria", Role::Staff, "Maria Santos"))
            .with_account("juan@example.com", "correct-horse", "res-token"),
    )
}

fn app(api: Arc<FakePortalApi>) -> Router {
    let settings = Settings::default();
    let context = ServiceContext::new(
        api,
        Arc::new(CsrfService::new(SECRET)),
        settings.portal.clone(),
    );
    create_app(Arc::new(context), Arc::new(settings))
}

fn csrf_for(token: &str) -> String {
    CsrfService::new(SECRET)
        .generate_token(&SessionToken::new(token))
        .expect("csrf token")
}

fn get(path: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("portal_session={}", token));
    }
    builder.body(Body::empty()).expect("request")
}

fn post_form(path: &str, session: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::COOKIE, format!("portal_session={}", session))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

const BOUNDARY: &str = "portal-test-boundary";

/// A `multipart/form-data` POST with the CSRF token in the query string, the
/// way the portal's upload forms send it. `file` is (field, filename, bytes).
fn post_multipart(
    path: &str,
    session: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("{}?csrf_token={}", path, csrf_for(session)))
        .header(header::COOKIE, format!("portal_session={}", session))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("request")
}

/// Value of the first hidden input named `name` in a rendered page.
fn hidden_value(html: &str, name: &str) -> Option<String> {
    let marker = format!("type=\"hidden\" name=\"{}\" value=\"", name);
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

fn location(response: &axum::response::Response) -> Option<&str> {
    response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok())
}

async fn body_text(response: axum::response::Response) -> anyhow::Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn test_signed_out_visitor_is_sent_to_landing() -> anyhow::Result<()> {
    let response = app(backend()).oneshot(get("/portal/dashboard", None)).await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    Ok(())
}

#[tokio::test]
async fn test_unknown_session_is_sent_to_landing() -> anyhow::Result<()> {
    let response = app(backend()).oneshot(get("/portal/staff", Some("expired"))).await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    Ok(())
}

#[tokio::test]
async fn test_roles_are_redirected_to_their_own_dashboard() -> anyhow::Result<()> {
    let api = backend();

    let resident_on_staff = app(api.clone())
        .oneshot(get("/portal/staff/verify", Some("res-token")))
        .await?;
    assert_eq!(resident_on_staff.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resident_on_staff), Some("/portal/dashboard"));

    let staff_on_resident = app(api)
        .oneshot(get("/portal/complaints/new", Some("staff-token")))
        .await?;
    assert_eq!(staff_on_resident.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&staff_on_resident), Some("/portal/staff"));

    Ok(())
}

#[tokio::test]
async fn test_resident_dashboard_renders_for_resident() -> anyhow::Result<()> {
    let response = app(backend()).oneshot(get("/portal/dashboard", Some("res-token"))).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Juan Dela Cruz"));
    assert!(html.contains(&csrf_for("res-token")));

    Ok(())
}

#[tokio::test]
async fn test_post_without_csrf_token_is_forbidden() -> anyhow::Result<()> {
    let api = backend();
    let body = "document_type=Barangay+Clearance&purpose=Employment&quantity=1".to_string();

    let response = app(api.clone())
        .oneshot(post_form("/portal/documents", "res-token", body))
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!api
        .calls()
        .iter()
        .any(|call| matches!(call, ApiCall::CreateSubmission { .. })));

    Ok(())
}

#[tokio::test]
async fn test_post_with_wrong_session_csrf_token_is_forbidden() -> anyhow::Result<()> {
    let body = format!(
        "document_type=Barangay+Clearance&purpose=Employment&quantity=1&csrf_token={}",
        csrf_for("staff-token")
    );

    let response = app(backend())
        .oneshot(post_form("/portal/documents", "res-token", body))
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn test_document_request_with_csrf_token_is_filed() -> anyhow::Result<()> {
    let api = backend();
    let body = format!(
        "document_type=Barangay+Clearance&purpose=Employment&quantity=2&csrf_token={}",
        csrf_for("res-token")
    );

    let response = app(api.clone())
        .oneshot(post_form("/portal/documents", "res-token", body))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("DOC-2024-0001"));

    let filed = api
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ApiCall::CreateSubmission { submission, .. } => Some(submission),
            _ => None,
        })
        .expect("submission filed");
    assert_eq!(filed.kind, SubmissionKind::DocumentRequest);
    assert_eq!(filed.quantity, Some(2));

    Ok(())
}

#[tokio::test]
async fn test_multipart_complaint_carries_csrf_in_query() -> anyhow::Result<()> {
    let api = backend();
    let request = post_multipart(
        "/portal/complaints",
        "res-token",
        &[
            ("category", "Noise"),
            ("subject", "Karaoke past midnight"),
            ("description", "Loud karaoke every night until 2 AM near the chapel."),
            ("priority", "normal"),
            ("submit", "File complaint"),
        ],
        None,
    );

    let response = app(api.clone()).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("CMP-2024-0001"));

    let calls = api.calls();
    let (submission, with_evidence) = calls
        .iter()
        .find_map(|call| match call {
            ApiCall::CreateSubmission { submission, with_evidence } => Some((submission, *with_evidence)),
            _ => None,
        })
        .expect("complaint filed");
    assert!(!submission.anonymous);
    assert!(!with_evidence);
    assert_eq!(submission.contact_name.as_deref(), Some("Juan Dela Cruz"));
    assert_eq!(submission.location, None);

    Ok(())
}

#[tokio::test]
async fn test_login_sets_session_cookie_and_redirects_by_role() -> anyhow::Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=juan%40example.com&password=correct-horse&audience=resident"))?;

    let response = app(backend()).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/portal/dashboard"));
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("portal_session=res-token"));

    Ok(())
}

#[tokio::test]
async fn test_bad_password_stays_on_login_page() -> anyhow::Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("email=juan%40example.com&password=wrong&audience=resident"))?;

    let response = app(backend()).oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("Invalid email or password"));

    Ok(())
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let response = app(backend()).oneshot(get("/health", None)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("healthy"));
    Ok(())
}

fn pickup_record(id: &str, document_code: Option<&str>) -> DocumentRecord {
    let resident = ResidentContact {
        name: Some("Juan Dela Cruz".to_string()),
        email: Some("juan@example.com".to_string()),
        phone: Some("09171234567".to_string()),
        address: Some("12 Rizal St, Purok 3".to_string()),
        resident_id: Some("RES-0042".to_string()),
    };
    DocumentRecord {
        submission: Submission {
            id: id.to_string(),
            kind: SubmissionKind::DocumentRequest,
            category: "Barangay Clearance".to_string(),
            subject: "Barangay Clearance".to_string(),
            description: "Employment".to_string(),
            priority: "normal".to_string(),
            status: SubmissionStatus::Ready,
            anonymous: false,
            contact: resident.clone(),
            document_code: document_code.map(str::to_string),
            evidence_url: None,
            fee: Some(50.0),
            created_at: None,
        },
        resident,
    }
}

/// The backend answers lookups for DOC-2024-009 with a record that carries
/// only its own id, no document code.
fn desk_backend() -> Arc<FakePortalApi> {
    Arc::new(
        FakePortalApi::new()
            .with_session("staff-token", identity("maria", Role::Staff, "Maria Santos"))
            .with_document("DOC-2024-009", pickup_record("sub-42", None))
            .with_document("DOC-2024-010", pickup_record("sub-43", Some("DOC-2024-010"))),
    )
}

fn draft(id: &str, title: &str) -> Announcement {
    Announcement {
        id: id.to_string(),
        title: title.to_string(),
        content: "Bring gloves and a sack.".to_string(),
        category: "Event".to_string(),
        priority: "normal".to_string(),
        target_hall: None,
        event_date: None,
        event_time: None,
        expected_attendees: None,
        tags: vec![],
        image_url: None,
        published: false,
        published_schedule: None,
        created_at: None,
    }
}

fn staff_backend() -> Arc<FakePortalApi> {
    Arc::new(
        FakePortalApi::new()
            .with_session("staff-token", identity("maria", Role::Staff, "Maria Santos"))
            .with_announcement(draft("ann-7", "Clean-up drive")),
    )
}

#[tokio::test]
async fn test_typed_code_lookup_then_collect_completes_document() -> anyhow::Result<()> {
    let api = desk_backend();

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/verify",
            "staff-token",
            &[("code", "DOC-2024-009")],
            None,
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Juan Dela Cruz"));
    assert!(html.contains("Mark as collected"));

    // The collect form carries the code that was looked up, not the record id
    let code = hidden_value(&html, "code").expect("collect form");
    assert_eq!(code, "DOC-2024-009");

    let body = format!("code={}&csrf_token={}", code, csrf_for("staff-token"));
    let response = app(api.clone())
        .oneshot(post_form("/portal/staff/verify/collect", "staff-token", body))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Document marked as collected"));
    assert!(!html.contains("No document found"));

    let calls = api.calls();
    assert_eq!(
        calls
            .iter()
            .filter(|call| matches!(call, ApiCall::FindDocument(code) if code == "DOC-2024-009"))
            .count(),
        2
    );
    assert!(calls.contains(&ApiCall::CompleteSubmission("sub-42".to_string())));
    assert_eq!(
        api.document("DOC-2024-009").map(|r| r.submission.status),
        Some(SubmissionStatus::Completed)
    );

    Ok(())
}

#[tokio::test]
async fn test_collect_without_csrf_token_is_forbidden() -> anyhow::Result<()> {
    let api = desk_backend();

    let response = app(api.clone())
        .oneshot(post_form("/portal/staff/verify/collect", "staff-token", "code=DOC-2024-010".to_string()))
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(api.calls().iter().all(|call| !matches!(call, ApiCall::CompleteSubmission(_))));

    Ok(())
}

#[tokio::test]
async fn test_scanned_payload_is_looked_up_by_document_code() -> anyhow::Result<()> {
    let api = desk_backend();
    let scanned = QrPayload::Document("DOC-2024-010".to_string()).encode();

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/verify",
            "staff-token",
            &[("scanned", scanned.as_str()), ("code", "")],
            None,
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hidden_value(&body_text(response).await?, "code").as_deref(), Some("DOC-2024-010"));
    let lookups: Vec<_> = api
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ApiCall::FindDocument(_)))
        .collect();
    assert_eq!(lookups, vec![ApiCall::FindDocument("DOC-2024-010".to_string())]);

    Ok(())
}

#[tokio::test]
async fn test_snapshot_of_pickup_qr_is_decoded_and_looked_up() -> anyhow::Result<()> {
    let api = desk_backend();
    let payload = QrPayload::Document("DOC-2024-010".to_string()).encode();
    let frame = qr::encode_matrix(&payload)?.to_frame(4, 4);
    let image = image::GrayImage::from_raw(frame.width as u32, frame.height as u32, frame.pixels)
        .expect("frame fits image");
    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/verify",
            "staff-token",
            &[],
            Some(("snapshot", "pickup.png", png.as_slice())),
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await?.contains("Barangay Clearance"));
    assert!(api.calls().contains(&ApiCall::FindDocument("DOC-2024-010".to_string())));

    Ok(())
}

#[tokio::test]
async fn test_unknown_code_shows_error_without_collect_form() -> anyhow::Result<()> {
    let response = app(desk_backend())
        .oneshot(post_multipart(
            "/portal/staff/verify",
            "staff-token",
            &[("code", "DOC-9999")],
            None,
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("No document found for code DOC-9999"));
    assert!(!html.contains("Mark as collected"));

    Ok(())
}

#[tokio::test]
async fn test_loaded_draft_resaves_as_update() -> anyhow::Result<()> {
    let api = staff_backend();

    let response = app(api.clone())
        .oneshot(get("/portal/staff/announcements/ann-7/edit", Some("staff-token")))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    let editing_id = hidden_value(&html, "editing_id").expect("editing id field");
    assert_eq!(editing_id, "ann-7");

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/announcements/editor",
            "staff-token",
            &[
                ("editing_id", editing_id.as_str()),
                ("title", "Clean-up drive"),
                ("content", "Meet at the covered court."),
                ("category", "Event"),
                ("priority", "normal"),
                ("action", "save"),
            ],
            None,
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Draft saved"));
    assert_eq!(hidden_value(&html, "editing_id").as_deref(), Some("ann-7"));

    let calls = api.calls();
    assert!(!calls.iter().any(|call| matches!(call, ApiCall::CreateAnnouncement(_))));
    let updated = calls
        .iter()
        .find_map(|call| match call {
            ApiCall::UpdateAnnouncement(id, payload) => Some((id.clone(), payload.clone())),
            _ => None,
        })
        .expect("draft updated");
    assert_eq!(updated.0, "ann-7");
    assert_eq!(updated.1.content, "Meet at the covered court.");
    assert!(!updated.1.published);
    assert_eq!(api.announcements().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_new_draft_is_saved_when_draft_list_fails() -> anyhow::Result<()> {
    let api = staff_backend();
    api.fail_call(ApiCall::ListDrafts, 503, "Drafts are unavailable");

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/announcements/editor",
            "staff-token",
            &[("editing_id", ""), ("title", "Vaccination day"), ("action", "save")],
            None,
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Draft saved"));
    assert!(html.contains("Drafts are unavailable"));
    let editing_id = hidden_value(&html, "editing_id").expect("editing id field");
    assert!(!editing_id.is_empty());
    assert!(api.announcements().iter().any(|a| a.id == editing_id && a.title == "Vaccination day"));

    Ok(())
}

#[tokio::test]
async fn test_incomplete_publish_keeps_form_and_calls_nothing() -> anyhow::Result<()> {
    let api = staff_backend();

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/announcements/editor",
            "staff-token",
            &[
                ("editing_id", ""),
                ("title", "Water interruption"),
                ("target_hall", "Purok 3 chapel"),
                ("action", "publish"),
            ],
            None,
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Please fill in: Content, Category"));
    assert!(html.contains("value=\"Water interruption\""));
    assert!(html.contains("value=\"Purok 3 chapel\""));
    assert!(!api.calls().iter().any(|call| matches!(
        call,
        ApiCall::CreateAnnouncement(_) | ApiCall::UpdateAnnouncement(..)
    )));

    Ok(())
}

#[tokio::test]
async fn test_publish_redirects_to_announcement_list() -> anyhow::Result<()> {
    let api = staff_backend();

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/announcements/editor",
            "staff-token",
            &[
                ("editing_id", ""),
                ("title", "Water interruption"),
                ("content", "No water supply on Purok 3 from 8 AM to 5 PM."),
                ("category", "Utilities"),
                ("priority", "high"),
                ("action", "publish"),
            ],
            None,
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).unwrap_or_default().starts_with("/portal/staff/announcements?published="));

    let created = api
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ApiCall::CreateAnnouncement(payload) => Some(payload),
            _ => None,
        })
        .expect("announcement created");
    assert!(!created.published);
    assert!(created.published_schedule.is_some());

    Ok(())
}

#[tokio::test]
async fn test_attach_uploads_image_and_keeps_url_on_form() -> anyhow::Result<()> {
    let api = staff_backend();

    let response = app(api.clone())
        .oneshot(post_multipart(
            "/portal/staff/announcements/editor",
            "staff-token",
            &[("editing_id", "ann-7"), ("title", "Clean-up drive"), ("action", "attach")],
            Some(("image", "poster.png", b"\x01\x02\x03".as_slice())),
        ))
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await?;
    assert!(html.contains("Image attached"));
    let url = hidden_value(&html, "image_url").expect("image url kept");
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    // Attaching alone saves nothing
    let calls = api.calls();
    assert!(calls.iter().any(|call| matches!(call, ApiCall::UploadImage(_))));
    assert!(!calls.iter().any(|call| matches!(
        call,
        ApiCall::CreateAnnouncement(_) | ApiCall::UpdateAnnouncement(..)
    )));

    Ok(())
}
