use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::helpers::{TestApp, BOUNDARY};
use student_achievements::core::policy::Role;

fn gold_medal() -> Value {
    json!({
        "type": "competition",
        "title": "Gold Medal, National Olympiad",
        "description": "First place in the national informatics olympiad",
        "details": { "rank": 1, "event_date": "2024-08-17", "international": false },
        "tags": ["olympiad", "informatics", "olympiad"],
        "points": 50
    })
}

fn multipart_body(filename: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        c = content
    )
}

#[actix_web::test]
async fn achievement_moves_from_draft_to_verified_and_is_then_frozen() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();
    let lecturer = app.token(Uuid::new_v4(), Role::Lecturer);

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .set_json(gold_medal())
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "draft");
    assert_eq!(body["data"]["detail"]["state"], "available");
    assert_eq!(
        body["data"]["detail"]["tags"],
        json!(["olympiad", "informatics"])
    );
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = test::call_service(
        &service,
        app.patch(&format!("/api/v1/achievements/{}/submit", id), &student)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["data"]["status"], "submitted");

    let response = test::call_service(
        &service,
        app.patch(&format!("/api/v1/achievements/{}/verify", id), &lecturer)
            .set_json(json!({ "status": "VERIFIED" }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["data"]["status"], "verified");
    assert!(body["data"]["verified_at"].is_string());

    let response = test::call_service(
        &service,
        app.put(&format!("/api/v1/achievements/{}", id), &student)
            .set_json(gold_medal())
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn rejecting_without_notes_leaves_the_achievement_untouched() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();
    let lecturer = app.token(Uuid::new_v4(), Role::Lecturer);

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .set_json(gold_medal())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = test::call_service(
        &service,
        app.patch(&format!("/api/v1/achievements/{}/verify", id), &lecturer)
            .set_json(json!({ "status": "rejected", "notes": "" }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test::call_service(
        &service,
        app.get(&format!("/api/v1/achievements/{}", id), &lecturer)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["data"]["status"], "draft");
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;

    let response = test::call_service(
        &service,
        test::TestRequest::get().uri("/api/v1/achievements").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn students_cannot_verify() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();

    let response = test::call_service(
        &service,
        app.patch(
            &format!("/api/v1/achievements/{}/verify", Uuid::new_v4()),
            &student,
        )
        .set_json(json!({ "status": "verified" }))
        .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn lecturers_cannot_author_achievements() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let lecturer = app.token(Uuid::new_v4(), Role::Lecturer);

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &lecturer)
            .set_json(gold_medal())
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn malformed_identifiers_and_bodies_are_bad_requests() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();

    let response = test::call_service(
        &service,
        app.get("/api/v1/achievements/not-a-uuid", &student)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"title\": ")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["success"], false);

    let response = test::call_service(
        &service,
        app.get("/api/v1/achievements?status=archived", &student)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_achievement_is_not_found() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();

    let response = test::call_service(
        &service,
        app.get(&format!("/api/v1/achievements/{}", Uuid::new_v4()), &student)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn own_listing_only_contains_live_achievements_of_the_caller() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();
    let other = app.student_token();

    let mut ids = Vec::new();
    for token in [&student, &student, &other] {
        let response = test::call_service(
            &service,
            app.post("/api/v1/achievements", token)
                .set_json(gold_medal())
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(response).await;
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let response = test::call_service(
        &service,
        app.delete(&format!("/api/v1/achievements/{}", ids[0]), &student)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test::call_service(
        &service,
        app.get("/api/v1/achievements/achiev", &student)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    let listed = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|reference| reference["id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(listed, vec![ids[1].clone()]);
}

#[actix_web::test]
async fn attachments_are_stored_and_linked() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .set_json(gold_medal())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = test::call_service(
        &service,
        app.post(&format!("/api/v1/achievements/{}/attachments", id), &student)
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body("certificate.PDF", "%PDF-1.4 medal"))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["data"]["mime_type"], "application/pdf");
    assert!(body["data"]["url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost/uploads/"));

    let response = test::call_service(
        &service,
        app.get(&format!("/api/v1/achievements/{}", id), &student)
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(response).await;
    assert_eq!(
        body["data"]["detail"]["attachments"][0]["file_name"],
        "certificate.PDF"
    );
}

#[actix_web::test]
async fn disallowed_attachment_types_are_rejected() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .set_json(gold_medal())
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = test::call_service(
        &service,
        app.post(&format!("/api/v1/achievements/{}/attachments", id), &student)
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(multipart_body("payload.exe", "MZ"))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
