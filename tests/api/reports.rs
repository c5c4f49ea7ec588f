use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::helpers::TestApp;
use student_achievements::core::policy::Role;

#[actix_web::test]
async fn statistics_are_limited_to_lecturers_and_admins() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let student = app.student_token();
    let admin = app.token(Uuid::new_v4(), Role::Admin);

    let response = test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .set_json(json!({ "type": "organization", "title": "Student council chair" }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = test::call_service(
        &service,
        app.get("/api/v1/reports/statistics", &student).to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = test::call_service(
        &service,
        app.get("/api/v1/reports/statistics", &admin).to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["data"]["total_students"], 1);
    assert_eq!(body["data"]["total_achievements"], 1);
    assert_eq!(body["data"]["achievement_stats"]["draft"], 1);
}

#[actix_web::test]
async fn student_report_lists_that_students_achievements() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;
    let user_id = Uuid::new_v4();
    let profile = app.stores.add_student(user_id);
    let student = app.token(user_id, Role::Student);
    let lecturer = app.token(Uuid::new_v4(), Role::Lecturer);

    test::call_service(
        &service,
        app.post("/api/v1/achievements", &student)
            .set_json(json!({ "type": "certification", "title": "Cloud practitioner" }))
            .to_request(),
    )
    .await;

    let response = test::call_service(
        &service,
        app.get(&format!("/api/v1/reports/student/{}", profile.id), &lecturer)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["data"]["total_achievements"], 1);
    assert_eq!(body["data"]["student"]["student_number"], profile.student_number);

    let response = test::call_service(
        &service,
        app.get(&format!("/api/v1/reports/student/{}", Uuid::new_v4()), &lecturer)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn health_check_answers_without_a_token() {
    let app = TestApp::new();
    let service = test::init_service(app.app()).await;

    let response = test::call_service(
        &service,
        test::TestRequest::get()
            .uri("/api/v1/health_check")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
