
use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};
use uuid::Uuid;

use test_utils::TestApp;

#[actix_rt::test]
async fn admin_routes_reject_regular_users() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.token_for(&Uuid::new_v4());

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/account-types")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn admin_creates_and_lists_account_types() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.admin_token();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/account-types")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "name": "Enterprise",
            "allow_200px": true,
            "allow_400px": true,
            "allow_original_size_link": true,
            "allow_custom_size": true,
            "allow_time_limited_link": true,
            "custom_sizes": [1000, 500]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["name"], "Enterprise");
    assert_eq!(created["custom_sizes"], json!([500, 1000]));

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/account-types/")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["id"], created["id"]);
}

#[actix_rt::test]
async fn duplicate_account_type_name_conflicts() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.admin_token();

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let req = test::TestRequest::post()
            .uri("/api/v1/admin/account-types")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "name": "Basic", "allow_200px": true }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);
    }
}

#[actix_rt::test]
async fn custom_sizes_require_original_size_permission() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.admin_token();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/account-types")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "name": "Broken",
            "allow_custom_size": true,
            "custom_sizes": [500]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn malformed_json_is_a_validation_error() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.admin_token();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/account-types")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "non_field_errors");
}

#[actix_rt::test]
async fn admin_assigns_and_clears_account_type() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.admin_token();
    let type_id = test_app.store.add_account_type(true, &[]);
    let user_id = Uuid::new_v4();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/profiles/{}/account-type", user_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "account_type_id": type_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let profile: Value = test::read_body_json(resp).await;
    assert_eq!(profile["user_id"], user_id.to_string());
    assert_eq!(profile["account_type_id"], type_id.to_string());

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/profiles/{}/account-type", user_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "account_type_id": null }))
        .to_request();
    let profile: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(profile["account_type_id"], Value::Null);
}

#[actix_rt::test]
async fn assigning_unknown_account_type_is_not_found() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.admin_token();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/profiles/{}/account-type", Uuid::new_v4()))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "account_type_id": Uuid::new_v4() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn public_endpoints_need_no_token() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["status"].is_string());
    assert!(body["version"].is_string());
}

#[actix_rt::test]
async fn tampered_tokens_are_rejected() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let mut token = test_app.token_for(&Uuid::new_v4());
    token.push('x');

    let req = test::TestRequest::get()
        .uri("/api/v1/images")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
