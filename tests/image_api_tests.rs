
use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use thumbnail_service::entities::image::DerivedImage;

use test_utils::{multipart_body, multipart_content_type, png_part, slug_of, Part, TestApp, BASE_URL};

fn upload_request(token: &str, uri: &str, parts: Vec<Part<'_>>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(multipart_content_type())
        .set_payload(multipart_body(parts))
}

fn thumbnail_slugs(body: &Value) -> Vec<String> {
    body["thumbnails"]
        .as_object()
        .expect("thumbnails object")
        .values()
        .map(|url| slug_of(url.as_str().expect("url string")).to_string())
        .collect()
}

#[actix_rt::test]
async fn upload_with_every_permission_returns_all_thumbnails() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[500, 1000]);

    let req = upload_request(&token, "/api/v1/images", vec![png_part(840, 680)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["width"], 840);
    assert_eq!(body["height"], 680);

    let thumbnails = body["thumbnails"].as_object().expect("thumbnails object");
    let mut labels: Vec<&str> = thumbnails.keys().map(String::as_str).collect();
    labels.sort();
    assert_eq!(labels, vec!["1000x1000", "200x200", "400x400", "500x500", "840x680"]);

    for url in thumbnails.values() {
        let url = url.as_str().expect("url string");
        assert!(url.starts_with(&format!("{}/i/", BASE_URL)), "unexpected url {}", url);
        assert!(url.ends_with('/'));
        assert_eq!(slug_of(url).len(), 15);
    }

    let source_id: Uuid = body["id"].as_str().and_then(|id| id.parse().ok()).expect("source id");
    let derived = test_app.store.derived_for(source_id);
    assert_eq!(derived.len(), 5);
    for image in &derived {
        assert!(image.expire_at.is_none());
        assert!(test_app.media_dir.path().join(&image.file_key).exists());
    }
}

#[actix_rt::test]
async fn generated_thumbnails_have_requested_dimensions() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let req = upload_request(&token, "/api/v1/images", vec![png_part(840, 680)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let source = test_app.store.first_source().expect("source stored");
    for image in test_app.store.derived_for(source.id) {
        let path = test_app.media_dir.path().join(&image.file_key);
        let (w, h) = image::image_dimensions(&path).expect("thumbnail readable");
        assert_eq!(format!("{}x{}", w, h), image.variant_type);
    }
}

#[actix_rt::test]
async fn upload_without_account_type_keeps_source_only() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.user_with_type(None);

    let req = upload_request(&token, "/api/v1/images", vec![png_part(300, 300)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["thumbnails"], serde_json::json!({}));
    assert_eq!(test_app.store.source_count(), 1);
    assert_eq!(test_app.store.derived_count(), 0);
}

#[actix_rt::test]
async fn upload_provisions_profile_on_first_request() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let token = test_app.token_for(&Uuid::new_v4());

    let req = upload_request(&token, "/api/v1/images", vec![png_part(64, 64)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(test_app.store.derived_count(), 0);
}

#[actix_rt::test]
async fn upload_rejects_disallowed_extension() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let gif = Part::File {
        name: "file",
        file_name: "animation.gif",
        content_type: "image/gif",
        bytes: b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec(),
    };
    let req = upload_request(&token, "/api/v1/images", vec![gif]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "file");
    assert_eq!(test_app.store.source_count(), 0);
}

#[actix_rt::test]
async fn upload_over_size_limit_is_a_file_error() {
    let test_app = TestApp::with_max_upload_bytes(1024);
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let oversized = Part::File {
        name: "file",
        file_name: "huge.png",
        content_type: "image/png",
        bytes: vec![0u8; 128 * 1024],
    };
    let req = upload_request(&token, "/api/v1/images", vec![oversized]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "file");
    assert_eq!(body["details"][0]["message"], "File size exceeds maximum allowed.");
    assert_eq!(test_app.store.source_count(), 0);
}

#[actix_rt::test]
async fn upload_without_file_is_a_field_error() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let req = upload_request(&token, "/api/v1/images", vec![Part::Text { name: "note", value: "x" }]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "file");
    assert_eq!(body["details"][0]["message"], "No file was submitted.");
}

#[actix_rt::test]
async fn timed_upload_reports_each_missing_field() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let req = upload_request(&token, "/api/v1/images/timed", vec![png_part(300, 300)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    let details = body["details"].as_array().expect("details array");
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["field"], "expire_time");
    assert_eq!(details[0]["message"], "This field is required.");
    assert_eq!(details[1]["field"], "type");
    assert_eq!(details[1]["message"], "This field is required.");
    assert_eq!(test_app.store.source_count(), 0);
}

#[actix_rt::test]
async fn timed_upload_rejects_non_integer_fields() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let parts = vec![
        png_part(300, 300),
        Part::Text { name: "type", value: "large" },
        Part::Text { name: "expire_time", value: "600" },
    ];
    let resp = test::call_service(&app, upload_request(&token, "/api/v1/images/timed", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "type");
    assert_eq!(body["details"][0]["message"], "A valid integer is required.");
}

#[actix_rt::test]
async fn timed_upload_rejects_expire_time_below_minimum() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let parts = vec![
        png_part(300, 300),
        Part::Text { name: "type", value: "200" },
        Part::Text { name: "expire_time", value: "299" },
    ];
    let resp = test::call_service(&app, upload_request(&token, "/api/v1/images/timed", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"][0]["field"], "expire_time");
    assert_eq!(test_app.store.source_count(), 0);
    assert_eq!(test_app.store.derived_count(), 0);
}

#[actix_rt::test]
async fn timed_upload_without_permission_writes_nothing() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let type_id = test_app.store.add_account_type(true, &[]);
    test_app.store.update_account_type(type_id, |t| t.allow_time_limited_link = false);
    let (_, token) = test_app.user_with_type(Some(type_id));

    let parts = vec![
        png_part(300, 300),
        Part::Text { name: "type", value: "200" },
        Part::Text { name: "expire_time", value: "600" },
    ];
    let resp = test::call_service(&app, upload_request(&token, "/api/v1/images/timed", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Your profile type does not have permission to create time limited or this type of thumbnail"
    );
    assert_eq!(test_app.store.source_count(), 0);
    assert_eq!(test_app.store.derived_count(), 0);
}

#[actix_rt::test]
async fn timed_upload_rejects_size_outside_custom_list() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[500]);

    let parts = vec![
        png_part(300, 300),
        Part::Text { name: "type", value: "750" },
        Part::Text { name: "expire_time", value: "600" },
    ];
    let resp = test::call_service(&app, upload_request(&token, "/api/v1/images/timed", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(test_app.store.source_count(), 0);
}

#[actix_rt::test]
async fn timed_upload_with_unlisted_large_size_is_forbidden() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[500]);

    let parts = vec![
        png_part(300, 300),
        Part::Text { name: "type", value: "5000" },
        Part::Text { name: "expire_time", value: "300" },
    ];
    let resp = test::call_service(&app, upload_request(&token, "/api/v1/images/timed", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "Your profile type does not have permission to create time limited or this type of thumbnail"
    );
    assert_eq!(test_app.store.source_count(), 0);
}

#[actix_rt::test]
async fn timed_upload_creates_single_expiring_thumbnail() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[500]);

    let parts = vec![
        png_part(640, 480),
        Part::Text { name: "type", value: "500" },
        Part::Text { name: "expire_time", value: "600" },
    ];
    let resp = test::call_service(&app, upload_request(&token, "/api/v1/images/timed", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let thumbnails = body["thumbnails"].as_object().expect("thumbnails object");
    assert_eq!(thumbnails.len(), 1);
    assert!(thumbnails.contains_key("500"));

    let source_id: Uuid = body["id"].as_str().and_then(|id| id.parse().ok()).expect("source id");
    let derived = test_app.store.derived_for(source_id);
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].expire_duration, Some(600));
    assert_eq!(derived[0].expire_at, Some(derived[0].created_at + Duration::seconds(600)));
}

#[actix_rt::test]
async fn display_page_renders_live_and_expired_links() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let req = upload_request(&token, "/api/v1/images", vec![png_part(300, 300)]).to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let slug = thumbnail_slugs(&body).remove(0);

    let req = test::TestRequest::get().uri(&format!("/i/{}/", slug)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).expect("utf8 page");
    assert!(page.contains(r#"data-expired="false""#));
    assert!(page.contains(&ammonia::clean_text(&format!("{}/media/", BASE_URL))));

    let source = test_app.store.first_source().expect("source stored");
    let created_at = Utc::now() - Duration::seconds(900);
    test_app.store.push_derived(DerivedImage {
        id: Uuid::new_v4(),
        source_image_id: source.id,
        variant_type: "200".into(),
        file_key: format!("profile_{}/thumbnails/old.png", source.profile_id),
        slug: "ExpiredSlug0001".into(),
        expire_duration: Some(300),
        expire_at: Some(created_at + Duration::seconds(300)),
        created_at,
    });

    let req = test::TestRequest::get().uri("/i/ExpiredSlug0001/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).expect("utf8 page");
    assert!(page.contains(r#"data-expired="true""#));
    assert!(page.contains("This link has expired."));
}

#[actix_rt::test]
async fn display_unknown_slug_is_not_found() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);

    let req = test::TestRequest::get().uri("/i/NoSuchSlug00000/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn images_of_other_profiles_are_hidden() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, owner_token) = test_app.premium_user(&[]);
    let (_, other_token) = test_app.premium_user(&[]);

    let req = upload_request(&owner_token, "/api/v1/images", vec![png_part(300, 300)]).to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let image_id = body["id"].as_str().expect("source id").to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/images/{}", image_id))
        .insert_header(("Authorization", format!("Bearer {}", owner_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["thumbnails"].as_array().map(Vec::len), Some(3));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/images/{}", image_id))
        .insert_header(("Authorization", format!("Bearer {}", other_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/v1/images")
        .insert_header(("Authorization", format!("Bearer {}", other_token)))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body, serde_json::json!([]));
}

#[actix_rt::test]
async fn malformed_image_id_is_not_found() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, token) = test_app.premium_user(&[]);

    let req = test::TestRequest::get()
        .uri("/api/v1/images/not-a-uuid")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn requests_without_token_are_unauthorized() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);

    let req = test::TestRequest::get().uri("/api/v1/images").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/images")
        .insert_header(multipart_content_type())
        .set_payload(multipart_body(vec![png_part(10, 10)]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(test_app.store.source_count(), 0);
}

#[actix_rt::test]
async fn delete_is_refused_while_thumbnails_exist() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, premium_token) = test_app.premium_user(&[]);
    let (_, basic_token) = test_app.user_with_type(None);

    let req = upload_request(&premium_token, "/api/v1/images", vec![png_part(300, 300)]).to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let protected_id = body["id"].as_str().expect("source id").to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/images/{}", protected_id))
        .insert_header(("Authorization", format!("Bearer {}", premium_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = upload_request(&basic_token, "/api/v1/images", vec![png_part(300, 300)]).to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let bare_id = body["id"].as_str().expect("source id").to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/images/{}", bare_id))
        .insert_header(("Authorization", format!("Bearer {}", basic_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(test_app.store.source_count(), 1);
}

#[actix_rt::test]
async fn concurrent_uploads_keep_thumbnails_with_their_source() {
    let test_app = TestApp::new();
    let app = init_app!(test_app);
    let (_, first_token) = test_app.premium_user(&[500]);
    let (_, second_token) = test_app.premium_user(&[]);

    let first = upload_request(&first_token, "/api/v1/images", vec![png_part(840, 680)]).to_request();
    let second = upload_request(&second_token, "/api/v1/images", vec![png_part(320, 240)]).to_request();
    let (first, second) = futures::join!(test::call_service(&app, first), test::call_service(&app, second));
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(second.status(), StatusCode::CREATED);

    for body in [test::read_body_json::<Value, _>(first).await, test::read_body_json::<Value, _>(second).await] {
        let source_id: Uuid = body["id"].as_str().and_then(|id| id.parse().ok()).expect("source id");
        let mut stored: Vec<String> = test_app.store.derived_for(source_id).into_iter().map(|d| d.slug).collect();
        let mut returned = thumbnail_slugs(&body);
        stored.sort();
        returned.sort();
        assert_eq!(stored, returned);
    }
    assert_eq!(test_app.store.derived_count(), 4 + 3);
}
