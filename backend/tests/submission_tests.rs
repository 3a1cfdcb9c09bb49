mod common;

use chug_backend::catalog::mock::MockCatalog;
use chug_backend::object_storage::mock::MockObjectStorage;
use common::*;

use http::StatusCode;

fn complete_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("contact[handle_text]", "@fastchugger"),
        ("contact[container]", "can"),
        ("contact[leaderboard_type]", "RAB"),
        ("contact[leaderboard_name]", "Acme Brewing"),
        (
            "contact[video_upload_url]",
            "https://f000.backblazeb2.com/file/chug-videos/submissions/1-clip.mp4",
        ),
        ("contact[time_s]", "12.34"),
        ("contact[volume_oz]", "16"),
    ]
}

#[tokio::test]
async fn test_submit_creates_unverified_entry() {
    let setup = TestSetup::new();

    let response = setup
        .send_form_request("/submit-chug", &complete_form())
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);

    let id = body["metaobject"]["id"].as_str().unwrap();
    assert!(body["metaobject"]["handle"].is_string());

    let stored = setup.catalog.get(id).expect("entry not created");
    assert_eq!(stored.fields["verified"], "false");
    assert_eq!(stored.fields["handle_text"], "@fastchugger");
    assert_eq!(stored.fields["leaderboard_name"], "Acme Brewing");
    assert_eq!(
        stored.fields["video_url"],
        "https://f000.backblazeb2.com/file/chug-videos/submissions/1-clip.mp4"
    );
    assert_eq!(stored.fields["time_to_rim_s"], "0.25");
    assert_eq!(stored.fields["time_to_setdown_s"], "0.25");
    assert_eq!(stored.fields["splash_pct"], "0.0");
    assert_eq!(stored.fields["foam_pct"], "0.0");
    assert!(chrono::DateTime::parse_from_rfc3339(&stored.fields["date_iso"]).is_ok());
}

#[tokio::test]
async fn test_submit_cannot_self_verify() {
    let setup = TestSetup::new();
    let mut form = complete_form();
    form.push(("contact[verified]", "true"));

    let response = setup.send_form_request("/submit-chug", &form).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let stored = setup
        .catalog
        .get(body["metaobject"]["id"].as_str().unwrap())
        .unwrap();
    assert_eq!(stored.fields["verified"], "false");
}

#[tokio::test]
async fn test_submit_without_video_is_rejected() {
    let setup = TestSetup::new();

    let response = setup
        .send_form_request(
            "/submit-chug",
            &[
                ("contact[handle_text]", "@fastchugger"),
                ("contact[container]", "can"),
                ("contact[leaderboard_type]", "RAB"),
                ("contact[time_s]", "12.34"),
                ("contact[volume_oz]", "16"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "Missing required fields: video_url");
    assert!(setup.catalog.get("gid://shopify/Metaobject/1").is_none());
}

#[tokio::test]
async fn test_submit_with_blank_fields_is_rejected() {
    let setup = TestSetup::new();
    let form: Vec<_> = complete_form()
        .into_iter()
        .map(|(key, value)| {
            if key == "contact[volume_oz]" {
                (key, "   ")
            } else {
                (key, value)
            }
        })
        .collect();

    let response = setup.send_form_request("/submit-chug", &form).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["details"]["missing"][0], "volume_oz");
}

#[tokio::test]
async fn test_submit_catalog_unavailable() {
    let setup = TestSetup::with_upstreams(
        MockObjectStorage::new(UPLOAD_TIMESTAMP_MS),
        MockCatalog::unavailable(),
    );

    let response = setup
        .send_form_request("/submit-chug", &complete_form())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "Internal server error");
}
