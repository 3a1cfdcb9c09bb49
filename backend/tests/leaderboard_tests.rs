mod common;

use chug_backend::catalog::mock::MockCatalog;
use chug_backend::object_storage::mock::MockObjectStorage;
use common::*;

use http::StatusCode;

fn entry_ids(body: &serde_json::Value) -> Vec<&str> {
    body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_leaderboard_by_type_sorted_fastest_first() {
    let setup = TestSetup::new();
    setup.insert_entry(
        "1",
        &[("leaderboard_type", "RAB"), ("verified", "true"), ("time_s", "10.5")],
    );
    setup.insert_entry(
        "2",
        &[("leaderboard_type", "RAB"), ("verified", "true"), ("time_s", "9.2")],
    );

    let response = setup.send_get_request("/leaderboard/RAB").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["leaderboard_type"], "RAB");
    assert_eq!(body["count"], 2);
    assert_eq!(
        entry_ids(&body),
        vec!["gid://shopify/Metaobject/2", "gid://shopify/Metaobject/1"]
    );
    assert_eq!(body["entries"][0]["fields"]["time_s"], "9.2");
    assert!(body["entries"][0]["handle"].is_string());
}

#[tokio::test]
async fn test_leaderboard_by_type_only_lists_verified() {
    let setup = TestSetup::new();
    setup.insert_entry("1", &[("leaderboard_type", "RAB"), ("verified", "true"), ("time_s", "8")]);
    setup.insert_entry("2", &[("leaderboard_type", "RAB"), ("verified", "false"), ("time_s", "7")]);
    setup.insert_entry("3", &[("leaderboard_type", "RAB"), ("verified", "yes"), ("time_s", "6")]);
    setup.insert_entry("4", &[("leaderboard_type", "RAB"), ("time_s", "5")]);
    setup.insert_entry("5", &[("leaderboard_type", "SHOTGUN"), ("verified", "true"), ("time_s", "4")]);

    let response = setup.send_get_request("/leaderboard/RAB").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(entry_ids(&body), vec!["gid://shopify/Metaobject/1"]);
}

#[tokio::test]
async fn test_leaderboard_untimed_entries_last() {
    let setup = TestSetup::new();
    setup.insert_entry("1", &[("leaderboard_type", "RAB"), ("verified", "true")]);
    setup.insert_entry("2", &[("leaderboard_type", "RAB"), ("verified", "true"), ("time_s", "n/a")]);
    setup.insert_entry("3", &[("leaderboard_type", "RAB"), ("verified", "true"), ("time_s", "30")]);

    let response = setup.send_get_request("/leaderboard/RAB").await.unwrap();

    let body = parse_response_body(response).await;
    assert_eq!(entry_ids(&body)[0], "gid://shopify/Metaobject/3");
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_leaderboard_by_name() {
    let setup = TestSetup::new();
    setup.insert_entry(
        "1",
        &[("leaderboard_name", "Acme Brewing"), ("verified", "true"), ("time_s", "11")],
    );
    setup.insert_entry(
        "2",
        &[("leaderboard_name", "Other"), ("verified", "true"), ("time_s", "3")],
    );

    let response = setup
        .send_get_request("/whitelabel/name/Acme%20Brewing")
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["leaderboard_name"], "Acme Brewing");
    assert_eq!(body["count"], 1);
    assert_eq!(entry_ids(&body), vec!["gid://shopify/Metaobject/1"]);
}

#[tokio::test]
async fn test_leaderboard_empty_result() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/leaderboard/RAB").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["entries"], serde_json::json!([]));
}

#[tokio::test]
async fn test_leaderboard_blank_parameter() {
    let setup = TestSetup::new();

    let response = setup.send_get_request("/leaderboard/%20").await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "Missing leaderboard_type");
}

#[tokio::test]
async fn test_leaderboard_catalog_unavailable() {
    let setup = TestSetup::with_upstreams(
        MockObjectStorage::new(UPLOAD_TIMESTAMP_MS),
        MockCatalog::unavailable(),
    );

    let response = setup.send_get_request("/leaderboard/RAB").await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
