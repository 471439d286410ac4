mod common;

use common::TestApp;

#[tokio::test]
async fn allowed_origin_receives_cors_headers() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/", app.address))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(
        "http://localhost:3000",
        response
            .headers()
            .get("access-control-allow-origin")
            .expect("Missing access-control-allow-origin header")
            .to_str()
            .unwrap()
    );
    assert_eq!(
        "true",
        response
            .headers()
            .get("access-control-allow-credentials")
            .expect("Missing access-control-allow-credentials header")
            .to_str()
            .unwrap()
    );
}

#[tokio::test]
async fn disallowed_origin_receives_no_cors_headers() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/", app.address))
        .header("Origin", "https://evil.example")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn preflight_for_convert_allows_post_from_allowed_origin() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/convert", app.address),
        )
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(
        "http://localhost:3000",
        response
            .headers()
            .get("access-control-allow-origin")
            .expect("Missing access-control-allow-origin header")
            .to_str()
            .unwrap()
    );
    assert!(response
        .headers()
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("POST"));
}

#[tokio::test]
async fn configured_origin_list_is_respected() {
    let app = TestApp::spawn_with(|config| {
        config.security.allowed_origins = vec!["https://app.example.com".to_string()];
    })
    .await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/", app.address))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
