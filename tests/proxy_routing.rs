//! End-to-end routing and passthrough tests.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn test_longest_prefix_routing() {
    let (user_addr, mut user_rx) = common::start_recording_backend("user", Duration::ZERO).await;
    let (dept_addr, mut dept_rx) = common::start_recording_backend("department", Duration::ZERO).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(user_addr, dept_addr)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/api/v1/departments/42?include=queues", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-upstream"], "department");
    let seen = dept_rx.recv().await.unwrap();
    assert_eq!(seen.path_and_query, "/api/v1/departments/42?include=queues");

    for path in [
        "/api/v1/auth/login",
        "/api/v1/users/me",
        "/api/v1/oauth2/callback",
        "/api/v1/reset-password",
    ] {
        let res = client.get(format!("http://{}{}", gateway, path)).send().await.unwrap();
        assert_eq!(res.headers()["x-upstream"], "user", "path {}", path);
        let seen = user_rx.recv().await.unwrap();
        assert_eq!(seen.path_and_query, path, "path must not be rewritten");
    }

    assert!(dept_rx.try_recv().is_err());
    shutdown.trigger();
}

#[tokio::test]
async fn test_multipart_upload_is_byte_identical() {
    let (user_addr, mut user_rx) = common::start_recording_backend("user", Duration::ZERO).await;
    let dept_addr = common::closed_port().await;
    let mut config = common::gateway_config(user_addr, dept_addr);
    // The local JSON limit must not apply to proxied bodies.
    config.limits.max_body_bytes = 1024;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let boundary = "----QueueGatewayBoundary7MA4YWxkTrZu0gW";
    let content_type = format!("multipart/form-data; boundary={}", boundary);
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nprofile photo\r\n",
            boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"avatar.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary
        )
        .as_bytes(),
    );
    body.extend((0..=255u8).cycle().take(256 * 1024));
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let res = common::client()
        .post(format!("http://{}/api/v1/users/7/avatar", gateway))
        .header(CONTENT_TYPE, &content_type)
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let seen = user_rx.recv().await.unwrap();
    assert_eq!(seen.method, axum::http::Method::POST);
    assert_eq!(seen.headers[axum::http::header::CONTENT_TYPE], content_type.as_str());
    assert_eq!(seen.body.len(), body.len());
    assert!(seen.body[..] == body[..], "forwarded body differs from original");

    shutdown.trigger();
}

#[tokio::test]
async fn test_headers_and_cookies_pass_through() {
    let (user_addr, mut user_rx) = common::start_recording_backend("user", Duration::ZERO).await;
    let dept_addr = common::closed_port().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(user_addr, dept_addr)).await;

    let res = common::client()
        .get(format!("http://{}/api/v1/users/me", gateway))
        .header(COOKIE, "accessToken=eyJhbGciOi; refreshToken=r1")
        .header("authorization", "Bearer abc")
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(res.headers()["set-cookie"], "upstream=1; HttpOnly");

    let seen = user_rx.recv().await.unwrap();
    assert_eq!(seen.headers["cookie"], "accessToken=eyJhbGciOi; refreshToken=r1");
    assert_eq!(seen.headers["authorization"], "Bearer abc");
    assert_eq!(seen.headers["x-forwarded-for"], "203.0.113.7, 127.0.0.1");
    assert_eq!(seen.headers["host"], user_addr.to_string().as_str());
    assert!(seen.headers.get("x-request-id").is_some());

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_status_relayed() {
    let (user_addr, _user_rx) = common::start_recording_backend("user", Duration::ZERO).await;
    let dept_addr = common::closed_port().await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(user_addr, dept_addr)).await;

    let res = common::client()
        .post(format!("http://{}/api/v1/auth/login?status=401", gateway))
        .json(&serde_json::json!({"email": "a@b.c", "password": "wrong"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["service"], "user");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_api_path_is_404_without_upstream_call() {
    let (user_addr, mut user_rx) = common::start_recording_backend("user", Duration::ZERO).await;
    let (dept_addr, mut dept_rx) = common::start_recording_backend("department", Duration::ZERO).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(user_addr, dept_addr)).await;

    let res = common::client()
        .get(format!("http://{}/api/v1/unknown", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(user_rx.try_recv().is_err());
    assert!(dept_rx.try_recv().is_err());

    shutdown.trigger();
}
