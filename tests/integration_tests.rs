use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use clap::Parser;
use http_body_util::BodyExt;
use portfolio_api::{config::Config, create_app, token};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower::ServiceExt;

const BROWSER: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Firefox/121.0";
const PDF: &[u8] = b"%PDF-1.7 test resume";

struct TestApp {
    app: Router,
    resume: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.resume);
    }
}

fn test_app(write_resume: bool) -> TestApp {
    test_app_with(write_resume, &["--trust-proxy-headers", "false"])
}

fn test_app_with(write_resume: bool, extra: &[&str]) -> TestApp {
    let resume = std::env::temp_dir().join(format!("resume-{}.pdf", uuid::Uuid::new_v4()));
    if write_resume {
        std::fs::write(&resume, PDF).unwrap();
    }

    let mut argv = vec![
        "portfolio-api",
        "--resume-path",
        resume.to_str().unwrap(),
        "--resume-filename",
        "Jane_Doe_Resume.pdf",
        "--knowledge-dir",
        "/nonexistent/knowledge",
        "--gemini-api-key",
        "",
    ];
    argv.extend_from_slice(extra);
    let config = Config::parse_from(argv);

    TestApp {
        app: create_app(config).unwrap(),
        resume,
    }
}

fn download_request(token: &str, client: [u8; 4], user_agent: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("GET")
        .uri(format!("/api/resume/download?token={token}"))
        .header(header::USER_AGENT, user_agent)
        .body(Body::empty())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((client, 40000))));
    request
}

fn fresh_token() -> String {
    token::encode(chrono::Utc::now().timestamp_millis())
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_download_admitted_with_headers() {
    let test = test_app(true);

    let response = test
        .app
        .clone()
        .oneshot(download_request(&fresh_token(), [10, 0, 0, 1], BROWSER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=Jane_Doe_Resume.pdf"
    );
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], PDF);
}

#[tokio::test]
async fn test_download_rejects_bad_and_missing_tokens() {
    let test = test_app(true);

    let response = test
        .app
        .clone()
        .oneshot(download_request("not-a-number-base64", [10, 0, 0, 1], BROWSER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "invalid_token");

    let mut request = download_request("", [10, 0, 0, 1], BROWSER);
    *request.uri_mut() = "/api/resume/download".parse().unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_download_rejects_bots() {
    let test = test_app(true);

    let response = test
        .app
        .clone()
        .oneshot(download_request(&fresh_token(), [10, 0, 0, 1], "curl/8.4.0"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "automated_client");
    assert!(body["detail"].as_str().unwrap().contains("web browser"));
}

#[tokio::test]
async fn test_stale_token_reported_before_bot() {
    let test = test_app(true);
    let stale = token::encode(chrono::Utc::now().timestamp_millis() - 2 * 3_600_000);

    let response = test
        .app
        .clone()
        .oneshot(download_request(&stale.replace('=', "%3D"), [10, 0, 0, 1], "Googlebot"))
        .await
        .unwrap();

    assert_eq!(json_body(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_download_rate_limited_per_address() {
    let test = test_app(true);

    for _ in 0..3 {
        let response = test
            .app
            .clone()
            .oneshot(download_request(&fresh_token(), [10, 0, 0, 7], BROWSER))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = test
        .app
        .clone()
        .oneshot(download_request(&fresh_token(), [10, 0, 0, 7], BROWSER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(json_body(response).await["error"], "rate_limited");

    let response = test
        .app
        .clone()
        .oneshot(download_request(&fresh_token(), [10, 0, 0, 8], BROWSER))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_prefix_still_rate_limited() {
    let test = test_app_with(true, &["--trust-proxy-headers", "true"]);
    let mut admitted = 0;

    for i in 0..10 {
        let mut request = download_request(&fresh_token(), [10, 0, 0, 1], BROWSER);
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("1.1.1.{i}, 203.0.113.9").parse().unwrap(),
        );

        let response = test.app.clone().oneshot(request).await.unwrap();
        if response.status() == StatusCode::OK {
            admitted += 1;
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }

    assert_eq!(admitted, 3);
}

#[tokio::test]
async fn test_download_missing_resume() {
    let test = test_app(false);

    let response = test
        .app
        .clone()
        .oneshot(download_request(&fresh_token(), [10, 0, 0, 1], BROWSER))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "resource_missing");
}

#[tokio::test]
async fn test_resume_preview() {
    let test = test_app(true);

    let response = test
        .app
        .clone()
        .oneshot(
            Request::get("/api/resume/preview")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["available"], true);
    assert_eq!(body["filename"], "Jane_Doe_Resume.pdf");
    assert_eq!(body["download_policy"]["max_downloads"], 3);
    assert_eq!(body["download_policy"]["window"], "1h");
}

#[tokio::test]
async fn test_health_and_root() {
    let test = test_app(false);

    let response = test
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["ai_service"], false);

    let response = test
        .app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "operational");
    assert_eq!(body["endpoints"]["resume"], "/api/resume/preview");
}

#[tokio::test]
async fn test_analytics_flow() {
    let test = test_app(false);

    for (client, page) in [([10, 0, 0, 1], "/"), ([10, 0, 0, 1], "/projects"), ([10, 0, 0, 2], "/")] {
        let mut request = Request::post("/api/analytics/visit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "page_visited": page, "user_agent": BROWSER }).to_string(),
            ))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((client, 40000))));

        let response = test.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
    }

    let response = test
        .app
        .clone()
        .oneshot(Request::get("/api/analytics/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let stats = json_body(response).await;
    assert_eq!(stats["total_visitors"], 2);
    assert_eq!(stats["total_visits"], 3);
    assert_eq!(stats["recent_visits"], 3);

    let response = test
        .app
        .clone()
        .oneshot(
            Request::get("/api/analytics/recent?limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let recent = json_body(response).await;
    assert_eq!(recent["visits"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_analytics_rejects_empty_page() {
    let test = test_app(false);

    let response = test
        .app
        .clone()
        .oneshot(
            Request::post("/api/analytics/visit")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"page_visited": ""}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_malformed_bodies_use_error_shape() {
    let test = test_app(false);

    let cases = [
        ("/api/analytics/visit", Some("application/json"), "{}"),
        ("/api/analytics/visit", Some("application/json"), "{not json"),
        ("/api/chat", None, r#"{"message": "Hello"}"#),
    ];

    for (uri, content_type, body) in cases {
        let mut builder = Request::post(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let response = test
            .app
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri} {body}");
        let json = json_body(response).await;
        assert_eq!(json["error"], "validation_error");
        assert!(json["detail"].is_string());
    }
}

#[tokio::test]
async fn test_chat_validation_and_unconfigured_service() {
    let test = test_app(false);

    let response = test
        .app
        .clone()
        .oneshot(
            Request::post("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message": ""}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = test
        .app
        .clone()
        .oneshot(
            Request::post("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message": "What roles are they seeking?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "ai_unavailable");
}

#[tokio::test]
async fn test_chat_examples() {
    let test = test_app(false);

    let response = test
        .app
        .clone()
        .oneshot(Request::get("/api/chat/examples").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(!body["examples"].as_array().unwrap().is_empty());
}
