use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use cotiza_scraper::browser::HttpBrowser;
use cotiza_scraper::{ScraperOptions, SessionProfile, Viewport};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const SELECTOS_PAGE: &str = r#"<html><body><ul>
  <li class="item-producto">
    <a href="/products/cafe-coscafe-400g"><img src="/img/cafe.jpg"></a>
    <h5 class="prod-nombre"><a href="/products/cafe-coscafe-400g">Café Coscafé molido 400g</a></h5>
    <span class="precio-price">$4.75</span>
  </li>
</ul></body></html>"#;

/// Points every store at `base` through the static HTTP driver.
fn state(base: &str) -> AppState {
    let ctx = ScrapeContext {
        browser: Arc::new(HttpBrowser::new().expect("http client")),
        profile: SessionProfile {
            user_agent: "cotiza-test/0.1".to_string(),
            accept_language: "es-ES".to_string(),
            viewport: Viewport::default(),
            hide_webdriver: false,
        },
        options: ScraperOptions {
            base_url: Some(url::Url::parse(base).expect("base url")),
            navigation_timeout: Duration::from_secs(5),
            ..ScraperOptions::default()
        },
    };
    AppState::new(ctx, cotiza_core::default_branches())
}

/// Nothing listens on the discard port, so every scrape comes back empty.
fn offline_state() -> AppState {
    state("http://127.0.0.1:9")
}

fn open_auth() -> AuthState {
    AuthState::from_keys("", true).expect("auth")
}

async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).expect("json parse");
    (status, json)
}

// -------------------------------------------------------------------------
// Errors
// -------------------------------------------------------------------------

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("not_found", StatusCode::NOT_FOUND),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "x").into_response();
        assert_eq!(response.status(), status, "{code}");
    }
}

// -------------------------------------------------------------------------
// Routes
// -------------------------------------------------------------------------

#[tokio::test]
async fn health_is_public() {
    let auth = AuthState::from_keys("tok", false).expect("auth");
    let app = build_app(offline_state(), auth, default_rate_limit_state());
    let (status, json) = get(app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn unknown_store_is_not_found() {
    let app = build_app(offline_state(), open_auth(), default_rate_limit_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/scrape/amazon?query=tv")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["error"]["code"], "not_found");
    assert_eq!(json["meta"]["request_id"], "req-42");
}

#[tokio::test]
async fn missing_or_blank_query_is_bad_request() {
    for uri in ["/scrape/siman", "/scrape/siman?query=", "/scrape/siman?query=%20%20"] {
        let app = build_app(offline_state(), open_auth(), default_rate_limit_state());
        let (status, json) = get(app, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn failed_scrape_is_an_empty_success() {
    let app = build_app(offline_state(), open_auth(), default_rate_limit_state());
    let (status, json) = get(app, "/scrape/curacao?query=lavadora", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "results": [] }));
}

#[tokio::test]
async fn scrape_returns_store_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("keyword", "café molido"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SELECTOS_PAGE, "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let app = build_app(state(&server.uri()), open_auth(), default_rate_limit_state());
    let (status, json) = get(app, "/scrape/SELECTOS?query=caf%C3%A9%20molido", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json.get("user").is_none());
    let results = json["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["store"], "Super Selectos");
    assert_eq!(results[0]["name"], "Café Coscafé molido 400g");
    assert_eq!(results[0]["price_original"], "$4.75");
    assert_eq!(
        results[0]["url"],
        format!("{}/products/cafe-coscafe-400g", server.uri())
    );
    assert!(results[0].get("stores_count").is_none());
}

// -------------------------------------------------------------------------
// Middleware
// -------------------------------------------------------------------------

#[tokio::test]
async fn bearer_auth_guards_scrape_and_reports_user() {
    let auth = AuthState::from_keys("ana:tok-ana,tok-bare", false).expect("auth");

    let app = build_app(offline_state(), auth.clone(), default_rate_limit_state());
    let (status, json) = get(app, "/scrape/vidri?query=martillo", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let app = build_app(offline_state(), auth.clone(), default_rate_limit_state());
    let (status, _) = get(app, "/scrape/vidri?query=martillo", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let app = build_app(offline_state(), auth.clone(), default_rate_limit_state());
    let (status, json) = get(app, "/scrape/selectos?query=arroz", Some("tok-ana")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"], "ana");
    assert_eq!(json["results"], serde_json::json!([]));

    let app = build_app(offline_state(), auth, default_rate_limit_state());
    let (status, json) = get(app, "/scrape/selectos?query=arroz", Some("tok-bare")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("user").is_none());
}

#[tokio::test]
async fn rate_limit_rejects_past_the_window_budget() {
    let app = build_app(
        offline_state(),
        open_auth(),
        RateLimitState::new(1, Duration::from_secs(60)),
    );

    let (first, _) = get(app.clone(), "/scrape/selectos?query=arroz", None).await;
    assert_eq!(first, StatusCode::OK);

    let (second, json) = get(app.clone(), "/scrape/selectos?query=arroz", None).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");

    let (health, _) = get(app, "/health", None).await;
    assert_eq!(health, StatusCode::OK);
}
