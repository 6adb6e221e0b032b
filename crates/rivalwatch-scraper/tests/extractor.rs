//! Integration tests for `Extractor` against a local `wiremock` server.

use std::time::{Duration, Instant};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rivalwatch_core::{CompetitorConfig, Platform, SourceMethod};
use rivalwatch_scraper::{ExtractionFailure, Extractor, ExtractorConfig, RequestGate};

const CHANGELOG_HTML: &str = r#"<!doctype html>
<html>
  <head><title>Changelog</title><style>body { margin: 0 }</style></head>
  <body>
    <header><a href="/">Home</a><a href="/pricing">Pricing</a></header>
    <main>
      <h1>Changelog</h1>
      <article>
        <h2>Triage Intelligence</h2>
        <p>Linear now suggests assignees, labels and projects for incoming issues.</p>
        <ul><li>Suggestions appear inline in the triage view</li><li>Accept all with one shortcut</li></ul>
      </article>
    </main>
    <footer>&copy; Linear Orbit, Inc.</footer>
  </body>
</html>"#;

/// Builds an extractor with a short timeout, the default content bounds and
/// a zero-interval gate so tests do not wait on each other.
fn test_extractor() -> Extractor {
    test_extractor_with(RequestGate::new(Duration::ZERO), 2)
}

fn test_extractor_with(gate: RequestGate, timeout_secs: u64) -> Extractor {
    let config = ExtractorConfig {
        timeout_secs,
        user_agent: "rivalwatch-test/0.1".to_string(),
        min_content_chars: 50,
        max_content_chars: 10_000,
    };
    Extractor::new(&config, gate).expect("failed to build test Extractor")
}

async fn serve_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extracts_main_content_as_scraped_update() {
    let server = MockServer::start().await;
    serve_html(&server, "/changelog", CHANGELOG_HTML).await;

    let competitor = CompetitorConfig::new(
        "Linear",
        format!("{}/changelog", server.uri()),
        "Project Management",
    );
    let update = test_extractor()
        .extract(&competitor)
        .await
        .expect("extraction should succeed");

    assert_eq!(update.competitor, "Linear");
    assert_eq!(update.method, SourceMethod::Scraped);
    assert_eq!(update.source_url, competitor.url);
    assert!(update.text.contains("Triage Intelligence"));
    assert!(update.text.contains("- Suggestions appear inline in the triage view"));
    assert!(!update.text.contains("Pricing"), "header nav must be stripped");
    assert!(!update.text.contains("Orbit"), "footer must be stripped");
}

#[tokio::test]
async fn linear_platform_rules_drop_short_and_header_lines() {
    let server = MockServer::start().await;
    serve_html(&server, "/changelog", CHANGELOG_HTML).await;

    let update = test_extractor()
        .extract_url(
            "Linear",
            &format!("{}/changelog", server.uri()),
            Platform::Linear,
        )
        .await
        .expect("extraction should succeed");

    let lines: Vec<&str> = update.text.lines().collect();
    assert!(!lines.contains(&"Changelog"), "got: {lines:?}");
    assert_eq!(lines[0], "Triage Intelligence");
    assert_eq!(lines.last(), Some(&"- Accept all with one shortcut"));
}

#[tokio::test]
async fn long_pages_are_truncated() {
    let server = MockServer::start().await;
    let body = format!("<main><p>{}</p></main>", "release ".repeat(3_000));
    serve_html(&server, "/long", &body).await;

    let config = ExtractorConfig {
        timeout_secs: 2,
        user_agent: "rivalwatch-test/0.1".to_string(),
        min_content_chars: 50,
        max_content_chars: 200,
    };
    let extractor = Extractor::new(&config, RequestGate::new(Duration::ZERO)).unwrap();
    let update = extractor
        .extract_url("Acme", &format!("{}/long", server.uri()), Platform::Generic)
        .await
        .unwrap();

    assert!(update.text.ends_with("... [content truncated]"));
    assert_eq!(
        update.text.chars().count(),
        200 + "... [content truncated]".chars().count()
    );
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/changelog"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_extractor()
        .extract_url(
            "Linear",
            &format!("{}/changelog", server.uri()),
            Platform::Linear,
        )
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExtractionFailure::UnexpectedStatus { status: 503, .. }),
        "expected UnexpectedStatus(503), got: {err:?}"
    );
}

#[tokio::test]
async fn near_empty_page_is_too_short() {
    let server = MockServer::start().await;
    serve_html(&server, "/spa", "<html><body><div id=\"root\"></div><p>Loading</p></body></html>").await;

    let err = test_extractor()
        .extract_url("Figma", &format!("{}/spa", server.uri()), Platform::Generic)
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExtractionFailure::TooShort { chars: 7, min: 50, .. }),
        "expected TooShort, got: {err:?}"
    );
}

#[tokio::test]
async fn unreachable_host_is_http_failure() {
    // Bind then drop a server so the port is very likely closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let err = test_extractor()
        .extract_url("Linear", &format!("{uri}/changelog"), Platform::Linear)
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExtractionFailure::Http { .. } | ExtractionFailure::Timeout { .. }),
        "expected a transport failure, got: {err:?}"
    );
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(CHANGELOG_HTML)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = test_extractor_with(RequestGate::new(Duration::ZERO), 1)
        .extract_url("Slack", &format!("{}/slow", server.uri()), Platform::Generic)
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExtractionFailure::Timeout { .. }),
        "expected Timeout, got: {err:?}"
    );
}

#[tokio::test]
async fn invalid_url_never_hits_the_network() {
    let err = test_extractor()
        .extract_url("Broken", "mailto:team@example.com", Platform::Generic)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionFailure::InvalidUrl { .. }));
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn consecutive_fetches_respect_the_gate() {
    let server = MockServer::start().await;
    serve_html(&server, "/changelog", CHANGELOG_HTML).await;
    let url = format!("{}/changelog", server.uri());

    let extractor = test_extractor_with(RequestGate::from_millis(150), 2);
    extractor
        .extract_url("Linear", &url, Platform::Generic)
        .await
        .unwrap();
    let first_done = Instant::now();
    extractor
        .extract_url("Linear", &url, Platform::Generic)
        .await
        .unwrap();

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    // The second dispatch waited for the gate even though the first request
    // had already completed.
    assert!(first_done.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn failures_still_consume_a_gate_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let gate = RequestGate::from_millis(150);
    let extractor = test_extractor_with(gate.clone(), 2);
    let _ = extractor
        .extract_url("Gone", &format!("{}/gone", server.uri()), Platform::Generic)
        .await;

    let start = Instant::now();
    gate.wait_if_needed().await;
    assert!(start.elapsed() >= Duration::from_millis(100));
}
