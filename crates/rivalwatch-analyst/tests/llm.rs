//! `Summarizer` and `FallbackGenerator` against a mocked chat-completions API.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rivalwatch_analyst::{AnalystError, FallbackGenerator, LlmClient, LlmConfig, Summarizer};
use rivalwatch_core::{CompetitorConfig, Confidence, RawUpdate, SourceMethod};
use rivalwatch_scraper::RequestGate;

fn client(server: &MockServer, gate: RequestGate) -> LlmClient {
    let config = LlmConfig {
        api_key: "sk-test".to_string(),
        base_url: format!("{}/v1/", server.uri()),
        model: "gpt-4o".to_string(),
        timeout_secs: 2,
    };
    LlmClient::new(&config, gate).expect("failed to build test LlmClient")
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

fn scraped(text: &str) -> RawUpdate {
    RawUpdate {
        competitor: "Linear".to_string(),
        source_url: "https://linear.app/changelog".to_string(),
        text: text.to_string(),
        method: SourceMethod::Scraped,
        captured_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_reply_is_repaired_into_a_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(completion(
            r#"{"summary_bullets": ["Triage Intelligence suggests owners", "  "],
                "strategic_insight": "Linear is automating PM busywork",
                "confidence_level": "HIGH",
                "categories": ["AI", "Feature"],
                "impact_score": 140}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Some(client(&server, RequestGate::from_millis(0))), 7);
    let update = scraped("Triage Intelligence suggests owners for incoming issues.");
    let record = summarizer.summarize(&update).await.expect("summary");

    assert_eq!(record.competitor, "Linear");
    assert_eq!(record.bullets, ["Triage Intelligence suggests owners"]);
    assert_eq!(record.impact_score, 100);
    assert_eq!(record.confidence, Confidence::High);
    assert_eq!(record.source, SourceMethod::Scraped);
    assert_eq!(record.captured_on, update.captured_at.date_naive());
    assert!(!record.placeholder);
}

#[tokio::test]
async fn fenced_json_reply_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion(
            "```json\n{\"bullets\": [\"Docs search\"], \"impact\": 30}\n```",
        ))
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Some(client(&server, RequestGate::from_millis(0))), 7);
    let record = summarizer.summarize(&scraped("Docs search")).await.unwrap();
    assert_eq!(record.bullets, ["Docs search"]);
    assert_eq!(record.impact_score, 30);
    assert_eq!(record.confidence, Confidence::Low);
}

#[tokio::test]
async fn api_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Some(client(&server, RequestGate::from_millis(0))), 7);
    let err = summarizer.summarize(&scraped("text")).await.unwrap_err();
    assert!(
        matches!(&err, AnalystError::Api { status: 429, body } if body == "rate limited"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn non_json_reply_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("Linear shipped triage."))
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Some(client(&server, RequestGate::from_millis(0))), 7);
    let err = summarizer.summarize(&scraped("text")).await.unwrap_err();
    assert!(matches!(err, AnalystError::Json(_)), "got: {err:?}");
}

#[tokio::test]
async fn json_array_reply_is_not_an_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("[\"a\", \"b\"]"))
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Some(client(&server, RequestGate::from_millis(0))), 7);
    let err = summarizer.summarize(&scraped("text")).await.unwrap_err();
    assert!(matches!(err, AnalystError::NotAnObject), "got: {err:?}");
}

#[tokio::test]
async fn envelope_without_choices_is_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Some(client(&server, RequestGate::from_millis(0))), 7);
    let err = summarizer.summarize(&scraped("text")).await.unwrap_err();
    assert!(matches!(err, AnalystError::EmptyContent), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// FallbackGenerator
// ---------------------------------------------------------------------------

fn notion() -> CompetitorConfig {
    CompetitorConfig::new("Notion", "https://www.notion.so/releases", "Productivity")
}

#[tokio::test]
async fn fallback_uses_model_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(
            "March 1, 2026 \u{2013} Notion Mail\n- Mail for every plan\n- Gmail label sync\n- Snippets",
        ))
        .mount(&server)
        .await;

    let generator = FallbackGenerator::new(Some(client(&server, RequestGate::from_millis(0))));
    let update = generator.generate(&notion()).await;

    assert_eq!(update.method, SourceMethod::AiGenerated);
    let today = update.captured_at.date_naive().format("%B %d, %Y").to_string();
    assert!(update.text.starts_with(&format!("{today} \u{2013} Notion Mail")));
    assert!(update.text.contains("- Gmail label sync"));
    assert!(update.text.ends_with("[AI-generated fallback for Notion]"));
}

#[tokio::test]
async fn fallback_survives_model_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let generator = FallbackGenerator::new(Some(client(&server, RequestGate::from_millis(0))));
    let update = generator.generate(&notion()).await;

    assert_eq!(update.method, SourceMethod::AiGenerated);
    assert!(update.text.contains("Product Update"));
    assert!(update
        .text
        .contains("- Notion released new product features and enhancements"));
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summarizer_and_fallback_share_the_gate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("{\"bullets\": [\"x\"]}"))
        .mount(&server)
        .await;

    let llm = client(&server, RequestGate::new(Duration::from_millis(150)));
    let generator = FallbackGenerator::new(Some(llm.clone()));
    let summarizer = Summarizer::new(Some(llm), 7);

    let update = generator.generate(&notion()).await;
    let start = Instant::now();
    summarizer.summarize(&update).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
