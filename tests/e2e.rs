//! End-to-end tests for medscan-report against a mock chat-completions server.
//!
//! Every test spins up its own `mockito` server, points the client at it and
//! checks what goes over the wire as well as what comes back. The last test
//! talks to a real endpoint and is gated behind the `E2E_ENABLED` environment
//! variable so it does not run in CI unless explicitly requested.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Live run:
//!   E2E_ENABLED=1 MEDSCAN_API_KEY=... MEDSCAN_E2E_IMAGE=report.jpg cargo test --test e2e live -- --nocapture

use medscan_report::{
    analyze_batch, clean_response, format, partition_uploads, run_analysis, update,
    AnalyzerConfig, AnalyzerConfigBuilder, DisplayBlock, ErrorCategory, MedScanError,
    ReportAnalyzer, ReportImage, SessionEvent, SessionState, ValueClass, VisionClient,
};
use mockito::Matcher;
use serde_json::json;
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

const PATH: &str = "/v1/chat/completions";

fn config_for(server: &mockito::ServerGuard) -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .endpoint(format!("{}{PATH}", server.url()))
        .api_key("test-key")
        .model("grok-vision-beta")
        .build()
        .unwrap()
}

/// A tiny image whose base64 form is plain alphanumerics, so it can be
/// matched with a regex on the request body.
fn png(name: &str, bytes: &[u8]) -> ReportImage {
    ReportImage::new(name, "image/png", bytes.to_vec())
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

const SAMPLE_REPLY: &str = "```markdown
Laboratory Report Analysis
Patient Information
- Name: Jane Doe
- Age: 42
Complete Blood Count
Test | Result | Reference Range
---|---|---
Hemoglobin | 13.5 (Normal) | 12.0-15.5
WBC | 12.5 (High) | 4.0-11.0
Key Findings
- WBC: elevated (High)
```";

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn sends_expected_request_and_returns_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer test-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({
                "model": "grok-vision-beta",
                "stream": false,
                "temperature": 0.2,
                "max_tokens": 2500
            })),
            Matcher::Regex(r#""role":"system""#.into()),
            Matcher::Regex(r#""type":"image_url","image_url":\{"url":"data:image/png;base64,QUJD"\}"#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(SAMPLE_REPLY))
        .expect(1)
        .create_async()
        .await;

    let client = VisionClient::new(config_for(&server)).unwrap();
    let text = client.analyze(&png("cbc.png", b"ABC")).await.unwrap();
    mock.assert_async().await;

    assert_eq!(text, SAMPLE_REPLY);

    let blocks = format(&clean_response(&text));
    assert_eq!(
        blocks[0],
        DisplayBlock::Heading1 {
            text: "Laboratory Report Analysis".into()
        }
    );
    let table = blocks
        .iter()
        .find_map(|b| match b {
            DisplayBlock::Table(t) => Some(t),
            _ => None,
        })
        .expect("table block");
    assert_eq!(table.headers, vec!["Test", "Result", "Reference Range"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.cell_class(1, 1), ValueClass::Abnormal);
    assert!(blocks.contains(&DisplayBlock::LabeledField {
        label: "WBC".into(),
        value: "elevated (High)".into(),
        value_class: ValueClass::Abnormal,
    }));
}

// ── Local rejections: nothing is sent ────────────────────────────────────────

#[tokio::test]
async fn non_image_is_rejected_without_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", PATH).expect(0).create_async().await;

    let client = VisionClient::new(config_for(&server)).unwrap();
    let pdf = ReportImage::new("report.pdf", "application/pdf", b"%PDF-1.7".to_vec());
    let err = client.analyze(&pdf).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::InvalidInput);
    assert_eq!(err.to_string(), "Please upload an image file (JPEG, PNG)");
    mock.assert_async().await;
}

#[tokio::test]
async fn oversized_image_is_rejected_without_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", PATH).expect(0).create_async().await;

    let config = AnalyzerConfig::builder()
        .endpoint(format!("{}{PATH}", server.url()))
        .api_key("test-key")
        .max_image_bytes(1024)
        .build()
        .unwrap();
    let client = VisionClient::new(config).unwrap();
    let err = client
        .analyze(&png("big.png", &[0u8; 1025]))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::InvalidInput);
    assert_eq!(err.to_string(), "Image size must be less than 1KB");
    mock.assert_async().await;
}

#[tokio::test]
async fn encoded_payload_over_limit_is_rejected_without_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", PATH).expect(0).create_async().await;

    let config = AnalyzerConfig::builder()
        .endpoint(format!("{}{PATH}", server.url()))
        .api_key("test-key")
        .max_encoded_bytes(8)
        .build()
        .unwrap();
    let client = VisionClient::new(config).unwrap();
    let err = client
        .analyze(&png("scan.png", &[1u8; 30]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MedScanError::PayloadTooLarge {
            encoded_bytes: 40,
            limit: 8
        }
    ));
    assert_eq!(
        err.to_string(),
        "Image is too large after conversion. Please use a smaller image."
    );
    mock.assert_async().await;
}

// ── Remote rejections ────────────────────────────────────────────────────────

async fn rejected_with(status: usize) -> MedScanError {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(status)
        .with_body(r#"{"error":"nope"}"#)
        .create_async()
        .await;

    let client = VisionClient::new(config_for(&server)).unwrap();
    client.analyze(&png("a.png", b"ABC")).await.unwrap_err()
}

#[tokio::test]
async fn status_codes_map_to_messages() {
    let cases: [(usize, &str); 5] = [
        (
            412,
            "The image format is not supported or the image is corrupted. Please try a different image.",
        ),
        (413, "The image is too large. Please use a smaller image."),
        (429, "Too many requests. Please try again in a few moments."),
        (401, "API authentication failed. Please check your API key."),
        (
            500,
            "API request failed: 500 - Please try a different image or try again later.",
        ),
    ];

    for (status, message) in cases {
        let err = rejected_with(status).await;
        assert_eq!(err.category(), ErrorCategory::RemoteRejected, "{status}");
        assert_eq!(err.status(), Some(status as u16));
        assert_eq!(err.to_string(), message);
    }
}

#[tokio::test]
async fn success_without_content_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let client = VisionClient::new(config_for(&server)).unwrap();
    let err = client.analyze(&png("a.png", b"ABC")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedResponse);
    assert_eq!(err.to_string(), "Invalid response format from API");
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let client = VisionClient::new(config_for(&server)).unwrap();
    let err = client.analyze(&png("a.png", b"ABC")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedResponse);
}

#[tokio::test]
async fn unreachable_endpoint_is_unknown() {
    let config = AnalyzerConfig::builder()
        .endpoint("http://127.0.0.1:1/v1/chat/completions")
        .api_key("test-key")
        .request_timeout_secs(5)
        .build()
        .unwrap();
    let client = VisionClient::new(config).unwrap();
    let err = client.analyze(&png("a.png", b"ABC")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unknown);
}

// ── Batches ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_stops_at_first_rejection() {
    let mut server = mockito::Server::new_async().await;
    // AAA → QUFB, BBB → QkJC, CCC → Q0ND
    let first = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex("QUFB".into()))
        .with_status(200)
        .with_body(completion("Key Findings\n- Glucose: 90 (Normal)"))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex("QkJC".into()))
        .with_status(429)
        .expect(1)
        .create_async()
        .await;
    let third = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex("Q0ND".into()))
        .with_status(200)
        .with_body(completion("unused"))
        .expect(0)
        .create_async()
        .await;

    let config = config_for(&server);
    let client = VisionClient::new(config.clone()).unwrap();
    let images = vec![
        png("a.png", b"AAA"),
        png("b.png", b"BBB"),
        png("c.png", b"CCC"),
    ];
    let outcome = analyze_batch(&client, &images, &config).await;

    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;

    assert_eq!(outcome.analyses.len(), 1);
    assert_eq!(outcome.analyses[0].file_name, "a.png");
    assert_eq!(outcome.error.as_ref().and_then(|e| e.status()), Some(429));
    assert_eq!(outcome.stats.not_submitted, 1);
}

#[tokio::test]
async fn session_keeps_same_named_files_apart() {
    let mut server = mockito::Server::new_async().await;
    let _first = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex("QUFB".into()))
        .with_status(200)
        .with_body(completion("- Sample: first"))
        .create_async()
        .await;
    let _second = server
        .mock("POST", PATH)
        .match_body(Matcher::Regex("QkJC".into()))
        .with_status(200)
        .with_body(completion("- Sample: second"))
        .create_async()
        .await;

    let config = config_for(&server);
    let client = VisionClient::new(config.clone()).unwrap();
    let state = update(
        SessionState::new(),
        SessionEvent::FilesAdded(vec![png("scan.png", b"AAA"), png("scan.png", b"BBB")]),
    );
    let state = run_analysis(state, &client, &config).await;

    assert!(state.error.is_none());
    let texts: Vec<_> = state.analyses.values().map(|a| a.text.as_str()).collect();
    assert_eq!(texts, vec!["- Sample: first", "- Sample: second"]);
}

#[tokio::test]
async fn gif_upload_never_reaches_the_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body(completion("- Sample: gif"))
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let gif = dir.path().join("scan.gif");
    std::fs::write(&gif, b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap();
    let (accepted, skipped) = partition_uploads(&[gif.clone()]);
    assert!(accepted.is_empty());
    assert_eq!(skipped, vec![gif.clone()]);

    // A front end that skips the path check still cannot submit it.
    let image = ReportImage::from_path(&gif).await.unwrap();
    let config = config_for(&server);
    let client = VisionClient::new(config.clone()).unwrap();
    let state = update(SessionState::new(), SessionEvent::FilesAdded(vec![image]));
    let state = run_analysis(state, &client, &config).await;

    assert!(state.files.is_empty());
    assert!(!state.has_results());
    mock.assert_async().await;
}

// ── Live endpoint ────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_analysis() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let Ok(path) = std::env::var("MEDSCAN_E2E_IMAGE") else {
        println!("SKIP: set MEDSCAN_E2E_IMAGE to a report image");
        return;
    };

    let config = AnalyzerConfigBuilder::from_env()
        .request_timeout_secs(120)
        .build()
        .expect("MEDSCAN_API_KEY must be set for live tests");
    let client = VisionClient::new(config).unwrap();
    let image = ReportImage::from_path(PathBuf::from(path)).await.unwrap();

    let text = client.analyze(&image).await.unwrap();
    let blocks = format(&clean_response(&text));
    println!("{text}");
    assert!(!blocks.is_empty(), "formatted output is empty");
}
