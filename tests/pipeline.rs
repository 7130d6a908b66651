mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{Canned, MockServer};
use gemini_caption::{
    CaptionPipeline, FetchError, Gemini, GeminiCaptioner, ImageFetcher, Model, PipelineError,
    Reporter,
};
use serde_json::json;

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00\xff\xd9";

fn pipeline_for(server: &MockServer) -> CaptionPipeline<ImageFetcher, GeminiCaptioner> {
    let client =
        Gemini::with_model_and_base_url("test-api-key", Model::Gemini15Pro, server.url("v1beta/"))
            .unwrap();
    CaptionPipeline::new(ImageFetcher::new().unwrap(), GeminiCaptioner::new(client))
}

#[tokio::test]
async fn image_is_fetched_encoded_captioned_and_printed() {
    let mut server = MockServer::start(vec![
        Canned::new(200, "image/jpeg", JPEG_BYTES),
        Canned::json(
            200,
            json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "A photo of a building." }],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }]
            }),
        ),
    ])
    .await;
    let pipeline = pipeline_for(&server);
    let mut reporter = Reporter::new(Vec::new());

    pipeline
        .run(&server.url("westminster.jpg"), &mut reporter)
        .await
        .unwrap();

    assert_eq!(reporter.into_inner(), b"A photo of a building.\n");

    let download = server.next_request().await;
    assert_eq!(download.method, "GET");
    assert_eq!(download.header("x-goog-api-key"), None);

    let generate = server.next_request().await.json();
    let parts = &generate["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    let payload = parts[0]["inlineData"]["data"].as_str().unwrap();
    assert_eq!(payload, STANDARD.encode(JPEG_BYTES));
    assert_eq!(STANDARD.decode(payload).unwrap(), JPEG_BYTES);
    assert_eq!(parts[1]["text"], "Caption this image.");
}

#[tokio::test]
async fn failed_download_issues_no_caption_request() {
    let mut server = MockServer::start(vec![
        Canned::new(404, "text/html", "<h1>Not Found</h1>"),
        Canned::json(200, json!({ "candidates": [] })),
    ])
    .await;
    let pipeline = pipeline_for(&server);
    let mut reporter = Reporter::new(Vec::new());

    let err = pipeline
        .run(&server.url("missing.jpg"), &mut reporter)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch {
            source: FetchError::Status { code: 404, .. }
        }
    ));
    assert!(reporter.into_inner().is_empty());
    assert_eq!(server.next_request().await.method, "GET");
    assert_eq!(server.pending_requests(), 0);
}

#[tokio::test]
async fn failed_caption_prints_nothing() {
    let server = MockServer::start(vec![
        Canned::new(200, "image/jpeg", JPEG_BYTES),
        Canned::json(
            403,
            json!({ "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" } }),
        ),
    ])
    .await;
    let pipeline = pipeline_for(&server);
    let mut reporter = Reporter::new(Vec::new());

    let err = pipeline
        .run(&server.url("westminster.jpg"), &mut reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Caption { .. }));
    assert!(reporter.into_inner().is_empty());
}
