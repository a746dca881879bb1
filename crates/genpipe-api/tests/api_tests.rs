//! API integration tests against a mocked generation service.

use std::io::Cursor;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use genpipe_api::{create_router, ApiConfig, AppState, Pipeline};
use genpipe_client::{ClientConfig, Orchestrator, OrchestratorConfig};
use genpipe_media::ImageEncoder;
use genpipe_models::EncodingConstraints;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "genpipe-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn app(base_url: &str, api_key: Option<&str>) -> Router {
    let mut client = ClientConfig::default().with_base_url(base_url);
    if let Some(key) = api_key {
        client = client.with_api_key(key);
    }
    let orchestrator = Orchestrator::new(
        OrchestratorConfig {
            client,
            ..OrchestratorConfig::default()
        }
        .with_poll_interval(Duration::from_millis(10)),
    )
    .unwrap();
    let pipeline = Pipeline::new(
        ImageEncoder::default(),
        orchestrator,
        EncodingConstraints::default(),
    );

    create_router(AppState::with_pipeline(ApiConfig::default(), pipeline), None)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([40, 90, 200]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Decode the JPEG carried by the multipart part named `name`.
fn jpeg_part(form: &[u8], name: &str) -> DynamicImage {
    let header = format!("name=\"{}\"", name);
    let header_at = form
        .windows(header.len())
        .position(|w| w == header.as_bytes())
        .unwrap_or_else(|| panic!("no part named {}", name));
    let start = header_at
        + form[header_at..]
            .windows(3)
            .position(|w| w == [0xFF, 0xD8, 0xFF])
            .expect("JPEG bytes after part header");
    image::load_from_memory(&form[start..]).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let response = app("http://127.0.0.1:1", None)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-abc");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_requires_api_key() {
    let response = app("http://127.0.0.1:1", None)
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Metrics are only routed when a recorder handle is supplied.
#[tokio::test]
async fn test_metrics_endpoint_disabled_without_handle() {
    let response = app("http://127.0.0.1:1", None)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_portrait_end_to_end_downscales_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/flux-pulid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": [{"url": "https://cdn.example/portrait.jpg", "width": 1024, "height": 768}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = png(4000, 3000);
    let response = app(&server.uri(), Some("key"))
        .oneshot(multipart_request(
            "/api/generate/portrait",
            &[
                Part::File("referenceImage", "face.png", &upload),
                Part::Text("prompt", "a knight in silver armor"),
                Part::Text("imageSize", "square_hd"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["image"]["url"], "https://cdn.example/portrait.jpg");

    // The service received a 1024x768 JPEG.
    let requests = server.received_requests().await.unwrap();
    let sent = &requests[0].body;
    let start = sent
        .windows(3)
        .position(|w| w == [0xFF, 0xD8, 0xFF])
        .expect("JPEG part in submission");
    let jpeg = image::load_from_memory(&sent[start..]).unwrap();
    assert_eq!(jpeg.dimensions(), (1024, 768));

    let form = String::from_utf8_lossy(sent);
    assert!(form.contains("square_hd"));
    assert!(form.contains("filename=\"reference_image.jpg\""));
}

#[tokio::test]
async fn test_portrait_requires_prompt() {
    let upload = png(64, 64);
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(multipart_request(
            "/api/generate/portrait",
            &[Part::File("referenceImage", "face.png", &upload)],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Please enter a vision description");
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_portrait_requires_image() {
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(multipart_request(
            "/api/generate/portrait",
            &[Part::Text("prompt", "a lighthouse")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_portrait_rejects_bad_option() {
    let upload = png(64, 64);
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(multipart_request(
            "/api/generate/portrait",
            &[
                Part::File("referenceImage", "face.png", &upload),
                Part::Text("prompt", "a lighthouse"),
                Part::Text("imageSize", "enormous"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid imageSize: Unknown image size: enormous");
}

#[tokio::test]
async fn test_undecodable_upload_is_unprocessable() {
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(multipart_request(
            "/api/generate/portrait",
            &[
                Part::File("referenceImage", "face.png", b"definitely not a picture"),
                Part::Text("prompt", "a lighthouse"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "decode_error");
}

#[tokio::test]
async fn test_generation_rejection_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/flux-pulid"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"detail": "No face detected"})),
        )
        .mount(&server)
        .await;

    let upload = png(64, 64);
    let response = app(&server.uri(), Some("key"))
        .oneshot(multipart_request(
            "/api/generate/portrait",
            &[
                Part::File("referenceImage", "face.png", &upload),
                Part::Text("prompt", "a lighthouse"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Generation failed: No face detected");
    assert_eq!(body["code"], "generation_failed");
}

#[tokio::test]
async fn test_try_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/kling/v1-5/kolors-virtual-try-on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image": {"url": "https://cdn.example/try-on.jpg"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let person = png(300, 600);
    let garment = png(400, 400);
    let response = app(&server.uri(), Some("key"))
        .oneshot(multipart_request(
            "/api/generate/try-on",
            &[
                Part::File("referenceImage", "person.png", &person),
                Part::File("garmentImage", "shirt.png", &garment),
                Part::Text("size", "XL"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["image"]["url"],
        "https://cdn.example/try-on.jpg"
    );

    // Person and garment keep their roles on the wire.
    let requests = server.received_requests().await.unwrap();
    let sent = &requests[0].body;
    assert_eq!(jpeg_part(sent, "human_image").dimensions(), (300, 600));
    assert_eq!(jpeg_part(sent, "garment_image").dimensions(), (400, 400));
}

#[tokio::test]
async fn test_internal_error_detail_hidden_in_production() {
    let orchestrator = Orchestrator::new(OrchestratorConfig {
        client: ClientConfig::default()
            .with_base_url("http://127.0.0.1:1")
            .with_api_key("key"),
        ..OrchestratorConfig::default()
    })
    .unwrap();
    let broken = EncodingConstraints::new(0, 1024, 1024);
    let upload = png(64, 64);

    for (environment, hidden) in [("production", true), ("development", false)] {
        let config = ApiConfig {
            environment: environment.to_string(),
            ..ApiConfig::default()
        };
        let pipeline = Pipeline::new(ImageEncoder::default(), orchestrator.clone(), broken);
        let response = create_router(AppState::with_pipeline(config, pipeline), None)
            .oneshot(multipart_request(
                "/api/generate/portrait",
                &[
                    Part::File("referenceImage", "face.png", &upload),
                    Part::Text("prompt", "a lighthouse"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        let body = body_json(response).await;
        assert_eq!(body["code"], "internal_error");
        let message = body["error"].as_str().unwrap();
        if hidden {
            assert_eq!(message, "An internal error occurred");
        } else {
            assert!(message.starts_with("Invalid encoding constraints"), "{}", message);
        }
    }
}

#[tokio::test]
async fn test_try_on_requires_garment() {
    let person = png(64, 64);
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(multipart_request(
            "/api/generate/try-on",
            &[Part::File("referenceImage", "person.png", &person)],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Please upload a garment image");
}

#[tokio::test]
async fn test_video_requires_url_and_prompt() {
    for body in [
        json!({}),
        json!({"imageUrl": "https://cdn.example/a.jpg"}),
        json!({"prompt": "pan left"}),
        json!({"imageUrl": "  ", "prompt": "pan left"}),
    ] {
        let response = app("http://127.0.0.1:1", Some("key"))
            .oneshot(json_request("/api/generate-video", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Image URL and prompt are required"
        );
    }
}

#[tokio::test]
async fn test_video_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fal-ai/luma-dream-machine/image-to-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video": {"url": "https://cdn.example/clip.mp4"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server.uri(), Some("key"))
        .oneshot(json_request(
            "/api/generate-video",
            json!({
                "imageUrl": "https://cdn.example/portrait.jpg",
                "prompt": "slow pan to the left",
                "aspect_ratio": "9:16",
                "duration": "9s"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["videoUrl"],
        "https://cdn.example/clip.mp4"
    );

    let requests = server.received_requests().await.unwrap();
    let form = String::from_utf8_lossy(&requests[0].body);
    assert!(form.contains("9:16"));
    assert!(form.contains("9s"));
}

#[tokio::test]
async fn test_video_rejects_unknown_aspect_ratio() {
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(json_request(
            "/api/generate-video",
            json!({
                "imageUrl": "https://cdn.example/portrait.jpg",
                "prompt": "pan",
                "aspect_ratio": "5:4"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_video_transport_failure_is_bad_gateway() {
    let response = app("http://127.0.0.1:1", Some("key"))
        .oneshot(json_request(
            "/api/generate-video",
            json!({"imageUrl": "https://cdn.example/portrait.jpg", "prompt": "pan"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "transport");
}
