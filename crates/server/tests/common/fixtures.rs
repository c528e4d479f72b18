//! Test fixtures: image bytes, multipart bodies and request helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

/// Multipart boundary used by every test body.
pub const BOUNDARY: &str = "aifriend-test-boundary";

/// Smallest byte strings that sniff as each accepted image type.
#[allow(dead_code)]
pub fn png_bytes() -> Bytes {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0, 0, 0, 0x0D, b'I', b'H', b'D', b'R']);
    data.extend_from_slice(&[0u8; 17]);
    Bytes::from(data)
}

#[allow(dead_code)]
pub fn jpeg_bytes() -> Bytes {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
    data.extend_from_slice(&[0u8; 16]);
    Bytes::from(data)
}

#[allow(dead_code)]
pub fn gif_bytes() -> Bytes {
    let mut data = b"GIF89a".to_vec();
    data.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0]);
    Bytes::from(data)
}

/// Plain text disguised by nothing but the caller's claims.
#[allow(dead_code)]
pub fn text_bytes() -> Bytes {
    Bytes::from_static(b"this is definitely a picture, trust me\n")
}

/// One part of a multipart form.
#[allow(dead_code)]
pub enum Part {
    Text(&'static str, String),
    File(&'static str, &'static str, Bytes),
}

/// Build a `multipart/form-data` body. Returns `(content_type, body)`.
#[allow(dead_code)]
pub fn multipart_body(parts: Vec<Part>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Helper to make JSON requests.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = auth_token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    send(router, builder.body(body).unwrap()).await
}

/// Helper to make multipart requests.
#[allow(dead_code)]
pub async fn multipart_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    parts: Vec<Part>,
    auth_token: &str,
) -> (StatusCode, Value) {
    let (content_type, body) = multipart_body(parts);
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", auth_token))
        .header("Content-Type", content_type)
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

/// Names of the files in a directory, sorted.
#[allow(dead_code)]
pub fn list_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
