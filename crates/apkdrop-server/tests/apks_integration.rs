mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{json_body, setup_with, test_config};

const BOUNDARY: &str = "----apkdrop-test-boundary";

/// Build a multipart/form-data body with an optional version field and one
/// file field.
fn multipart_body(file_name: &str, content: &[u8], version: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(version) = version {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"version\"\r\n\r\n{version}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             content-type: application/vnd.android.package-archive\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(file_name: &str, content: &[u8], version: Option<&str>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/apks")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file_name, content, version)))
        .expect("build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

fn temp_data_dir(tag: &str) -> String {
    std::env::temp_dir()
        .join(format!("apkdrop-apks-{tag}-{}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_upload_creates_inactive_record_and_blob() {
    let data_dir = temp_data_dir("upload");
    let (state, app) = setup_with(test_config(&data_dir)).await;

    let response = app
        .oneshot(upload_request("myapp.apk", b"apk-bytes", Some("1.2.3")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = json_body(response).await;
    let apk = &json["data"];
    assert!(apk["id"].as_str().unwrap_or_default().starts_with("apk_"));
    assert_eq!(apk["file_name"], "myapp.apk");
    assert_eq!(apk["file_size"], 9);
    assert_eq!(apk["version"], "1.2.3");
    assert_eq!(apk["is_active"], false);

    // The blob landed on disk under the stored (timestamp-prefixed) name.
    let file_url = apk["file_url"].as_str().unwrap_or_default();
    let stored_name = file_url.rsplit('/').next().unwrap_or_default();
    assert!(stored_name.ends_with("-myapp.apk"));
    assert!(state.apk_storage.root().join(stored_name).exists());

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}

#[tokio::test]
async fn test_upload_rejects_non_apk_names() {
    let data_dir = temp_data_dir("reject");
    let (_state, app) = setup_with(test_config(&data_dir)).await;

    let response = app
        .oneshot(upload_request("malware.exe", b"nope", None))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}

#[tokio::test]
async fn test_upload_without_file_field_rejected() {
    let data_dir = temp_data_dir("nofile");
    let (_state, app) = setup_with(test_config(&data_dir)).await;

    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"version\"\r\n\r\n1.0\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/api/apks")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}

#[tokio::test]
async fn test_activate_swaps_and_active_endpoint_follows() {
    let data_dir = temp_data_dir("activate");
    let (_state, app) = setup_with(test_config(&data_dir)).await;

    // No active APK on a fresh install.
    let response = app
        .clone()
        .oneshot(get("/api/apks/active"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["data"].is_null());

    let first = json_body(
        app.clone()
            .oneshot(upload_request("a.apk", b"aa", None))
            .await
            .expect("request"),
    )
    .await["data"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let second = json_body(
        app.clone()
            .oneshot(upload_request("b.apk", b"bb", None))
            .await
            .expect("request"),
    )
    .await["data"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let response = app
        .clone()
        .oneshot(post(&format!("/api/apks/{first}/activate")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(&format!("/api/apks/{second}/activate")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    // Exactly one active row, and it's the later activation.
    let response = app
        .clone()
        .oneshot(get("/api/apks/active"))
        .await
        .expect("request");
    let json = json_body(response).await;
    assert_eq!(json["data"]["id"], second.as_str());

    let response = app.clone().oneshot(get("/api/apks")).await.expect("request");
    let json = json_body(response).await;
    let active_count = json["data"]
        .as_array()
        .map(|apks| {
            apks.iter()
                .filter(|apk| apk["is_active"] == true)
                .count()
        })
        .unwrap_or_default();
    assert_eq!(active_count, 1);

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}

#[tokio::test]
async fn test_activate_unknown_id_is_404() {
    let data_dir = temp_data_dir("activate404");
    let (_state, app) = setup_with(test_config(&data_dir)).await;

    let response = app
        .oneshot(post("/api/apks/apk_missing000/activate"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}

#[tokio::test]
async fn test_delete_removes_row_and_blob() {
    let data_dir = temp_data_dir("delete");
    let (state, app) = setup_with(test_config(&data_dir)).await;

    let json = json_body(
        app.clone()
            .oneshot(upload_request("gone.apk", b"xx", None))
            .await
            .expect("request"),
    )
    .await;
    let id = json["data"]["id"].as_str().unwrap_or_default().to_string();
    let file_url = json["data"]["file_url"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let stored_name = file_url.rsplit('/').next().unwrap_or_default().to_string();
    assert!(state.apk_storage.root().join(&stored_name).exists());

    let response = app
        .clone()
        .oneshot(delete(&format!("/api/apks/{id}")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!state.apk_storage.root().join(&stored_name).exists());
    let response = app
        .clone()
        .oneshot(delete(&format!("/api/apks/{id}")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}

#[tokio::test]
async fn test_download_serves_uploaded_blob() {
    let data_dir = temp_data_dir("download");
    let (_state, app) = setup_with(test_config(&data_dir)).await;

    let json = json_body(
        app.clone()
            .oneshot(upload_request("serve.apk", b"binary-content", None))
            .await
            .expect("request"),
    )
    .await;
    let file_url = json["data"]["file_url"].as_str().unwrap_or_default();
    let stored_name = file_url.rsplit('/').next().unwrap_or_default();

    let response = app
        .oneshot(get(&format!("/downloads/{stored_name}")))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .expect("read body")
        .to_bytes();
    assert_eq!(&bytes[..], b"binary-content");

    tokio::fs::remove_dir_all(&data_dir).await.ok();
}
