#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt; // for .collect()
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::config::AppConfig;
    use crate::state::AppState;
    use crate::tests::fixtures;

    const BOUNDARY: &str = "dicomstore-test-boundary";

    fn setup_test_app() -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig { storage_dir: dir.path().join("records"), ..AppConfig::default() };
        let state = AppState::from_config(config).unwrap();
        (build_app(state.clone()), state, dir)
    }

    fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/dicom\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/data")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn upload(app: &Router, data: &[u8]) -> String {
        let response = app.clone().oneshot(multipart_request("dicomFile", "scan.dcm", data)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let v = body_json(response).await;
        v["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_welcome() {
        let (app, _, _dir) = setup_test_app();
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.starts_with("Welcome"));
    }

    #[tokio::test]
    async fn test_upload_then_download_returns_same_bytes() {
        let (app, _, _dir) = setup_test_app();
        let data = fixtures::sample_bytes();

        let response = app.clone().oneshot(multipart_request("dicomFile", "scan.dcm", &data)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let v = body_json(response).await;
        assert_eq!(v["success"], true);
        assert_eq!(v["feedback"], format!("scan.dcm with Size of {} uploaded successfully", data.len()));
        let id = v["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());

        let response = app.oneshot(get(&format!("/data/{}/dicom", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/dicom");
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn test_upload_without_dicom_file_field() {
        let (app, state, _dir) = setup_test_app();

        let response = app.oneshot(multipart_request("somethingElse", "scan.dcm", b"data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["feedback"], "Error receiving uploaded file, try again");
        assert!(state.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_non_multipart_body() {
        let (app, _, _dir) = setup_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/data")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_list_after_uploads_and_deletes() {
        let (app, _, _dir) = setup_test_app();

        let response = app.clone().oneshot(get("/data")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));

        let mut ids = Vec::new();
        for i in 0..5u8 {
            ids.push(upload(&app, &[i; 8]).await);
        }
        for id in &ids[..2] {
            let response = app.clone().oneshot(delete(&format!("/data/{}", id))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let v = body_json(response).await;
            assert_eq!(v["success"], true);
            assert_eq!(v["feedback"], format!("Successfully deleted record:{}", id));
        }

        let response = app.oneshot(get("/data")).await.unwrap();
        let mut listed: Vec<String> = serde_json::from_value(body_json(response).await).unwrap();
        listed.sort();
        let mut expected = ids[2..].to_vec();
        expected.sort();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_record() {
        let (app, _, _dir) = setup_test_app();
        let response = app.oneshot(delete("/data/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["feedback"], "Error deleting record:missing");
    }

    #[tokio::test]
    async fn test_retrieve_tags() {
        let (app, _, _dir) = setup_test_app();
        let id = upload(&app, &fixtures::sample_bytes()).await;

        let response = app
            .oneshot(get(&format!("/data/{}?tags=PatientName,InvalidTag,Rows,PixelData", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let v = body_json(response).await;
        assert_eq!(v["PatientName"], "NAYYAR^HARSH");
        assert_eq!(v["InvalidTag"], "INVALID_TAG_NAME");
        assert_eq!(v["Rows"], fixtures::ROWS);
        assert_eq!(v["PixelData"], "Not Supported!");
        assert_eq!(v.as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_retrieve_without_tags_is_empty_object() {
        let (app, _, _dir) = setup_test_app();
        let id = upload(&app, &fixtures::sample_bytes()).await;

        let response = app.oneshot(get(&format!("/data/{}", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_retrieve_missing_record() {
        let (app, _, _dir) = setup_test_app();

        let response = app.clone().oneshot(get("/data/missing?tags=PatientName")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["feedback"], "Error retrieving record:missing");

        let response = app.clone().oneshot(get("/data/missing/image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["feedback"], "Error retrieving image for:missing");

        let response = app.oneshot(get("/data/missing/dicom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["feedback"], "Error retrieving dicom file for:missing");
    }

    #[tokio::test]
    async fn test_retrieve_image_is_png() {
        let (app, _, _dir) = setup_test_app();
        let id = upload(&app, &fixtures::sample_bytes()).await;

        let response = app.oneshot(get(&format!("/data/{}/image", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let png = body_bytes(response).await;
        let img = image::load_from_memory_with_format(&png, image::ImageFormat::Png).unwrap();
        assert_eq!((img.width(), img.height()), (fixtures::COLUMNS as u32, fixtures::ROWS as u32));
    }

    #[tokio::test]
    async fn test_non_dicom_record_surfaces_parse_error() {
        let (app, _, _dir) = setup_test_app();
        let id = upload(&app, b"plain text, not a dicom file").await;

        let response = app.clone().oneshot(get(&format!("/data/{}?tags=PatientName", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["feedback"], format!("Error parsing record:{}", id));

        let response = app.clone().oneshot(get(&format!("/data/{}/image", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["feedback"], format!("Error parsing record:{}", id));

        // raw download does not parse
        let response = app.oneshot(get(&format!("/data/{}/dicom", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let (app, _, dir) = setup_test_app();
        std::fs::write(dir.path().join("secret"), b"outside").unwrap();

        for uri in ["/data/..%2Fsecret/dicom", "/data/%2e%2e/dicom", "/data/../secret"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
            assert_eq!(body_json(response).await["success"], false);
        }
    }

    fn setup_limited_app(max_upload_bytes: usize) -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig { storage_dir: dir.path().join("records"), max_upload_bytes, ..AppConfig::default() };
        let state = AppState::from_config(config).unwrap();
        (build_app(state.clone()), state, dir)
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let (app, state, _dir) = setup_limited_app(1024);

        let response = app.oneshot(multipart_request("dicomFile", "big.dcm", &[7u8; 4096])).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let v = body_json(response).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["feedback"], "Error receiving uploaded file, try again");
        assert!(state.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_upload_without_content_length_is_rejected() {
        let (app, state, _dir) = setup_limited_app(1024);
        let mut request = multipart_request("dicomFile", "big.dcm", &[7u8; 4096]);
        request.headers_mut().remove(header::CONTENT_LENGTH);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["feedback"], "Error receiving uploaded file, try again");
        assert!(state.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_tags_query_uses_envelope() {
        let (app, _, _dir) = setup_test_app();

        let response = app.oneshot(get("/data/abc?tags=A&tags=B")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("application/json"));
        let v = body_json(response).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["feedback"], "Error retrieving record:abc");
    }

    #[tokio::test]
    async fn test_undecodable_id_uses_envelope() {
        let (app, _, _dir) = setup_test_app();

        let cases = [
            ("/data/%FF", "Error retrieving record"),
            ("/data/%FF/image", "Error retrieving image for"),
            ("/data/%FF/dicom", "Error retrieving dicom file for"),
        ];
        for (uri, feedback) in cases {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
            let v = body_json(response).await;
            assert_eq!(v["success"], false);
            assert_eq!(v["feedback"], feedback);
        }

        let response = app.oneshot(delete("/data/%FF")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["feedback"], "Error deleting record");
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let (app, _, _dir) = setup_test_app();
        let response = app.oneshot(get("/data")).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["referrer-policy"], "no-referrer");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_metrics_count_record_operations() {
        let (app, state, _dir) = setup_test_app();
        let id = upload(&app, &fixtures::sample_bytes()).await;
        app.clone().oneshot(get(&format!("/data/{}?tags=PatientName,Rows", id))).await.unwrap();
        app.clone().oneshot(get(&format!("/data/{}/image", id))).await.unwrap();
        app.oneshot(delete(&format!("/data/{}", id))).await.unwrap();

        let m = state.metrics.get_snapshot();
        assert_eq!(m.records_uploaded, 1);
        assert_eq!(m.tag_lookups, 2);
        assert_eq!(m.images_rendered, 1);
        assert_eq!(m.records_deleted, 1);
    }
}
