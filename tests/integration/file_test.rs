//! Integration tests for upload, versioning, download and deletion.

mod helpers;

use axum::http::{StatusCode, header};
use planroom_core::config::AppConfig;
use planroom_database::FileRecordStore;
use serde_json::{Value, json};

use helpers::TestApp;

async fn upload_pdf(app: &TestApp, name: &str, body: &[u8]) -> Value {
    let response = app.upload(name, "application/pdf", body, &[]).await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json());
    response.data()["file"].clone()
}

fn id_of(record: &Value) -> String {
    record["id"].as_str().expect("record id").to_string()
}

#[tokio::test]
async fn test_upload_creates_first_version() {
    let app = TestApp::new().await;

    let response = app
        .upload(
            "A-101 Floor Plan.pdf",
            "application/pdf",
            b"%PDF-1.7 level one",
            &[
                ("description", "Ground floor"),
                ("tags", "architectural, issued"),
                ("uploaded_by", "j.site"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["success"], json!(true));

    let file = &body["data"]["file"];
    assert_eq!(file["original_name"], "A-101 Floor Plan.pdf");
    assert_eq!(file["base_name"], "A-101 Floor Plan");
    assert_eq!(file["version"], 1);
    assert_eq!(file["is_latest"], true);
    assert_eq!(file["description"], "Ground floor");
    assert_eq!(file["tags"], json!(["architectural", "issued"]));
    assert_eq!(file["uploaded_by"], "j.site");
    assert_eq!(file["size_bytes"], 18);
    assert_eq!(body["data"]["replaced_version"], Value::Null);
    assert_eq!(
        body["data"]["urls"]["download"],
        format!("/api/download/{}", id_of(file))
    );
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn test_reupload_supersedes_previous_version() {
    let app = TestApp::new().await;
    let v1 = upload_pdf(&app, "S-201.pdf", b"first").await;

    let response = app
        .upload("S-201.dwg", "application/octet-stream", b"second", &[])
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let data = response.data();
    assert_eq!(data["file"]["version"], 2);
    assert_eq!(data["file"]["content_type"], "application/acad");
    assert_eq!(data["replaced_version"], 1);

    let old = app.request("GET", &format!("/api/files/{}", id_of(&v1)), None).await;
    assert_eq!(old.status, StatusCode::OK);
    assert_eq!(old.data()["is_latest"], false);

    let list = app.request("GET", "/api/files", None).await;
    let items = list.data();
    let items = items.as_array().expect("list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["version"], 2);
    assert_eq!(items[0]["total_versions"], 2);
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_versions() {
    let app = std::sync::Arc::new(TestApp::new().await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = format!("revision {i}");
            app.upload("E-301.pdf", "application/pdf", body.as_bytes(), &[])
                .await
                .status
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let history = app.request("GET", "/api/files/E-301/versions", None).await;
    let data = history.data();
    let versions: Vec<i64> = data["versions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version"].as_i64().unwrap())
        .collect();
    assert_eq!(versions, vec![8, 7, 6, 5, 4, 3, 2, 1]);
    let latest = data["versions"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|v| v["is_latest"] == true)
        .count();
    assert_eq!(latest, 1);
    assert_eq!(data["latest_version"], 8);
}

#[tokio::test]
async fn test_rejects_disallowed_type() {
    let app = TestApp::new().await;

    let response = app
        .upload("installer.exe", "application/x-msdownload", b"MZ", &[])
        .await;
    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.json()["error"], "UNSUPPORTED_MEDIA_TYPE");
    assert!(app.blobs.is_empty());
}

#[tokio::test]
async fn test_rejects_oversized_upload() {
    let mut config = AppConfig::default();
    config.storage.max_upload_size_bytes = 8;
    let app = TestApp::with_config(config).await;

    let response = app
        .upload("big.pdf", "application/pdf", b"way more than eight bytes", &[])
        .await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let app = TestApp::new().await;
    let response = app
        .multipart(helpers::multipart_fields_only(&[("description", "orphan")]))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "VALIDATION");
}

#[tokio::test]
async fn test_rollback_restores_older_version() {
    let app = TestApp::new().await;
    let v1 = upload_pdf(&app, "M-401.pdf", b"one").await;
    upload_pdf(&app, "M-401.pdf", b"two").await;

    let response = app
        .request("POST", &format!("/api/files/{}/rollback", id_of(&v1)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = response.data();
    assert_eq!(data["file"]["version"], 1);
    assert_eq!(data["file"]["is_latest"], true);
    assert_eq!(data["replaced_version"], 2);

    let list = app.request("GET", "/api/files", None).await.data();
    assert_eq!(list[0]["id"], v1["id"]);

    let v3 = upload_pdf(&app, "M-401.pdf", b"three").await;
    assert_eq!(v3["version"], 3);
}

#[tokio::test]
async fn test_versions_of_unknown_group() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/api/files/nothing-here/versions", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_streams_attachment() {
    let app = TestApp::new().await;
    let file = upload_pdf(&app, "Schedule ü.pdf", b"%PDF schedule").await;

    let response = app
        .request("GET", &format!("/api/download/{}", id_of(&file)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.bytes[..], b"%PDF schedule");
    assert_eq!(
        response.header(header::CONTENT_TYPE).as_deref(),
        Some("application/pdf")
    );
    let disposition = response.header(header::CONTENT_DISPOSITION).unwrap();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("filename=\"Schedule _.pdf\""));
    assert!(disposition.contains("filename*=UTF-8''Schedule%20%C3%BC.pdf"));
}

#[tokio::test]
async fn test_preview_is_inline() {
    let app = TestApp::new().await;
    let file = upload_pdf(&app, "Detail.pdf", b"%PDF detail").await;

    let response = app
        .request("GET", &format!("/api/preview/{}", id_of(&file)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .header(header::CONTENT_DISPOSITION)
        .unwrap()
        .starts_with("inline;"));

    let thumb = app
        .request("GET", &format!("/api/preview/{}?size=64", id_of(&file)), None)
        .await;
    assert_eq!(thumb.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_url_falls_back_to_api_download() {
    let app = TestApp::new().await;
    let file = upload_pdf(&app, "Detail.pdf", b"%PDF").await;

    let response = app
        .request("GET", &format!("/api/files/{}/url", id_of(&file)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.data()["url"],
        format!("/api/download/{}", id_of(&file))
    );
}

#[tokio::test]
async fn test_update_metadata() {
    let app = TestApp::new().await;
    let file = upload_pdf(&app, "Finishes.pdf", b"%PDF").await;
    let path = format!("/api/files/{}/metadata", id_of(&file));

    let response = app
        .request(
            "PUT",
            &path,
            Some(json!({"description": "Issued for construction", "tags": "ifc, rev-c"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let data = response.data();
    assert_eq!(data["description"], "Issued for construction");
    assert_eq!(data["tags"], json!(["ifc", "rev-c"]));

    let response = app
        .request("PUT", &path, Some(json!({"tags": ["final"]})))
        .await;
    let data = response.data();
    assert_eq!(data["description"], "Issued for construction");
    assert_eq!(data["tags"], json!(["final"]));

    let response = app
        .request_raw("PUT", &path, "application/json", b"{not json")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_and_tag_filters() {
    let app = TestApp::new().await;
    app.upload("A-101.pdf", "application/pdf", b"a", &[("tags", "architectural")])
        .await;
    app.upload(
        "S-201.pdf",
        "application/pdf",
        b"s",
        &[("description", "Steel framing"), ("tags", "structural")],
    )
    .await;

    let by_text = app.request("GET", "/api/files?q=steel", None).await.data();
    assert_eq!(by_text.as_array().unwrap().len(), 1);
    assert_eq!(by_text[0]["base_name"], "S-201");

    let by_tag = app
        .request("GET", "/api/files?tag=architectural", None)
        .await
        .data();
    assert_eq!(by_tag.as_array().unwrap().len(), 1);
    assert_eq!(by_tag[0]["base_name"], "A-101");
}

#[tokio::test]
async fn test_delete_version_refuses_latest() {
    let app = TestApp::new().await;
    let v1 = upload_pdf(&app, "C-501.pdf", b"one").await;
    let v2 = upload_pdf(&app, "C-501.pdf", b"two").await;

    let response = app
        .request("DELETE", &format!("/api/files/{}/version", id_of(&v2)), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request("DELETE", &format!("/api/files/{}/version", id_of(&v1)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["deleted"], 1);
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn test_delete_latest_promotes_previous() {
    let app = TestApp::new().await;
    let v1 = upload_pdf(&app, "C-502.pdf", b"one").await;
    let v2 = upload_pdf(&app, "C-502.pdf", b"two").await;

    let response = app
        .request("DELETE", &format!("/api/files/{}", id_of(&v2)), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let list = app.request("GET", "/api/files", None).await.data();
    assert_eq!(list[0]["id"], v1["id"]);
    assert_eq!(list[0]["is_latest"], true);
}

#[tokio::test]
async fn test_delete_all_versions() {
    let app = TestApp::new().await;
    upload_pdf(&app, "C-503.pdf", b"one").await;
    let v2 = upload_pdf(&app, "C-503.pdf", b"two").await;

    let response = app
        .request(
            "DELETE",
            &format!("/api/files/{}?all_versions=true", id_of(&v2)),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["deleted"], 2);
    assert!(app.blobs.is_empty());

    let list = app.request("GET", "/api/files", None).await.data();
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_and_unknown_ids() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/files/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "GET",
            "/api/download/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_markup_declared_on_pdf_is_not_served_as_html() {
    let app = TestApp::new().await;
    let response = app
        .upload(
            "notes.pdf",
            "text/html",
            b"<script>alert(document.cookie)</script>",
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let file = response.data()["file"].clone();
    assert_eq!(file["content_type"], "application/pdf");

    let preview = app
        .request("GET", &format!("/api/preview/{}", id_of(&file)), None)
        .await;
    assert_eq!(preview.status, StatusCode::OK);
    assert_eq!(
        preview.header(header::CONTENT_TYPE).as_deref(),
        Some("application/pdf")
    );
    assert_eq!(
        preview.header(header::X_CONTENT_TYPE_OPTIONS).as_deref(),
        Some("nosniff")
    );
}

#[tokio::test]
async fn test_preview_of_drawing_is_an_attachment() {
    let app = TestApp::new().await;
    let response = app
        .upload("A-101.dwg", "application/octet-stream", b"AC1032", &[])
        .await;
    let file = response.data()["file"].clone();

    let preview = app
        .request("GET", &format!("/api/preview/{}", id_of(&file)), None)
        .await;
    assert_eq!(preview.status, StatusCode::OK);
    assert!(preview
        .header(header::CONTENT_DISPOSITION)
        .unwrap()
        .starts_with("attachment;"));
    assert_eq!(
        preview.header(header::X_CONTENT_TYPE_OPTIONS).as_deref(),
        Some("nosniff")
    );
}

#[tokio::test]
async fn test_malformed_query_is_json_error() {
    let app = TestApp::new().await;
    let file = upload_pdf(&app, "Detail.pdf", b"%PDF").await;

    let response = app
        .request("GET", &format!("/api/preview/{}?size=big", id_of(&file)), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "VALIDATION");

    let response = app
        .request(
            "DELETE",
            &format!("/api/files/{}?all_versions=maybe", id_of(&file)),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "VALIDATION");
}
