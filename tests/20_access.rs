mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn anonymous_session_is_null() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/api/auth/me")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_treated_as_anonymous() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/api/auth/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.json::<serde_json::Value>().await?["data"].is_null());
    Ok(())
}

#[tokio::test]
async fn anonymous_cannot_read_permissions() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/api/permissions")).await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn anonymous_is_refused_staff_routes() -> Result<()> {
    let server = common::ensure_server().await?;

    // Refused before any handler touches the database, so this holds with or without Postgres
    let client = reqwest::Client::new();
    for path in ["/api/jobs", "/api/candidates", "/api/dashboard/stats", "/api/users", "/api/activity"] {
        let res = client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{}", path);
        assert_eq!(res.json::<serde_json::Value>().await?["message"], "Access denied: Staff only.");
    }
    Ok(())
}

#[tokio::test]
async fn upload_requires_a_video_file() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let empty = reqwest::multipart::Form::new().text("other", "value");
    let res = client.post(server.url("/api/upload/video")).multipart(empty).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<serde_json::Value>().await?["message"], "No file uploaded");

    let part = reqwest::multipart::Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")?;
    let form = reqwest::multipart::Form::new().part("file", part);
    let res = client.post(server.url("/api/upload/video")).multipart(form).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<serde_json::Value>().await?["message"], "Only video files are allowed");
    Ok(())
}
