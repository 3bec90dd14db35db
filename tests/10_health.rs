mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "SmartRecruit API");
    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    let status = res.status();
    let body = res.json::<serde_json::Value>().await?;

    match status {
        StatusCode::OK => assert_eq!(body["data"]["database"], "ok"),
        StatusCode::SERVICE_UNAVAILABLE => {
            assert_eq!(body["success"], false);
            assert_eq!(body["data"]["database"], "unavailable");
        }
        other => panic!("unexpected status: {}", other),
    }
    assert!(body["data"]["timestamp"].is_string());
    Ok(())
}
