mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

struct TwoOrganizations {
    admin_a: Uuid,
    super_admin: Uuid,
    application_b: Uuid,
    interview_b: Uuid,
    assignment_b: Uuid,
}

async fn seed(pool: &sqlx::PgPool) -> Result<TwoOrganizations> {
    let org_a = common::seed_organization(pool, "Org A").await?;
    let org_b = common::seed_organization(pool, "Org B").await?;
    let admin_a = common::seed_user(pool, "admin", Some(org_a)).await?;
    let admin_b = common::seed_user(pool, "admin", Some(org_b)).await?;
    let super_admin = common::seed_user(pool, "super-admin", None).await?;

    let (job_b, _) = common::seed_job(pool, org_b, admin_b, 1).await?;
    let application_b = common::seed_application(pool, job_b, "Barbara Liskov").await?;
    let interview_b = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO interviews (application_id, audio_or_video_url) VALUES ($1, 'https://media.example.test/i.mp4') \
         RETURNING id",
    )
    .bind(application_b)
    .fetch_one(pool)
    .await?;
    let assignment_b = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO assignments (application_id, type, text_fields) VALUES ($1, 'text_only', 'done') RETURNING id",
    )
    .bind(application_b)
    .fetch_one(pool)
    .await?;

    Ok(TwoOrganizations { admin_a, super_admin, application_b, interview_b, assignment_b })
}

async fn get(server: &common::TestServer, user: Uuid, path: &str) -> Result<(StatusCode, Value)> {
    let res = reqwest::Client::new()
        .get(server.url(path))
        .bearer_auth(common::token_for(user)?)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn admin_never_sees_another_organizations_rows() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };
    let fx = seed(&pool).await?;

    let (status, body) = get(server, fx.admin_a, "/api/candidates").await?;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().cloned().unwrap_or_default();
    assert!(listed.iter().all(|c| c["id"] != fx.application_b.to_string()));

    let (status, _) = get(server, fx.admin_a, "/api/applications/incomplete").await?;
    assert_eq!(status, StatusCode::OK);

    for path in [
        format!("/api/candidates/{}", fx.application_b),
        format!("/api/interviews/{}", fx.interview_b),
        format!("/api/assignments/{}", fx.assignment_b),
        format!("/api/applications/{}/interviews", fx.application_b),
        format!("/api/applications/{}/assignments", fx.application_b),
    ] {
        let (status, _) = get(server, fx.admin_a, &path).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn super_admin_sees_every_organization() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };
    let fx = seed(&pool).await?;

    let (status, body) = get(server, fx.super_admin, &format!("/api/candidates/{}", fx.application_b)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], fx.application_b.to_string());

    let (status, _) = get(server, fx.super_admin, &format!("/api/interviews/{}", fx.interview_b)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(server, fx.super_admin, &format!("/api/assignments/{}", fx.assignment_b)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn incomplete_list_reports_latest_progress_event() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };

    let org = common::seed_organization(&pool, "Progress Org").await?;
    let admin = common::seed_user(&pool, "admin", Some(org)).await?;
    let (job_id, questions) = common::seed_job(&pool, org, admin, 4).await?;
    let application = common::seed_application(&pool, job_id, "Edsger Dijkstra").await?;
    for q in &questions[..2] {
        sqlx::query("INSERT INTO answers (application_id, question_id, value) VALUES ($1, $2, 'x')")
            .bind(application)
            .bind(q)
            .execute(&pool)
            .await?;
    }
    for (step, age) in [("question-1", "10 minutes"), ("voice-recording-2", "1 minute")] {
        sqlx::query(
            "INSERT INTO application_progress_events (application_id, step_id, created_at) \
             VALUES ($1, $2, now() - $3::interval)",
        )
        .bind(application)
        .bind(step)
        .bind(age)
        .execute(&pool)
        .await?;
    }

    let (status, body) = get(server, admin, "/api/applications/incomplete").await?;
    assert_eq!(status, StatusCode::OK);
    let entry = body["data"]["applications"]
        .as_array()
        .and_then(|apps| apps.iter().find(|a| a["id"] == application.to_string()))
        .cloned()
        .expect("seeded application listed");
    assert_eq!(entry["stoppedAt"], "voice-recording-2");
    assert_eq!(entry["completionPercentage"], 50);
    assert_eq!(entry["answeredCount"], 2);
    Ok(())
}
