mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

async fn actions_for(pool: &sqlx::PgPool, job_id: Uuid) -> Result<Vec<String>> {
    Ok(
        sqlx::query_scalar::<_, String>("SELECT action FROM active_log WHERE target = $1 ORDER BY created_at, action")
            .bind(job_id.to_string())
            .fetch_all(pool)
            .await?,
    )
}

#[tokio::test]
async fn title_only_update_keeps_questions_and_answers() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };

    let org = common::seed_organization(&pool, "Jobs Org").await?;
    let admin = common::seed_user(&pool, "admin", Some(org)).await?;
    let (job_id, questions) = common::seed_job(&pool, org, admin, 3).await?;
    let application = common::seed_application(&pool, job_id, "Grace Hopper").await?;
    for q in &questions {
        sqlx::query("INSERT INTO answers (application_id, question_id, value) VALUES ($1, $2, 'yes')")
            .bind(application)
            .bind(q)
            .execute(&pool)
            .await?;
    }

    let res = reqwest::Client::new()
        .put(server.url(&format!("/api/jobs/{}", job_id)))
        .bearer_auth(common::token_for(admin)?)
        .json(&json!({ "title": "Eng (renamed)", "status": "active" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["title"], "Eng (renamed)");
    assert_eq!(body["data"]["questions"].as_array().map(Vec::len), Some(3));

    assert_eq!(common::count(&pool, "SELECT count(*) FROM questions WHERE job_form_id = $1", job_id).await?, 3);
    assert_eq!(
        common::count(
            &pool,
            "SELECT count(*) FROM answers WHERE application_id = $1 AND question_id IS NOT NULL",
            application
        )
        .await?,
        3
    );
    Ok(())
}

#[tokio::test]
async fn explicit_question_list_replaces_the_set() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };

    let org = common::seed_organization(&pool, "Jobs Org").await?;
    let admin = common::seed_user(&pool, "admin", Some(org)).await?;
    let (job_id, _) = common::seed_job(&pool, org, admin, 3).await?;

    let res = reqwest::Client::new()
        .put(server.url(&format!("/api/jobs/{}", job_id)))
        .bearer_auth(common::token_for(admin)?)
        .json(&json!({ "title": "Eng", "questions": [{ "type": "text", "label": "Only one" }] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(common::count(&pool, "SELECT count(*) FROM questions WHERE job_form_id = $1", job_id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn every_job_mutation_is_logged() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };

    let org = common::seed_organization(&pool, "Audit Org").await?;
    let admin = common::seed_user(&pool, "admin", Some(org)).await?;
    let client = reqwest::Client::new();
    let token = common::token_for(admin)?;

    let res = client
        .post(server.url("/api/jobs"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Audited", "questions": [{ "type": "text", "label": "Why?" }] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let job_id: Uuid = res.json::<serde_json::Value>().await?["data"]["id"]
        .as_str()
        .expect("job id")
        .parse()?;

    let res = client
        .put(server.url(&format!("/api/jobs/{}", job_id)))
        .bearer_auth(&token)
        .json(&json!({ "title": "Audited v2" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url(&format!("/api/jobs/{}/close", job_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(server.url(&format!("/api/jobs/{}", job_id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let mut actions = actions_for(&pool, job_id).await?;
    actions.sort();
    assert_eq!(actions, vec!["job.close", "job.create", "job.delete", "job.update"]);
    Ok(())
}

#[tokio::test]
async fn reviewer_cannot_update_a_job_they_created() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };

    let org = common::seed_organization(&pool, "Jobs Org").await?;
    let reviewer = common::seed_user(&pool, "reviewer", Some(org)).await?;
    let (job_id, _) = common::seed_job(&pool, org, reviewer, 1).await?;

    let res = reqwest::Client::new()
        .put(server.url(&format!("/api/jobs/{}", job_id)))
        .bearer_auth(common::token_for(reviewer)?)
        .json(&json!({ "title": "Nope" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
