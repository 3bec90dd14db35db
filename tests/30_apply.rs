mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn unknown_job_is_not_found() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_available().await? {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }

    let missing = "00000000-0000-4000-8000-000000000000";
    let res = reqwest::get(server.url(&format!("/apply/{}", missing))).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<serde_json::Value>().await?["message"], "Job not found");
    Ok(())
}

#[tokio::test]
async fn progress_for_unknown_application_is_not_found() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_available().await? {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }

    let missing = "00000000-0000-4000-8000-000000000000";
    let res = reqwest::Client::new()
        .post(server.url(&format!("/apply/applications/{}/progress", missing)))
        .json(&json!({ "step_id": "question-1" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_job_id_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/apply/not-a-uuid")).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn submit_writes_one_application_with_its_answers_and_resume() -> Result<()> {
    let server = common::ensure_server().await?;
    let Some(pool) = common::database(server).await? else {
        eprintln!("skipping: database unavailable");
        return Ok(());
    };

    let org = common::seed_organization(&pool, "Apply Org").await?;
    let admin = common::seed_user(&pool, "admin", Some(org)).await?;
    let (job_id, questions) = common::seed_job(&pool, org, admin, 3).await?;

    let answers: Vec<_> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| json!({ "question_id": q, "value": format!("answer {}", i + 1) }))
        .collect();
    let email = format!("candidate-{}@example.test", job_id);
    let res = reqwest::Client::new()
        .post(server.url(&format!("/apply/{}/submit", job_id)))
        .json(&json!({
            "candidate_name": "Ada Lovelace",
            "candidate_email": email,
            "answers": answers,
            "resume_url": "https://files.example.test/ada.pdf"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = res.json::<serde_json::Value>().await?;
    let application_id: uuid::Uuid = body["data"]["application_id"]
        .as_str()
        .expect("application_id in response")
        .parse()?;
    assert_eq!(body["data"]["answers_saved"], 3);
    assert_eq!(body["data"]["resume_saved"], true);

    let applications = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM applications WHERE job_form_id = $1")
        .bind(job_id)
        .fetch_all(&pool)
        .await?;
    assert_eq!(applications, vec![application_id]);
    assert_eq!(
        common::count(&pool, "SELECT count(*) FROM answers WHERE application_id = $1", application_id).await?,
        3
    );
    assert_eq!(
        common::count(&pool, "SELECT count(*) FROM resumes WHERE application_id = $1", application_id).await?,
        1
    );
    Ok(())
}
