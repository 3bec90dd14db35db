#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use smartrecruit_api::auth::{generate_jwt_with_secret, Claims};

/// Secret the spawned server signs and validates tokens with
pub const JWT_SECRET: &str = "smartrecruit-integration-secret";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_smartrecruit-api"));
        cmd.env("SMARTRECRUIT_API_PORT", port.to_string())
            // Boot fast even when Postgres is absent; /health reports it
            .env("DATABASE_AUTO_MIGRATE", "false")
            .env("DATABASE_CONNECTION_TIMEOUT", "2")
            .env("SECURITY_JWT_SECRET", JWT_SECRET)
            .env("UPLOAD_DIR", std::env::temp_dir().join("smartrecruit-test-uploads"))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL from .env (loaded by the server)
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// True when the spawned server can reach Postgres
    pub async fn database_available(&self) -> Result<bool> {
        let res = reqwest::Client::new().get(self.url("/health")).send().await?;
        Ok(res.status() == StatusCode::OK)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// Direct connection for seeding, `None` when there is no database to test against
pub async fn database(server: &TestServer) -> Result<Option<PgPool>> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        return Ok(None);
    };
    if !server.database_available().await? {
        return Ok(None);
    }

    let pool = PgPoolOptions::new().max_connections(2).connect(&url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(Some(pool))
}

pub fn token_for(user_id: Uuid) -> Result<String> {
    let claims = Claims::with_expiry(user_id, None, 1);
    Ok(generate_jwt_with_secret(&claims, JWT_SECRET)?)
}

pub async fn seed_organization(pool: &PgPool, name: &str) -> Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

pub async fn seed_user(pool: &PgPool, role: &str, organization_id: Option<Uuid>) -> Result<Uuid> {
    let email = format!("{}-{}@example.test", role, Uuid::new_v4());
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, name, role, organization_id) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(&email)
    .bind(format!("Test {}", role))
    .bind(role)
    .bind(organization_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Active job with `questions` text questions; returns the job id and question ids in order
pub async fn seed_job(
    pool: &PgPool,
    organization_id: Uuid,
    created_by: Uuid,
    questions: usize,
) -> Result<(Uuid, Vec<Uuid>)> {
    let job_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO job_forms (title, status, created_by, organization_id) \
         VALUES ('Integration Engineer', 'active', $1, $2) RETURNING id",
    )
    .bind(created_by)
    .bind(organization_id)
    .fetch_one(pool)
    .await?;

    let mut ids = Vec::with_capacity(questions);
    for i in 0..questions {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO questions (job_form_id, type, label, order_index) VALUES ($1, 'text', $2, $3) RETURNING id",
        )
        .bind(job_id)
        .bind(format!("Question {}", i + 1))
        .bind(i as i32 + 1)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }
    Ok((job_id, ids))
}

/// Started but never submitted
pub async fn seed_application(pool: &PgPool, job_id: Uuid, candidate_name: &str) -> Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO applications (job_form_id, candidate_name, candidate_email, status) \
         VALUES ($1, $2, $3, 'new') RETURNING id",
    )
    .bind(job_id)
    .bind(candidate_name)
    .bind(format!("{}@example.test", Uuid::new_v4()))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn count(pool: &PgPool, sql: &str, id: Uuid) -> Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>(sql).bind(id).fetch_one(pool).await?)
}
