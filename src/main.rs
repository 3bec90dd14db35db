use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use smartrecruit_api::config::{config, AppConfig};
use smartrecruit_api::database::DatabaseManager;
use smartrecruit_api::handlers::{elevated, protected, public};
use smartrecruit_api::middleware::{require_staff_session, session_middleware};
use smartrecruit_api::state::AppState;
use smartrecruit_api::{is_development, is_production};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SMTP_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting SmartRecruit API in {:?} mode", config.environment);

    if is_production!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set in production");
    }

    if config.database.auto_migrate {
        // A database that is down at boot is reported by /health, not fatal
        if let Err(e) = DatabaseManager::migrate().await {
            tracing::warn!("Skipping migrations: {}", e);
        }
    }

    let state = AppState::from_config(config)?;
    let app = app(config, state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("SmartRecruit API listening on http://{}", bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    DatabaseManager::close().await;
    Ok(())
}

fn app(config: &AppConfig, state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/me", get(protected::auth::auth_me))
        .merge(apply_routes(config))
        .merge(upload_routes(config))
        // Staff and administrative API
        .merge(staff_routes())
        .nest_service("/uploads", ServeDir::new(&config.uploads.dir))
        .with_state(state)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config))
                .layer(axum::middleware::from_fn(session_middleware)),
        )
}

fn apply_routes(config: &AppConfig) -> Router<AppState> {
    use public::apply;

    Router::new()
        .route("/apply/:job_id", get(apply::apply_form))
        .route("/apply/:job_id/begin", post(apply::apply_begin))
        .route("/apply/:job_id/submit", post(apply::apply_submit))
        .route("/apply/applications/:id/progress", post(apply::apply_progress))
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
}

fn upload_routes(config: &AppConfig) -> Router<AppState> {
    // Multipart framing adds a little on top of the file itself
    let limit = config.uploads.max_video_bytes + 64 * 1024;

    Router::new()
        .route("/api/upload/video", post(public::upload_video))
        .layer(DefaultBodyLimit::max(limit))
}

/// Everything below requires a staff session before the handler runs
fn staff_routes() -> Router<AppState> {
    Router::new()
        .merge(job_routes())
        .merge(application_routes())
        .merge(interview_routes())
        .merge(notification_routes())
        .merge(dashboard_routes())
        .merge(admin_routes())
        .route_layer(axum::middleware::from_fn(require_staff_session))
}

fn job_routes() -> Router<AppState> {
    use protected::jobs;

    Router::new()
        .route("/api/jobs", get(jobs::jobs_list).post(jobs::jobs_create))
        .route(
            "/api/jobs/:id",
            get(jobs::jobs_get).put(jobs::jobs_update).delete(jobs::jobs_delete),
        )
        .route("/api/jobs/:id/close", post(jobs::jobs_close))
        .route("/api/organization/users", get(jobs::organization_users))
}

fn application_routes() -> Router<AppState> {
    use protected::{applications, candidates, evaluations};

    Router::new()
        .route("/api/applications/incomplete", get(applications::incomplete_list))
        .route("/api/applications/:id/interviews", get(applications::application_interviews))
        .route("/api/applications/:id/assignments", get(applications::application_assignments))
        .route(
            "/api/applications/:id/hr-evaluation",
            get(applications::hr_evaluation_get).put(applications::hr_evaluation_put),
        )
        .route("/api/candidates", get(candidates::candidates_list))
        .route("/api/candidates/:id", get(candidates::candidates_get))
        .route("/api/evaluations", get(evaluations::evaluations_list))
}

fn interview_routes() -> Router<AppState> {
    use protected::{assignments, interviews};

    Router::new()
        .route("/api/interviews", post(interviews::interviews_create))
        .route(
            "/api/interviews/:id",
            get(interviews::interviews_get).delete(interviews::interviews_delete),
        )
        .route("/api/interviews/:id/analyze", post(interviews::interviews_analyze))
        .route("/api/assignments", post(assignments::assignments_create))
        .route(
            "/api/assignments/:id",
            get(assignments::assignments_get).delete(assignments::assignments_delete),
        )
}

fn notification_routes() -> Router<AppState> {
    use protected::notifications;

    Router::new()
        .route("/api/notifications", get(notifications::notifications_list))
        .route("/api/notifications/unread-count", get(notifications::notifications_unread_count))
        .route("/api/notifications/read-all", post(notifications::notifications_mark_all_read))
        .route("/api/notifications/:id/read", post(notifications::notifications_mark_read))
}

fn dashboard_routes() -> Router<AppState> {
    use protected::{auth, dashboard};

    Router::new()
        .route("/api/permissions", get(auth::permissions_get))
        .route("/api/dashboard/stats", get(dashboard::dashboard_stats))
        .route("/api/dashboard/recent-candidates", get(dashboard::recent_candidates))
}

fn admin_routes() -> Router<AppState> {
    use elevated::{activity, email, settings, users};

    Router::new()
        .route("/api/settings", get(settings::settings_get).put(settings::settings_put))
        .route("/api/email/interview-invitation", post(email::send_interview_invitation))
        .route("/api/users", get(users::users_list))
        .route("/api/users/:id/status", put(users::users_set_status))
        .route("/api/users/:id/role", put(users::users_set_role))
        .route("/api/activity", get(activity::activity_list))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if is_development!() || config.security.permissive_cors {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "SmartRecruit API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Applicant tracking API with role-scoped access and notification routing",
            "endpoints": {
                "apply": ["/apply/:job_id", "/apply/:job_id/begin", "/apply/:job_id/submit"],
                "uploads": ["/api/upload/video"],
                "jobs": ["/api/jobs", "/api/jobs/:id", "/api/organization/users"],
                "candidates": ["/api/candidates", "/api/applications/incomplete", "/api/evaluations"],
                "interviews": ["/api/interviews", "/api/assignments"],
                "notifications": ["/api/notifications"],
                "dashboard": ["/api/dashboard/stats", "/api/dashboard/recent-candidates"],
                "admin": ["/api/settings", "/api/users", "/api/activity", "/api/email/interview-invitation"]
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match DatabaseManager::health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": timestamp, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": { "status": "degraded", "timestamp": timestamp, "database": "unavailable" }
                })),
            )
        }
    }
}
