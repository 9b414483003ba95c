//! `GET /health`: readiness of the process and its database.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::time::{timeout, Instant};
use tracing::warn;

use campusmart_db::{ping, DbPool};

const DATABASE_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: Readiness,
    pub latency_ms: u64,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub version: &'static str,
    pub checks: Vec<Check>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(db_pool)
}

pub async fn health(State(db_pool): State<DbPool>) -> (StatusCode, Json<HealthReport>) {
    let checks = vec![database_check(&db_pool).await];

    let status = if checks.iter().all(|check| check.status == Readiness::Ready) {
        Readiness::Ready
    } else {
        Readiness::Degraded
    };
    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    let report = HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        checks,
        checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    (code, Json(report))
}

async fn database_check(db_pool: &DbPool) -> Check {
    let started = Instant::now();
    let outcome = timeout(DATABASE_PING_TIMEOUT, ping(db_pool)).await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(format!("query failed: {error}")),
        Err(_) => Some(format!("no answer within {}s", DATABASE_PING_TIMEOUT.as_secs())),
    };

    match failure {
        None => Check {
            name: "database",
            status: Readiness::Ready,
            latency_ms,
            detail: "SELECT 1 succeeded".to_string(),
        },
        Some(detail) => {
            warn!(
                event_name = "system.health.degraded",
                correlation_id = "health",
                check = "database",
                detail = %detail,
                "readiness check failed"
            );
            Check { name: "database", status: Readiness::Degraded, latency_ms, detail }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use campusmart_db::connect_with_settings;

    use super::{health, Readiness};

    #[tokio::test]
    async fn answering_database_reports_ready() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let (code, Json(report)) = health(State(pool.clone())).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(report.status, Readiness::Ready);
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, "database");
        assert_eq!(report.version, env!("CARGO_PKG_VERSION"));

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_reports_degraded_with_503() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        pool.close().await;

        let (code, Json(report)) = health(State(pool)).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, Readiness::Degraded);
        assert!(report.checks[0].detail.starts_with("query failed"));
    }
}
