use crate::data::{ScheduleConfig, ScheduleResult};
use crate::export::{Exporter, MatrixCsv, SimpleCsv};
use crate::report;
use crate::solver::{self, SolveError};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::{routing::post, Json, Router};
use log::info;
use serde::Deserialize;

/// Runs one optimization on a blocking worker so the solver cannot stall
/// the async runtime.
async fn run_solve(config: ScheduleConfig) -> Result<ScheduleResult, (StatusCode, String)> {
    let outcome = tokio::task::spawn_blocking(move || solver::solve(&config))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    outcome.map_err(|e| match e {
        SolveError::Config(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        SolveError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    })
}

async fn solve_handler(
    Json(config): Json<ScheduleConfig>,
) -> Result<Json<ScheduleResult>, (StatusCode, String)> {
    run_solve(config).await.map(Json)
}

#[derive(Debug, Deserialize)]
struct ReportParams {
    #[serde(default)]
    quiet: bool,
}

async fn report_handler(
    Query(params): Query<ReportParams>,
    Json(config): Json<ScheduleConfig>,
) -> Result<([(header::HeaderName, &'static str); 1], String), (StatusCode, String)> {
    let result = run_solve(config.clone()).await?;
    let body = report::render_report(&config, &result, params.quiet);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Csv,
    Matrix,
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    #[serde(default)]
    format: ExportFormat,
}

async fn export_handler(
    Query(params): Query<ExportParams>,
    Json(config): Json<ScheduleConfig>,
) -> Result<([(header::HeaderName, &'static str); 1], String), (StatusCode, String)> {
    let result = run_solve(config).await?;
    let body = match params.format {
        ExportFormat::Csv => SimpleCsv.export(&result),
        ExportFormat::Matrix => MatrixCsv::default().export(&result),
    };
    Ok(([(header::CONTENT_TYPE, "text/csv")], body))
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/roster/solve", post(solve_handler))
        .route("/v1/roster/report", post(report_handler))
        .route("/v1/roster/export", post(export_handler))
}

pub async fn run_server() {
    let app = router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080")
        .await
        .unwrap();

    info!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn config_json() -> String {
        serde_json::json!({
            "start_date": "2026-01-05",
            "duration_weeks": 1,
            "staffing_requirements": [1, 1, 1, 1, 1, 0, 0],
            "teams": [{"name": "T", "target_percentage": 1.0}],
            "employees": [
                {"name": "Alice", "team": "T", "available_days": [0, 1, 2, 3, 4]},
                {"name": "Bob", "team": "T", "available_days": [0, 1, 2, 3, 4]}
            ]
        })
        .to_string()
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn solve_endpoint_returns_an_optimal_schedule() {
        let response = router()
            .oneshot(post_json("/v1/roster/solve", config_json()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["status"], "optimal");
        assert_eq!(value["total_shifts_required"], 5);
        assert_eq!(value["daily_assignments"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn invalid_percentages_are_rejected() {
        let body = config_json().replace("1.0", "0.7");
        let response = router()
            .oneshot(post_json("/v1/roster/solve", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn export_endpoint_returns_csv() {
        let response = router()
            .oneshot(post_json("/v1/roster/export?format=csv", config_json()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Date,Day_of_Week,Employee\n"));
    }

    #[tokio::test]
    async fn report_endpoint_returns_text() {
        let response = router()
            .oneshot(post_json("/v1/roster/report?quiet=true", config_json()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("SHIFT SCHEDULE OPTIMIZATION RESULTS"));
    }
}
