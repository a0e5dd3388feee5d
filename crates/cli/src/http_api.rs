use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use supply_protocol::serialize_json;
use supply_search::QueryResolver;

pub(crate) const DATA_ROUTE: &str = "/supply-chain-data";
pub(crate) const HEALTH_ROUTE: &str = "/health";

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serialize_json(body) {
        Ok(raw) => (status, [(CONTENT_TYPE, "application/json")], raw).into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to encode response: {err}"),
        ),
    }
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    mapping_entries: usize,
}

/// Router for the retrieval service: `GET /supply-chain-data?query=...`.
pub(crate) fn retrieval_router(resolver: QueryResolver) -> Router {
    Router::new()
        .route(DATA_ROUTE, get(supply_chain_data))
        .route(HEALTH_ROUTE, get(health))
        .with_state(resolver)
}

async fn supply_chain_data(
    State(resolver): State<QueryResolver>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = params.get("query").cloned().unwrap_or_default();
    if query.is_empty() {
        log::error!("Missing query parameter");
        return error_response(StatusCode::BAD_REQUEST, "Missing query");
    }

    // Resolution reads dataset files synchronously.
    match tokio::task::spawn_blocking(move || resolver.resolve(&query)).await {
        Ok(result) => {
            log::debug!("Returning data: {}", result.to_json());
            json_response(StatusCode::OK, &result)
        }
        Err(err) => {
            log::error!("Resolution task failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "resolution failed")
        }
    }
}

async fn health(State(resolver): State<QueryResolver>) -> Response {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            mapping_entries: resolver.mapping().snapshot().len(),
        },
    )
}
