use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;

use crate::http_api::{error_response, json_response};

pub(crate) const MAPPING_ROUTE: &str = "/mapping";

/// Router for the mapping service: `GET /mapping` returns the mapping file as
/// stored, keys in file order. The file is re-read on every request.
pub(crate) fn mapping_router(mapping_file: PathBuf) -> Router {
    Router::new()
        .route(MAPPING_ROUTE, get(get_mapping))
        .with_state(Arc::new(mapping_file))
}

async fn get_mapping(State(mapping_file): State<Arc<PathBuf>>) -> Response {
    let raw = match tokio::fs::read_to_string(mapping_file.as_path()).await {
        Ok(raw) => raw,
        Err(err) => {
            log::error!("Cannot read mapping file {}: {err}", mapping_file.display());
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("cannot read mapping file: {err}"),
            );
        }
    };

    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(mapping) => json_response(StatusCode::OK, &mapping),
        Err(err) => {
            log::error!("Invalid mapping file {}: {err}", mapping_file.display());
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("invalid mapping file: {err}"),
            )
        }
    }
}
