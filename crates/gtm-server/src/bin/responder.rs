//! OpenGTM responder binary: a thin JSON store for pushed health tables.

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use healthcheck::{HealthTable, Member};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const LISTEN_ADDR: &str = "0.0.0.0:8081";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::logging::init();
    info!("OpenGTM responder starting");

    let table = Arc::new(HealthTable::new());

    let app = Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/table", get(get_table))
        .route("/table/{pool}", put(put_pool))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(table);

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!(listen_addr = LISTEN_ADDR, "responder listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn livez() -> &'static str {
    "Healthy\n"
}

async fn readyz() -> &'static str {
    "Ready\n"
}

/// JSON dump of the stored table
async fn get_table(State(table): State<Arc<HealthTable>>) -> Response {
    match table.snapshot_json().await {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "unable to marshal health table");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Replace one pool's members with the pushed list
async fn put_pool(
    State(table): State<Arc<HealthTable>>,
    Path(pool): Path<String>,
    body: String,
) -> (StatusCode, String) {
    let members: Vec<Member> = match serde_json::from_str(&body) {
        Ok(members) => members,
        Err(e) => {
            warn!(%pool, error = %e, "unable to parse member list");
            return (StatusCode::BAD_REQUEST, "Unable to parse body\n".to_string());
        }
    };

    table.replace_pool(&pool, members).await;
    (StatusCode::OK, "OK\n".to_string())
}
