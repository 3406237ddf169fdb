use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use amora_shared::types::api::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HealthCheck {
                name: "database".into(),
                status: HealthStatus::Healthy,
                message: None,
            },
            Err(e) => HealthCheck {
                name: "database".into(),
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            },
        },
        Err(e) => HealthCheck {
            name: "database".into(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    let uploads = if state.storage.root().is_dir() {
        HealthCheck {
            name: "uploads".into(),
            status: HealthStatus::Healthy,
            message: None,
        }
    } else {
        HealthCheck {
            name: "uploads".into(),
            status: HealthStatus::Degraded,
            message: Some("upload directory missing".into()),
        }
    };

    Json(
        HealthResponse::healthy("amora-api", env!("CARGO_PKG_VERSION"))
            .with_checks(vec![database, uploads]),
    )
}
