use std::sync::Arc;

use axum::{Extension, Json, Router, routing::get};
use serde::Serialize;
use shared::config::Config;
use utoipa::ToSchema;

use crate::app_state::AppState;

pub const SERVICE_NAME: &str = "Contact API";

/// Banner returned from `/`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub status: String,
    pub environment: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Service",
    responses((status = 200, description = "Service banner", body = ServiceInfo))
)]
pub async fn index(Extension(config): Extension<Arc<Config>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: SERVICE_NAME.to_string(),
        status: "ok".to_string(),
        environment: config.node_env().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn create_root_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::Value;
    use shared::config::EnvProfile;

    fn config(node_env: &str) -> Arc<Config> {
        let profile: EnvProfile = [
            ("PORT", "3000"),
            ("NODE_ENV", node_env),
            ("DATABASE_USER", "contacts"),
            ("DATABASE_PASSWORD", "secret"),
            ("DATABASE_NAME", "contacts_db"),
            ("DATABASE_HOST", "localhost"),
            ("DATABASE_TYPE", "postgres"),
            ("TYPEORM_MIGRATIONS", "false"),
            ("TYPEORM_SYNCHRONIZE", "false"),
        ]
        .into_iter()
        .collect();
        Arc::new(Config::from_profile(profile).unwrap())
    }

    #[tokio::test]
    async fn banner_reports_environment() {
        let app = create_root_router()
            .layer(Extension(config("staging")))
            .with_state(Arc::new(AppState::default()));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["name"], SERVICE_NAME);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "staging");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
