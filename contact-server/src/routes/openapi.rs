use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{app_state::AppState, http::error::ApiError, openapi::ApiDoc};

pub const SWAGGER_UI_PATH: &str = "/api";
pub const OPENAPI_JSON_PATH: &str = "/api-json";
pub const OPENAPI_YAML_PATH: &str = "/api-yaml";

async fn openapi_yaml() -> impl IntoResponse {
    match ApiDoc::openapi().to_yaml() {
        Ok(yaml) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/yaml; charset=utf-8"),
            )],
            yaml,
        )
            .into_response(),
        Err(e) => ApiError::internal_server_error(format!("YAML error: {e}")).into_response(),
    }
}

pub fn openapi_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .route(OPENAPI_YAML_PATH, get(openapi_yaml))
}
