#![allow(clippy::needless_for_each)] // Derive macro emits a for_each internally

use utoipa::OpenApi;

use crate::{
    http::problem::ProblemDetails,
    routes::{health::HealthResponse, root::ServiceInfo},
};

#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Contact API",
        version = "1.0",
        description = "Contact APIs"
    ),
    paths(
        crate::routes::root::index,
        crate::routes::health::healthz,
        crate::routes::health::readyz,
    ),
    components(
        schemas(
            HealthResponse,
            ServiceInfo,
            ProblemDetails,
        )
    ),
    tags(
        (name = "Service", description = "Service metadata"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
