/// Application state shared across all routes.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub(crate) pool: Option<sqlx::PgPool>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: Option<sqlx::PgPool>) -> Self {
        Self { pool }
    }
}
