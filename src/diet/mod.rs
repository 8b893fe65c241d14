pub mod dto;
pub mod handlers;
pub mod lenient;
pub mod model;
pub mod payload;
pub mod selection;
pub mod services;
pub mod sessions;

use crate::state::AppState;
use axum::Router;

pub fn router(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes(max_body_bytes))
}
