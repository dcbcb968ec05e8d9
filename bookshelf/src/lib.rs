//! A REST service storing books through `mongo-panache` active records.

mod config;
mod entity;
mod error;
mod resource;

pub use config::CliArgs;
pub use entity::{Book, BookDetail, book};
pub use error::{ApiError, ApiResult};
pub use resource::BASE_PATH;

use axum::Router;
use mongo_panache::PanacheClient;

pub fn router(client: PanacheClient) -> Router {
    Router::new()
        .nest(BASE_PATH, resource::routes(&client))
        .with_state(client)
}
