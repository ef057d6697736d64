pub mod comments;
pub mod error;
pub mod favorites;
pub mod movies;
pub mod ratings;
pub mod types;
pub mod users;
pub mod watchlist;

pub use error::{ApiError, ApiResult};
pub use types::Envelope;

use axum::Router;

use crate::server::AppState;

pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/usuarios", users::routes())
        .nest("/filmes", movies::routes())
        .nest("/comentarios", comments::routes())
        .nest("/avaliacoes", ratings::routes())
        .nest("/lista_assistir", watchlist::routes())
        .nest("/listas_favoritas", favorites::routes())
}
