use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::lists::EntryRequest;
use crate::server::AppState;
use crate::util::parse_id;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_favorite))
        .route("/:usuario_id", get(list_favorites))
        .route(
            "/:usuario_id/:tmdb_id",
            put(edit_favorite).delete(remove_favorite),
        )
        .route("/:usuario_id/:tmdb_id/restore", put(restore_favorite))
}

fn pair_params(usuario_id: &str, tmdb_id: &str) -> Result<EntryRequest, ApiError> {
    let user_id = parse_id(usuario_id).ok_or_else(|| ApiError::invalid_id("user id"))?;
    let tmdb_id = parse_id(tmdb_id).ok_or_else(|| ApiError::invalid_id("tmdb_id"))?;
    Ok(EntryRequest::new(user_id, tmdb_id))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Path(usuario_id): Path<String>,
) -> ApiResult {
    let user_id = parse_id(&usuario_id).ok_or_else(|| ApiError::invalid_id("user id"))?;
    let entries = state.favorites.list_active(user_id).await?;
    Ok(ok("Favorites retrieved.", entry_dtos(entries)))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let entry = state.favorites.upsert_entry(&req).await?;
    Ok(created("Movie added to favorites.", EntryDto::from(entry)))
}

pub async fn edit_favorite(
    State(state): State<AppState>,
    Path((usuario_id, tmdb_id)): Path<(String, String)>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let mut req = pair_params(&usuario_id, &tmdb_id)?;
    req.status = body.status;

    let entry = state.favorites.set_status(&req).await?;
    Ok(ok("Favorite status updated.", EntryDto::from(entry)))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path((usuario_id, tmdb_id)): Path<(String, String)>,
) -> ApiResult {
    let req = pair_params(&usuario_id, &tmdb_id)?;
    let entry = state.favorites.soft_remove(&req).await?;
    Ok(ok("Movie removed from favorites.", EntryDto::from(entry)))
}

pub async fn restore_favorite(
    State(state): State<AppState>,
    Path((usuario_id, tmdb_id)): Path<(String, String)>,
) -> ApiResult {
    let req = pair_params(&usuario_id, &tmdb_id)?;
    let entry = state.favorites.restore(&req).await?;
    Ok(ok("Favorite restored.", EntryDto::from(entry)))
}
