use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::db::{DbError, MovieRepo};
use crate::server::AppState;
use crate::util::parse_id;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies))
        .route("/add", post(add_movie))
        .route("/:tmdb_id", get(get_movie).delete(delete_movie))
}

fn tmdb_param(tmdb_id: &str) -> Result<i64, ApiError> {
    parse_id(tmdb_id).ok_or_else(|| ApiError::invalid_id("tmdb_id"))
}

pub async fn list_movies(State(state): State<AppState>) -> ApiResult {
    let movies = state.db.list_movies().await?;
    Ok(ok("Movies retrieved.", movies))
}

pub async fn add_movie(
    State(state): State<AppState>,
    payload: Result<Json<MovieRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let tmdb_id = required_id(req.tmdb_id, "tmdb_id")?;

    let movie = state.db.create_movie(tmdb_id).await.map_err(|e| match e {
        DbError::AlreadyExists(_) => ApiError::Conflict("Movie already exists.".to_string()),
        other => other.into(),
    })?;

    info!(tmdb_id, "movie added");
    Ok(created("Movie added.", movie))
}

pub async fn get_movie(State(state): State<AppState>, Path(tmdb_id): Path<String>) -> ApiResult {
    let tmdb_id = tmdb_param(&tmdb_id)?;
    let movie = state.db.get_movie(tmdb_id).await?;
    Ok(ok("Movie retrieved.", movie))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(tmdb_id): Path<String>,
) -> ApiResult {
    let tmdb_id = tmdb_param(&tmdb_id)?;

    let removed = state.db.delete_movie(tmdb_id).await.map_err(|e| match e {
        DbError::MissingReference(_) => {
            ApiError::Conflict("Movie is still referenced and cannot be deleted.".to_string())
        }
        other => other.into(),
    })?;

    if removed == 0 {
        return Err(ApiError::NotFound("Movie not found.".to_string()));
    }
    info!(tmdb_id, "movie deleted");
    Ok(ok_empty("Movie deleted."))
}
