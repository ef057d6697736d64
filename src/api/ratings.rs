use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::db::{DbError, RatingRepo};
use crate::server::AppState;
use crate::util::parse_id;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/all", get(list_all))
        .route("/add", post(add_rating))
        .route("/update/:usuario_id/:tmdb_id", put(update_rating))
        // `:id` is a user id on GET, a rating id on DELETE and the tmdb_id
        // on the two-segment route.
        .route("/:id", get(list_for_user).delete(delete_rating))
        .route("/:id/:usuario_id", get(get_rating))
}

fn id_param(value: &str, what: &str) -> Result<i64, ApiError> {
    parse_id(value).ok_or_else(|| ApiError::invalid_id(what))
}

fn to_dtos(ratings: Vec<crate::db::Rating>) -> Vec<RatingDto> {
    ratings.into_iter().map(RatingDto::from).collect()
}

pub async fn list_all(State(state): State<AppState>) -> ApiResult {
    let ratings = state.db.list_ratings().await?;
    Ok(ok("Ratings retrieved.", to_dtos(ratings)))
}

pub async fn list_for_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let user_id = id_param(&id, "user id")?;
    let ratings = state.db.list_ratings_by_user(user_id).await?;
    if ratings.is_empty() {
        return Err(ApiError::NotFound(
            "No ratings found for this user.".to_string(),
        ));
    }
    Ok(ok("Ratings retrieved.", to_dtos(ratings)))
}

/// A missing rating is reported as a score of zero, not as an error.
pub async fn get_rating(
    State(state): State<AppState>,
    Path((tmdb_id, usuario_id)): Path<(String, String)>,
) -> ApiResult {
    let tmdb_id = id_param(&tmdb_id, "tmdb_id")?;
    let user_id = id_param(&usuario_id, "user id")?;

    match state.db.get_rating(user_id, tmdb_id).await? {
        Some(rating) => Ok(ok("Rating retrieved.", RatingDto::from(rating))),
        None => Ok(ok("No rating yet.", json!({ "nota": 0 }))),
    }
}

pub async fn add_rating(
    State(state): State<AppState>,
    payload: Result<Json<AddRatingRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let user_id = required_id(req.usuario_id, "usuario_id")?;
    let tmdb_id = required_id(req.tmdb_id, "tmdb_id")?;
    let score = req
        .nota
        .ok_or_else(|| ApiError::Validation("nota is required.".to_string()))?;

    if state.db.get_rating(user_id, tmdb_id).await?.is_some() {
        return Err(ApiError::Conflict("Movie already rated.".to_string()));
    }

    let rating = state
        .db
        .create_rating(user_id, tmdb_id, score)
        .await
        .map_err(|e| match e {
            DbError::MissingReference(_) => {
                ApiError::NotFound(format!("Movie not found with tmdb_id: {}", tmdb_id))
            }
            other => other.into(),
        })?;

    info!(user_id, tmdb_id, score, "rating added");
    Ok(created("Rating added.", RatingDto::from(rating)))
}

pub async fn update_rating(
    State(state): State<AppState>,
    Path((usuario_id, tmdb_id)): Path<(String, String)>,
    payload: Result<Json<UpdateRatingRequest>, JsonRejection>,
) -> ApiResult {
    let user_id = id_param(&usuario_id, "user id")?;
    let tmdb_id = id_param(&tmdb_id, "tmdb_id")?;
    let Json(req) = payload?;
    let score = req
        .nota
        .ok_or_else(|| ApiError::Validation("nota is required.".to_string()))?;

    if state.db.update_rating(user_id, tmdb_id, score).await? == 0 {
        return Err(ApiError::NotFound(
            "Rating not found for this movie and user.".to_string(),
        ));
    }
    Ok(ok_empty("Rating updated."))
}

pub async fn delete_rating(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = id_param(&id, "rating id")?;
    state.db.soft_delete_rating(id).await?;
    Ok(ok_empty("Rating deleted."))
}
