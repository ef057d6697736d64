use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::db::CommentRepo;
use crate::server::AppState;
use crate::util::parse_id;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_comment))
        .route("/update/:id", put(update_comment))
        .route("/:id", get(list_for_movie).delete(delete_comment))
}

/// `:id` is the movie's tmdb_id on GET and the comment id on DELETE.
pub async fn list_for_movie(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let tmdb_id = parse_id(&id).ok_or_else(|| ApiError::invalid_id("tmdb_id"))?;
    let comments: Vec<CommentDto> = state
        .db
        .list_comments_for_movie(tmdb_id)
        .await?
        .into_iter()
        .map(CommentDto::from)
        .collect();

    if comments.is_empty() {
        return Err(ApiError::NotFound(
            "No comments found for this movie.".to_string(),
        ));
    }
    Ok(ok("Comments retrieved.", comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    payload: Result<Json<AddCommentRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let user_id = required_id(req.usuario_id, "usuario_id")?;
    let tmdb_id = required_id(req.tmdb_id, "tmdb_id")?;
    let body = required(&req.comentario, "comentario")?;

    let comment = state.db.create_comment(user_id, tmdb_id, body).await?;
    Ok(created("Comment added.", CommentDto::from(comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCommentRequest>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id).ok_or_else(|| ApiError::invalid_id("comment id"))?;
    let Json(req) = payload?;
    let body = required(&req.comentario, "comentario")?;

    let comment = state.db.update_comment(id, body).await?;
    Ok(ok("Comment updated.", CommentDto::from(comment)))
}

pub async fn delete_comment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id).ok_or_else(|| ApiError::invalid_id("comment id"))?;
    state.db.soft_delete_comment(id).await?;
    Ok(ok_empty("Comment deleted."))
}
