use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::db::EntryStatus;
use crate::lists::{EntryRequest, Scope};
use crate::server::AppState;
use crate::util::parse_id;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/all", get(list_all))
        .route("/watchlist/:id", get(list_for_user))
        .route("/watched/:id", get(list_watched))
        .route("/to-watch/:id", get(list_to_watch))
        .route("/checkFilmInList", post(check_film_in_list))
        .route("/film", post(upsert_film))
        .route("/add", post(add_film))
        .route("/mark", put(mark_watched))
        .route("/restore", put(restore))
        .route("/remove", delete(soft_remove))
        .route("/remove/:usuario_id/:tmdb_id", delete(hard_remove))
}

fn user_id_param(id: &str) -> Result<i64, ApiError> {
    parse_id(id).ok_or_else(|| ApiError::invalid_id("user id"))
}

pub async fn list_all(State(state): State<AppState>) -> ApiResult {
    let entries = state.watchlist.list_all_active().await?;
    Ok(ok("Lists retrieved.", entry_dtos(entries)))
}

pub async fn list_for_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let user_id = user_id_param(&id)?;
    let entries = state.watchlist.list_active(user_id).await?;
    if entries.is_empty() {
        return Err(ApiError::NotFound("No movies found in the watchlist.".to_string()));
    }
    Ok(ok("Watchlist retrieved.", entry_dtos(entries)))
}

async fn list_with_status(state: AppState, id: String, status: EntryStatus) -> ApiResult {
    let user_id = user_id_param(&id)?;
    let entries = state.watchlist.list_by_status(user_id, status).await?;
    if entries.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No {} movies found in the watchlist.",
            status.as_str()
        )));
    }
    Ok(ok(
        format!("{} movies retrieved.", status.as_str()),
        entry_dtos(entries),
    ))
}

pub async fn list_watched(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    list_with_status(state, id, EntryStatus::Watched).await
}

pub async fn list_to_watch(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    list_with_status(state, id, EntryStatus::ToWatch).await
}

pub async fn check_film_in_list(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let key = req.key()?;
    let exists = state.watchlist.exists(key, Scope::Active).await?;
    debug!(user_id = key.user_id, tmdb_id = key.tmdb_id, exists, "checked watchlist");

    let message = if exists {
        "Movie found in the list."
    } else {
        "Movie not found in the list."
    };
    Ok(ok(message, ExistsDto { exists }))
}

pub async fn upsert_film(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let entry = state.watchlist.upsert_entry(&req).await?;
    Ok(created("Movie saved to the watchlist.", EntryDto::from(entry)))
}

pub async fn add_film(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let entry = state.watchlist.add_entry(&req).await?;
    Ok(created("Movie added to the watchlist.", EntryDto::from(entry)))
}

pub async fn mark_watched(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let entry = state.watchlist.mark_watched(&req).await?;
    Ok(ok("Movie marked as watched.", EntryDto::from(entry)))
}

pub async fn restore(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let entry = state.watchlist.restore(&req).await?;
    Ok(ok("Movie restored to the watchlist.", EntryDto::from(entry)))
}

pub async fn soft_remove(
    State(state): State<AppState>,
    payload: Result<Json<EntryRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let entry = state.watchlist.soft_remove(&req).await?;
    Ok(ok("Movie removed from the watchlist.", EntryDto::from(entry)))
}

pub async fn hard_remove(
    State(state): State<AppState>,
    Path((usuario_id, tmdb_id)): Path<(String, String)>,
) -> ApiResult {
    let user_id = user_id_param(&usuario_id)?;
    let tmdb_id = parse_id(&tmdb_id).ok_or_else(|| ApiError::invalid_id("tmdb_id"))?;
    state
        .watchlist
        .hard_remove(&EntryRequest::new(user_id, tmdb_id))
        .await?;
    Ok(ok_empty("Movie deleted from the watchlist."))
}
