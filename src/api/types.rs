use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::{Comment, EntryStatus, ListEntry, Rating, User};
use crate::util::lenient_id;

/// Every response body, success or failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn reply<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: Option<T>,
) -> Response {
    let body = Envelope {
        success: true,
        message: message.into(),
        data,
    };
    (status, Json(body)).into_response()
}

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    reply(StatusCode::OK, message, Some(data))
}

pub fn ok_empty(message: impl Into<String>) -> Response {
    reply::<()>(StatusCode::OK, message, None)
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    reply(StatusCode::CREATED, message, Some(data))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EntryDto {
    pub usuario_id: i64,
    pub tmdb_id: i64,
    pub status: Option<EntryStatus>,
    pub deleted_at: Option<String>,
}

impl From<ListEntry> for EntryDto {
    fn from(entry: ListEntry) -> Self {
        Self {
            usuario_id: entry.key.user_id,
            tmdb_id: entry.key.tmdb_id,
            status: entry.status,
            deleted_at: entry.state.deleted_at().map(|t| t.to_rfc3339()),
        }
    }
}

pub fn entry_dtos(entries: Vec<ListEntry>) -> Vec<EntryDto> {
    entries.into_iter().map(EntryDto::from).collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsDto {
    pub exists: bool,
}

/// A user as the API shows it. The password hash never leaves the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub created_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nome: user.name,
            email: user.email,
            created_at: user.created,
            deleted_at: user.deleted_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentDto {
    pub id: i64,
    pub usuario_id: i64,
    pub tmdb_id: i64,
    pub comentario: String,
    pub created_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl From<Comment> for CommentDto {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            usuario_id: c.user_id,
            tmdb_id: c.tmdb_id,
            comentario: c.body,
            created_at: c.created,
            deleted_at: c.deleted_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingDto {
    pub id: i64,
    pub usuario_id: i64,
    pub tmdb_id: i64,
    pub nota: i64,
    pub created_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl From<Rating> for RatingDto {
    fn from(r: Rating) -> Self {
        Self {
            id: r.id,
            usuario_id: r.user_id,
            tmdb_id: r.tmdb_id,
            nota: r.score,
            created_at: r.created,
            deleted_at: r.deleted_at,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub senha: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RegisterRequest {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub senha: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    #[serde(rename = "novaSenha")]
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateUserRequest {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub senha: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MovieRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub tmdb_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AddCommentRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub usuario_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tmdb_id: Option<i64>,
    pub comentario: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateCommentRequest {
    pub comentario: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AddRatingRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub usuario_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tmdb_id: Option<i64>,
    pub nota: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateRatingRequest {
    pub nota: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Trimmed, non-empty text field.
pub fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, super::ApiError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| super::ApiError::Validation(format!("{} is required.", name)))
}

/// Present, positive id field.
pub fn required_id(value: Option<i64>, name: &str) -> Result<i64, super::ApiError> {
    value
        .filter(|id| *id > 0)
        .ok_or_else(|| super::ApiError::invalid_id(name))
}
