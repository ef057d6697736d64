use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::types::*;
use crate::db::{DbError, UserRepo, UserUpdate};
use crate::server::AppState;
use crate::util::{hash_password, is_valid_email, parse_id, verify_password};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/login", post(login))
        .route("/redefinir-senha", put(reset_password))
        .route("/register", post(register))
        .route("/update/:id", put(update_user))
        .route("/delete/:id", delete(delete_user))
        .route("/restaurar", patch(restore_user))
}

fn checked_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::Validation(format!("Invalid email: {}", email)));
    }
    Ok(email.to_string())
}

fn duplicate_email(e: DbError) -> ApiError {
    match e {
        DbError::AlreadyExists(_) => ApiError::Conflict("Email already registered.".to_string()),
        other => other.into(),
    }
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult {
    let users: Vec<UserDto> = state
        .db
        .list_users()
        .await?
        .into_iter()
        .map(UserDto::from)
        .collect();
    Ok(ok("Users retrieved.", users))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let email = required(&req.email, "email")?;
    let password = required(&req.senha, "senha")?;

    let invalid = || ApiError::Unauthorized("Invalid email or password.".to_string());

    let user = match state.db.get_active_user_by_email(email).await {
        Ok(user) => user,
        Err(DbError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(password, &user.password).await? {
        warn!(user_id = user.id, "failed login");
        return Err(invalid());
    }

    info!(user_id = user.id, "user logged in");
    Ok(ok("Login successful.", UserDto::from(user)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let email = required(&req.email, "email")?;
    let new_password = required(&req.new_password, "novaSenha")?;

    let user = state
        .db
        .get_active_user_by_email(email)
        .await
        .map_err(|e| match e {
            DbError::NotFound(_) => ApiError::NotFound("Email not found.".to_string()),
            other => other.into(),
        })?;

    let hash = hash_password(new_password, state.config.password.bcrypt_cost).await?;
    state.db.set_user_password(user.id, &hash).await?;

    info!(user_id = user.id, "password reset");
    Ok(ok_empty("Password reset."))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let name = required(&req.nome, "nome")?;
    let email = checked_email(required(&req.email, "email")?)?;
    let password = required(&req.senha, "senha")?;

    let hash = hash_password(password, state.config.password.bcrypt_cost).await?;
    let user = state
        .db
        .create_user(name, &email, &hash)
        .await
        .map_err(duplicate_email)?;

    info!(user_id = user.id, "user registered");
    Ok(created("User created.", UserDto::from(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id).ok_or_else(|| ApiError::invalid_id("user id"))?;
    let Json(req) = payload?;

    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let mut update = UserUpdate {
        name: non_empty(req.nome),
        email: non_empty(req.email).map(|e| checked_email(&e)).transpose()?,
        password: None,
    };
    if let Some(password) = non_empty(req.senha) {
        update.password =
            Some(hash_password(&password, state.config.password.bcrypt_cost).await?);
    }

    if update.is_empty() {
        return Err(ApiError::Validation("Nothing to update.".to_string()));
    }

    let user = state
        .db
        .update_user(id, &update)
        .await
        .map_err(duplicate_email)?;
    Ok(ok("User updated.", UserDto::from(user)))
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id).ok_or_else(|| ApiError::invalid_id("user id"))?;
    let removed = state.db.soft_delete_user(id).await?;
    if removed > 0 {
        info!(user_id = id, "user soft-deleted");
    }
    Ok(ok_empty("User deleted."))
}

pub async fn restore_user(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload?;
    let email = required(&req.email, "email")?;

    let user = state
        .db
        .get_user_by_email(email)
        .await
        .map_err(|e| match e {
            DbError::NotFound(_) => {
                ApiError::NotFound("No user found with that email.".to_string())
            }
            other => other.into(),
        })?;

    if user.deleted_at.is_none() {
        return Err(ApiError::Conflict(
            "User is not deleted, nothing to restore.".to_string(),
        ));
    }

    state.db.restore_user(email).await?;
    info!(user_id = user.id, "user restored");
    Ok(ok_empty("User restored."))
}
