use axum::{
    extract::Request,
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tower::{util::MapRequest, ServiceExt};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::ApiError;
use crate::config::Config;
use crate::db::{ListKind, SqliteRepository};
use crate::lists::ListLifecycle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<SqliteRepository>,
    pub watchlist: ListLifecycle,
    pub favorites: ListLifecycle,
}

impl AppState {
    pub fn new(config: Config, db: Arc<SqliteRepository>) -> Self {
        Self {
            config: Arc::new(config),
            watchlist: ListLifecycle::new(db.clone(), ListKind::Watchlist),
            favorites: ListLifecycle::new(db.clone(), ListKind::Favorites),
            db,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    crate::api::build_api_router()
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The router wrapped in path normalisation, which has to see the request
/// before route matching does.
pub type App = MapRequest<Router, fn(Request) -> Request>;

pub fn build_app(state: AppState) -> App {
    let normalize: fn(Request) -> Request = crate::middleware::normalize_path;
    ServiceExt::<Request>::map_request(build_router(state), normalize)
}

async fn fallback_handler() -> ApiError {
    ApiError::NotFound("Route not found.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};

    async fn test_app() -> App {
        let db = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let mut config = Config::default();
        config.password.bcrypt_cost = 4;
        build_app(AppState::new(config, db))
    }

    async fn send(
        app: &App,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn register(app: &App, email: &str) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/usuarios/register",
            Some(json!({ "nome": "Carla", "email": email, "senha": "pipoca123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route_is_enveloped() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], json!(false));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_paths_are_normalized_before_routing() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "//lista_assistir/all/", None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["success"], json!(true));
        let (status, _) = send(&app, "GET", "/filmes//", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_watchlist_lifecycle_over_http() {
        let app = test_app().await;
        let user = register(&app, "carla@example.com").await;
        let pair = json!({ "usuario_id": user, "tmdb_id": 42 });

        let (status, body) = send(
            &app,
            "POST",
            "/lista_assistir/film",
            Some(json!({ "usuario_id": user, "tmdb_id": "42", "status": "to_watch" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("to_watch"));
        assert_eq!(body["data"]["deleted_at"], Value::Null);

        let (status, body) = send(
            &app,
            "POST",
            "/lista_assistir/checkFilmInList",
            Some(pair.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["exists"], json!(true));

        let (status, _) = send(&app, "PUT", "/lista_assistir/mark", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "PUT", "/lista_assistir/mark", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));

        let (status, body) =
            send(&app, "GET", &format!("/lista_assistir/watched/{}", user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        let (status, _) =
            send(&app, "GET", &format!("/lista_assistir/to-watch/{}", user), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, "DELETE", "/lista_assistir/remove", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], Value::Null);
        assert!(body["data"]["deleted_at"].is_string());
        let (status, _) = send(&app, "DELETE", "/lista_assistir/remove", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&app, "GET", &format!("/lista_assistir/watchlist/{}", user), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "PUT", "/lista_assistir/restore", Some(pair.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], Value::Null);
        assert_eq!(body["data"]["deleted_at"], Value::Null);

        let (status, body) =
            send(&app, "GET", &format!("/lista_assistir/watchlist/{}", user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let uri = format!("/lista_assistir/remove/{}/42", user);
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/lista_assistir/all", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watchlist_validation() {
        let app = test_app().await;
        let user = register(&app, "dani@example.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/lista_assistir/film",
            Some(json!({ "usuario_id": user, "tmdb_id": 42 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));

        let (status, _) = send(&app, "GET", "/lista_assistir/watchlist/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "DELETE", "/lista_assistir/remove/0/42", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("PUT")
            .uri("/lista_assistir/mark")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Unknown user is a foreign-key miss.
        let (status, _) = send(
            &app,
            "POST",
            "/lista_assistir/film",
            Some(json!({ "usuario_id": user + 50, "tmdb_id": 42, "status": "watched" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_watchlist_add_rejects_duplicate() {
        let app = test_app().await;
        let user = register(&app, "edu@example.com").await;
        let req = json!({ "usuario_id": user, "tmdb_id": 7, "status": "para assistir" });

        let (status, body) = send(&app, "POST", "/lista_assistir/add", Some(req.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], json!("to_watch"));
        let (status, _) = send(&app, "POST", "/lista_assistir/add", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_favorites_routes() {
        let app = test_app().await;
        let user = register(&app, "fabi@example.com").await;

        let (status, _) = send(
            &app,
            "POST",
            "/listas_favoritas/add",
            Some(json!({ "usuario_id": user, "tmdb_id": 99, "status": "watched" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/listas_favoritas/{}/99", user);
        let (status, body) = send(&app, "PUT", &uri, Some(json!({ "status": "to_watch" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("to_watch"));

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "PUT", &uri, Some(json!({ "status": "watched" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "GET", &format!("/listas_favoritas/{}", user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, "PUT", &format!("{}/restore", uri), None).await;
        assert_eq!(status, StatusCode::OK);

        // Favorites never show up in the watchlist.
        let (_, body) = send(&app, "GET", "/lista_assistir/all", None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_routes() {
        let app = test_app().await;
        let user = register(&app, "gabi@example.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/usuarios/register",
            Some(json!({ "nome": "Gabi", "email": "gabi@example.com", "senha": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Email already registered."));

        let (status, body) = send(
            &app,
            "POST",
            "/usuarios/login",
            Some(json!({ "email": "gabi@example.com", "senha": "pipoca123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], json!(user));
        assert!(body["data"].get("senha").is_none());
        assert!(body["data"].get("password").is_none());

        let (status, _) = send(
            &app,
            "POST",
            "/usuarios/login",
            Some(json!({ "email": "gabi@example.com", "senha": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            "PUT",
            "/usuarios/redefinir-senha",
            Some(json!({ "email": "gabi@example.com", "novaSenha": "nova" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            "POST",
            "/usuarios/login",
            Some(json!({ "email": "gabi@example.com", "senha": "nova" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/usuarios/update/{}", user),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(
            &app,
            "PUT",
            &format!("/usuarios/update/{}", user),
            Some(json!({ "nome": "Gabriela" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["nome"], json!("Gabriela"));

        let restore = json!({ "email": "gabi@example.com" });
        let (status, _) = send(&app, "PATCH", "/usuarios/restaurar", Some(restore.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "DELETE", &format!("/usuarios/delete/{}", user), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/usuarios", None).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, _) = send(&app, "PATCH", "/usuarios/restaurar", Some(restore)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            "PATCH",
            "/usuarios/restaurar",
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_movie_comment_rating_routes() {
        let app = test_app().await;
        let user = register(&app, "hugo@example.com").await;

        let (status, _) = send(&app, "POST", "/filmes/add", Some(json!({ "tmdb_id": 603 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "POST", "/filmes/add", Some(json!({ "tmdb_id": 603 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = send(&app, "GET", "/filmes/603", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tmdb_id"], json!(603));
        let (status, _) = send(&app, "GET", "/filmes/604", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/comentarios/603", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(
            &app,
            "POST",
            "/comentarios/add",
            Some(json!({ "usuario_id": user, "tmdb_id": 603, "comentario": "Classic." })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let comment_id = body["data"]["id"].as_i64().unwrap();
        let (status, body) = send(
            &app,
            "PUT",
            &format!("/comentarios/update/{}", comment_id),
            Some(json!({ "comentario": "A classic." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["comentario"], json!("A classic."));
        let (status, body) = send(&app, "GET", "/comentarios/603", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        for (user_id, tmdb_id) in [(user + 100, 603), (user, 999)] {
            let (status, _) = send(
                &app,
                "POST",
                "/comentarios/add",
                Some(json!({ "usuario_id": user_id, "tmdb_id": tmdb_id, "comentario": "?" })),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let (status, body) = send(&app, "GET", &format!("/avaliacoes/603/{}", user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["nota"], json!(0));

        let rating = json!({ "usuario_id": user, "tmdb_id": 603, "nota": 5 });
        let (status, _) = send(&app, "POST", "/avaliacoes/add", Some(rating.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "POST", "/avaliacoes/add", Some(rating)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(
            &app,
            "POST",
            "/avaliacoes/add",
            Some(json!({ "usuario_id": user, "tmdb_id": "abc", "nota": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(
            &app,
            "POST",
            "/avaliacoes/add",
            Some(json!({ "usuario_id": user, "tmdb_id": 777, "nota": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/avaliacoes/update/{}/603", user),
            Some(json!({ "nota": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", &format!("/avaliacoes/{}", user), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["nota"], json!(4));
        let rating_id = body["data"][0]["id"].as_i64().unwrap();

        // Still referenced by the comment and the rating.
        let (status, _) = send(&app, "DELETE", "/filmes/603", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "DELETE", &format!("/avaliacoes/{}", rating_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", "/avaliacoes/all", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
        let (status, _) =
            send(&app, "DELETE", &format!("/comentarios/{}", comment_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            "PUT",
            &format!("/comentarios/update/{}", comment_id),
            Some(json!({ "comentario": "Edited after deletion." })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/filmes/605", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
