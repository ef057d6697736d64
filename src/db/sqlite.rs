use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;
use tracing::{debug, info};

use super::model::*;
use super::repo::*;

const USER_COLUMNS: &str = "id, name, email, password, created, deleted_at";
const COMMENT_COLUMNS: &str = "id, user_id, tmdb_id, body, created, deleted_at";
const RATING_COLUMNS: &str = "id, user_id, tmdb_id, score, created, deleted_at";
const ENTRY_COLUMNS: &str = "user_id, tmdb_id, status, deleted_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    /// Private in-memory database. A single connection that never expires,
    /// since the data lives only as long as the connection does.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn entry_from_row(row: Option<ListEntryRow>) -> DbResult<Option<ListEntry>> {
    row.map(ListEntry::try_from).transpose()
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn list_users(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_user_by_email(&self, email: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("User not found: {}", email)))
    }

    async fn get_active_user_by_email(&self, email: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ? AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("User not found: {}", email)))
    }

    async fn create_user(&self, name: &str, email: &str, password: &str) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password, created) VALUES (?, ?, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(name)
        .bind(email)
        .bind(password)
        .bind(now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::classify)?;

        debug!(user_id = user.id, "created user");
        Ok(user)
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> DbResult<User> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(ref name) = update.name {
                set.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(ref email) = update.email {
                set.push("email = ").push_bind_unseparated(email.clone());
            }
            if let Some(ref password) = update.password {
                set.push("password = ").push_bind_unseparated(password.clone());
            }
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING ")
            .push(USER_COLUMNS);

        qb.build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::classify)?
            .ok_or_else(|| DbError::NotFound(format!("User not found: {}", id)))
    }

    async fn set_user_password(&self, id: i64, password: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE users SET password = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(password)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("User not found: {}", id)));
        }
        Ok(())
    }

    async fn soft_delete_user(&self, id: i64) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn restore_user(&self, email: &str) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NULL WHERE email = ? AND deleted_at IS NOT NULL",
        )
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MovieRepo for SqliteRepository {
    async fn list_movies(&self) -> DbResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>("SELECT tmdb_id FROM movies ORDER BY tmdb_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn get_movie(&self, tmdb_id: i64) -> DbResult<Movie> {
        sqlx::query_as::<_, Movie>("SELECT tmdb_id FROM movies WHERE tmdb_id = ?")
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Movie not found: {}", tmdb_id)))
    }

    async fn create_movie(&self, tmdb_id: i64) -> DbResult<Movie> {
        sqlx::query("INSERT INTO movies (tmdb_id) VALUES (?)")
            .bind(tmdb_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::classify)?;
        Ok(Movie { tmdb_id })
    }

    async fn delete_movie(&self, tmdb_id: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM movies WHERE tmdb_id = ?")
            .bind(tmdb_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::classify)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CommentRepo for SqliteRepository {
    async fn list_comments_for_movie(&self, tmdb_id: i64) -> DbResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {} FROM comments WHERE tmdb_id = ? AND deleted_at IS NULL ORDER BY id",
            COMMENT_COLUMNS
        ))
        .bind(tmdb_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn create_comment(&self, user_id: i64, tmdb_id: i64, body: &str) -> DbResult<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (user_id, tmdb_id, body, created) VALUES (?, ?, ?, ?)
             RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(user_id)
        .bind(tmdb_id)
        .bind(body)
        .bind(now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::classify)
    }

    async fn update_comment(&self, id: i64, body: &str) -> DbResult<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET body = ? WHERE id = ? AND deleted_at IS NULL RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(body)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Comment not found: {}", id)))
    }

    async fn soft_delete_comment(&self, id: i64) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE comments SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RatingRepo for SqliteRepository {
    async fn list_ratings(&self) -> DbResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {} FROM ratings WHERE deleted_at IS NULL ORDER BY id",
            RATING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn list_ratings_by_user(&self, user_id: i64) -> DbResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {} FROM ratings WHERE user_id = ? AND deleted_at IS NULL ORDER BY id",
            RATING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn get_rating(&self, user_id: i64, tmdb_id: i64) -> DbResult<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(&format!(
            "SELECT {} FROM ratings WHERE user_id = ? AND tmdb_id = ? AND deleted_at IS NULL",
            RATING_COLUMNS
        ))
        .bind(user_id)
        .bind(tmdb_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn create_rating(&self, user_id: i64, tmdb_id: i64, score: i64) -> DbResult<Rating> {
        sqlx::query_as::<_, Rating>(&format!(
            "INSERT INTO ratings (user_id, tmdb_id, score, created) VALUES (?, ?, ?, ?)
             RETURNING {}",
            RATING_COLUMNS
        ))
        .bind(user_id)
        .bind(tmdb_id)
        .bind(score)
        .bind(now())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::classify)
    }

    async fn update_rating(&self, user_id: i64, tmdb_id: i64, score: i64) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE ratings SET score = ? WHERE user_id = ? AND tmdb_id = ? AND deleted_at IS NULL",
        )
        .bind(score)
        .bind(user_id)
        .bind(tmdb_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn soft_delete_rating(&self, id: i64) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE ratings SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ListRepo for SqliteRepository {
    async fn ensure_movie(&self, tmdb_id: i64) -> DbResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO movies (tmdb_id) VALUES (?)")
            .bind(tmdb_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_entry(&self, kind: ListKind, key: EntryKey) -> DbResult<Option<ListEntry>> {
        let row = sqlx::query_as::<_, ListEntryRow>(&format!(
            "SELECT {} FROM {} WHERE user_id = ? AND tmdb_id = ?",
            ENTRY_COLUMNS,
            kind.table()
        ))
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .fetch_optional(&self.pool)
        .await?;
        entry_from_row(row)
    }

    async fn upsert_entry(
        &self,
        kind: ListKind,
        key: EntryKey,
        status: EntryStatus,
    ) -> DbResult<ListEntry> {
        let row = sqlx::query_as::<_, ListEntryRow>(&format!(
            "INSERT INTO {} (user_id, tmdb_id, status, deleted_at) VALUES (?, ?, ?, NULL)
             ON CONFLICT (user_id, tmdb_id)
             DO UPDATE SET status = excluded.status, deleted_at = NULL
             RETURNING {}",
            kind.table(),
            ENTRY_COLUMNS
        ))
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::classify)?;
        ListEntry::try_from(row)
    }

    async fn insert_entry(
        &self,
        kind: ListKind,
        key: EntryKey,
        status: EntryStatus,
    ) -> DbResult<Option<ListEntry>> {
        let table = kind.table();
        let row = sqlx::query_as::<_, ListEntryRow>(&format!(
            "INSERT INTO {table} (user_id, tmdb_id, status, deleted_at) VALUES (?, ?, ?, NULL)
             ON CONFLICT (user_id, tmdb_id)
             DO UPDATE SET status = excluded.status, deleted_at = NULL
             WHERE {table}.deleted_at IS NOT NULL
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::classify)?;
        entry_from_row(row)
    }

    async fn set_active_status(
        &self,
        kind: ListKind,
        key: EntryKey,
        status: EntryStatus,
    ) -> DbResult<Option<ListEntry>> {
        let row = sqlx::query_as::<_, ListEntryRow>(&format!(
            "UPDATE {} SET status = ?
             WHERE user_id = ? AND tmdb_id = ? AND deleted_at IS NULL RETURNING {}",
            kind.table(),
            ENTRY_COLUMNS
        ))
        .bind(status.as_str())
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .fetch_optional(&self.pool)
        .await?;
        entry_from_row(row)
    }

    async fn soft_delete_entry(
        &self,
        kind: ListKind,
        key: EntryKey,
        at: DateTime<Utc>,
    ) -> DbResult<Option<ListEntry>> {
        let row = sqlx::query_as::<_, ListEntryRow>(&format!(
            "UPDATE {} SET deleted_at = ?, status = NULL
             WHERE user_id = ? AND tmdb_id = ? AND deleted_at IS NULL RETURNING {}",
            kind.table(),
            ENTRY_COLUMNS
        ))
        .bind(at.to_rfc3339())
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .fetch_optional(&self.pool)
        .await?;
        entry_from_row(row)
    }

    async fn restore_entry(&self, kind: ListKind, key: EntryKey) -> DbResult<Option<ListEntry>> {
        let row = sqlx::query_as::<_, ListEntryRow>(&format!(
            "UPDATE {} SET deleted_at = NULL
             WHERE user_id = ? AND tmdb_id = ? AND deleted_at IS NOT NULL RETURNING {}",
            kind.table(),
            ENTRY_COLUMNS
        ))
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .fetch_optional(&self.pool)
        .await?;
        entry_from_row(row)
    }

    async fn delete_entry(&self, kind: ListKind, key: EntryKey) -> DbResult<u64> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = ? AND tmdb_id = ?",
            kind.table()
        ))
        .bind(key.user_id)
        .bind(key.tmdb_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_active_entries(
        &self,
        kind: ListKind,
        filter: EntryFilter,
    ) -> DbResult<Vec<ListEntry>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL",
            ENTRY_COLUMNS,
            kind.table()
        ));
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY user_id, tmdb_id");

        let rows = qb
            .build_query_as::<ListEntryRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ListEntry::try_from).collect()
    }
}
