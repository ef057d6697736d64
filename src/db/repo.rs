use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list_users(&self) -> DbResult<Vec<User>>;
    /// Looks up a user by email, deleted or not.
    async fn get_user_by_email(&self, email: &str) -> DbResult<User>;
    async fn get_active_user_by_email(&self, email: &str) -> DbResult<User>;
    async fn create_user(&self, name: &str, email: &str, password: &str) -> DbResult<User>;
    async fn update_user(&self, id: i64, update: &UserUpdate) -> DbResult<User>;
    async fn set_user_password(&self, id: i64, password: &str) -> DbResult<()>;
    async fn soft_delete_user(&self, id: i64) -> DbResult<u64>;
    async fn restore_user(&self, email: &str) -> DbResult<u64>;
}

#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn list_movies(&self) -> DbResult<Vec<Movie>>;
    async fn get_movie(&self, tmdb_id: i64) -> DbResult<Movie>;
    async fn create_movie(&self, tmdb_id: i64) -> DbResult<Movie>;
    async fn delete_movie(&self, tmdb_id: i64) -> DbResult<u64>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn list_comments_for_movie(&self, tmdb_id: i64) -> DbResult<Vec<Comment>>;
    async fn create_comment(&self, user_id: i64, tmdb_id: i64, body: &str) -> DbResult<Comment>;
    async fn update_comment(&self, id: i64, body: &str) -> DbResult<Comment>;
    async fn soft_delete_comment(&self, id: i64) -> DbResult<u64>;
}

#[async_trait]
pub trait RatingRepo: Send + Sync {
    async fn list_ratings(&self) -> DbResult<Vec<Rating>>;
    async fn list_ratings_by_user(&self, user_id: i64) -> DbResult<Vec<Rating>>;
    async fn get_rating(&self, user_id: i64, tmdb_id: i64) -> DbResult<Option<Rating>>;
    async fn create_rating(&self, user_id: i64, tmdb_id: i64, score: i64) -> DbResult<Rating>;
    async fn update_rating(&self, user_id: i64, tmdb_id: i64, score: i64) -> DbResult<u64>;
    async fn soft_delete_rating(&self, id: i64) -> DbResult<u64>;
}

/// Storage for the watchlist and favorites relations. Methods that
/// transition state return `None` when no row satisfied the precondition.
#[async_trait]
pub trait ListRepo: Send + Sync {
    /// Inserts a stub movie unless one exists. Returns true if created.
    async fn ensure_movie(&self, tmdb_id: i64) -> DbResult<bool>;
    async fn find_entry(&self, kind: ListKind, key: EntryKey) -> DbResult<Option<ListEntry>>;
    async fn upsert_entry(
        &self,
        kind: ListKind,
        key: EntryKey,
        status: EntryStatus,
    ) -> DbResult<ListEntry>;
    /// Like `upsert_entry`, but leaves an active row untouched and returns
    /// `None` for it. Check and write happen in one statement.
    async fn insert_entry(
        &self,
        kind: ListKind,
        key: EntryKey,
        status: EntryStatus,
    ) -> DbResult<Option<ListEntry>>;
    async fn set_active_status(
        &self,
        kind: ListKind,
        key: EntryKey,
        status: EntryStatus,
    ) -> DbResult<Option<ListEntry>>;
    async fn soft_delete_entry(
        &self,
        kind: ListKind,
        key: EntryKey,
        at: DateTime<Utc>,
    ) -> DbResult<Option<ListEntry>>;
    async fn restore_entry(&self, kind: ListKind, key: EntryKey) -> DbResult<Option<ListEntry>>;
    async fn delete_entry(&self, kind: ListKind, key: EntryKey) -> DbResult<u64>;
    async fn list_active_entries(
        &self,
        kind: ListKind,
        filter: EntryFilter,
    ) -> DbResult<Vec<ListEntry>>;
}
