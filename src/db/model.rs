use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created: Option<String>,
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub tmdb_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub tmdb_id: i64,
    pub body: String,
    pub created: Option<String>,
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub tmdb_id: i64,
    pub score: i64,
    pub created: Option<String>,
    pub deleted_at: Option<String>,
}

/// Partial update of a user. `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// Which user/movie relation a list operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Watchlist,
    Favorites,
}

impl ListKind {
    pub fn table(self) -> &'static str {
        match self {
            ListKind::Watchlist => "watchlist",
            ListKind::Favorites => "favorites",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ListKind::Watchlist => "watchlist",
            ListKind::Favorites => "favorites list",
        }
    }
}

/// Identity of a list entry: one row per (user, movie) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub user_id: i64,
    pub tmdb_id: i64,
}

impl EntryKey {
    pub fn new(user_id: i64, tmdb_id: i64) -> Self {
        Self { user_id, tmdb_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "to_watch", alias = "para assistir")]
    ToWatch,
    #[serde(rename = "watched", alias = "assistido")]
    Watched,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::ToWatch => "to_watch",
            EntryStatus::Watched => "watched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "to_watch" | "para assistir" => Some(EntryStatus::ToWatch),
            "watched" | "assistido" => Some(EntryStatus::Watched),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl EntryState {
    pub fn is_active(&self) -> bool {
        matches!(self, EntryState::Active)
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            EntryState::Active => None,
            EntryState::Deleted { at } => Some(*at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub key: EntryKey,
    pub status: Option<EntryStatus>,
    pub state: EntryState,
}

/// Storage shape of a list row. `deleted_at` is RFC 3339 text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListEntryRow {
    pub user_id: i64,
    pub tmdb_id: i64,
    pub status: Option<String>,
    pub deleted_at: Option<String>,
}

impl TryFrom<ListEntryRow> for ListEntry {
    type Error = DbError;

    fn try_from(row: ListEntryRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_deref() {
            None => None,
            Some(s) => Some(EntryStatus::parse(s).ok_or_else(|| {
                DbError::Corrupt(format!(
                    "unknown status {:?} for {}/{}",
                    s, row.user_id, row.tmdb_id
                ))
            })?),
        };

        let state = match row.deleted_at {
            None => EntryState::Active,
            Some(ts) => {
                let at = DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        DbError::Corrupt(format!(
                            "bad deleted_at {:?} for {}/{}: {}",
                            ts, row.user_id, row.tmdb_id, e
                        ))
                    })?;
                EntryState::Deleted { at }
            }
        };

        Ok(ListEntry {
            key: EntryKey::new(row.user_id, row.tmdb_id),
            status,
            state,
        })
    }
}

/// Filter for listing active entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilter {
    pub user_id: Option<i64>,
    pub status: Option<EntryStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Missing reference: {0}")]
    MissingReference(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Sort constraint violations out of a raw driver error.
    pub fn classify(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DbError::AlreadyExists(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return DbError::MissingReference(db_err.message().to_string());
            }
        }
        DbError::Sqlx(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;
