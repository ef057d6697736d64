use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::db::{
    DbError, EntryFilter, EntryKey, EntryStatus, ListEntry, ListKind, ListRepo,
};
use crate::util::lenient_id;

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] DbError),
}

pub type ListResult<T> = Result<T, ListError>;

/// Whether `exists` should count soft-deleted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Active,
    Any,
}

/// Unvalidated input for a list operation, as it arrives on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryRequest {
    #[serde(rename = "usuario_id", default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl EntryRequest {
    pub fn new(user_id: i64, tmdb_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            tmdb_id: Some(tmdb_id),
            status: None,
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn key(&self) -> ListResult<EntryKey> {
        let user_id = self
            .user_id
            .filter(|id| *id > 0)
            .ok_or_else(|| ListError::Validation("usuario_id is missing or invalid".to_string()))?;
        let tmdb_id = self
            .tmdb_id
            .filter(|id| *id > 0)
            .ok_or_else(|| ListError::Validation("tmdb_id is missing or invalid".to_string()))?;
        Ok(EntryKey::new(user_id, tmdb_id))
    }

    pub fn status(&self) -> ListResult<EntryStatus> {
        let raw = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ListError::Validation("status is missing".to_string()))?;
        EntryStatus::parse(raw)
            .ok_or_else(|| ListError::Validation(format!("unknown status: {}", raw)))
    }
}

/// Mediates every state transition of one list relation. Keeps no state of
/// its own; each call is a self-contained round trip to the store.
#[derive(Clone)]
pub struct ListLifecycle {
    store: Arc<dyn ListRepo>,
    kind: ListKind,
}

impl ListLifecycle {
    pub fn new(store: Arc<dyn ListRepo>, kind: ListKind) -> Self {
        Self { store, kind }
    }

    fn not_in_list(&self) -> ListError {
        ListError::NotFound(format!("Movie not found in the {}.", self.kind.label()))
    }

    async fn ensure_movie(&self, tmdb_id: i64) -> ListResult<()> {
        if self.store.ensure_movie(tmdb_id).await? {
            info!(tmdb_id, "created movie stub");
        }
        Ok(())
    }

    /// Insert or reactivate the entry with the given status. Afterwards
    /// exactly one active row exists for the pair.
    pub async fn upsert_entry(&self, req: &EntryRequest) -> ListResult<ListEntry> {
        let key = req.key()?;
        let status = req.status()?;

        self.ensure_movie(key.tmdb_id).await?;
        let entry = self.store.upsert_entry(self.kind, key, status).await?;

        info!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            status = status.as_str(),
            "upserted entry"
        );
        Ok(entry)
    }

    /// Like `upsert_entry`, but refuses when the pair is already active.
    pub async fn add_entry(&self, req: &EntryRequest) -> ListResult<ListEntry> {
        let key = req.key()?;
        let status = req.status()?;

        self.ensure_movie(key.tmdb_id).await?;

        let entry = self
            .store
            .insert_entry(self.kind, key, status)
            .await?
            .ok_or_else(|| {
                ListError::Conflict(format!(
                    "This movie is already in your {}.",
                    self.kind.label()
                ))
            })?;

        info!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            status = status.as_str(),
            "added entry"
        );
        Ok(entry)
    }

    pub async fn mark_watched(&self, req: &EntryRequest) -> ListResult<ListEntry> {
        let key = req.key()?;

        match self.store.find_entry(self.kind, key).await? {
            Some(entry) if entry.state.is_active() => {
                if entry.status == Some(EntryStatus::Watched) {
                    return Err(ListError::Conflict(
                        "Movie is already marked as watched.".to_string(),
                    ));
                }
            }
            _ => return Err(self.not_in_list()),
        }

        // The row can be soft-deleted between the check and the update.
        let entry = self
            .store
            .set_active_status(self.kind, key, EntryStatus::Watched)
            .await?
            .ok_or_else(|| self.not_in_list())?;

        info!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            "marked watched"
        );
        Ok(entry)
    }

    /// Overwrite the status of an active entry.
    pub async fn set_status(&self, req: &EntryRequest) -> ListResult<ListEntry> {
        let key = req.key()?;
        let status = req.status()?;

        let entry = self
            .store
            .set_active_status(self.kind, key, status)
            .await?
            .ok_or_else(|| self.not_in_list())?;

        debug!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            status = status.as_str(),
            "status changed"
        );
        Ok(entry)
    }

    /// One-shot transition from active to soft-deleted; a second call on
    /// the same pair finds nothing active and fails with `NotFound`.
    pub async fn soft_remove(&self, req: &EntryRequest) -> ListResult<ListEntry> {
        let key = req.key()?;

        let entry = self
            .store
            .soft_delete_entry(self.kind, key, Utc::now())
            .await?
            .ok_or_else(|| self.not_in_list())?;

        info!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            "soft-removed entry"
        );
        Ok(entry)
    }

    /// Clears `deleted_at`. The status stays null: soft removal already
    /// dropped it and nothing kept the old value.
    pub async fn restore(&self, req: &EntryRequest) -> ListResult<ListEntry> {
        let key = req.key()?;

        let entry = self
            .store
            .restore_entry(self.kind, key)
            .await?
            .ok_or_else(|| {
                ListError::NotFound(format!(
                    "No removed movie to restore in the {}.",
                    self.kind.label()
                ))
            })?;

        info!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            "restored entry"
        );
        Ok(entry)
    }

    /// Physically delete the row in whatever state. Returns how many rows
    /// went away; zero is not an error.
    pub async fn hard_remove(&self, req: &EntryRequest) -> ListResult<u64> {
        let key = req.key()?;
        let removed = self.store.delete_entry(self.kind, key).await?;
        info!(
            list = self.kind.table(),
            user_id = key.user_id,
            tmdb_id = key.tmdb_id,
            removed,
            "hard-removed entry"
        );
        Ok(removed)
    }

    pub async fn exists(&self, key: EntryKey, scope: Scope) -> ListResult<bool> {
        let found = self.store.find_entry(self.kind, key).await?;
        Ok(match (found, scope) {
            (None, _) => false,
            (Some(_), Scope::Any) => true,
            (Some(entry), Scope::Active) => entry.state.is_active(),
        })
    }

    pub async fn list_all_active(&self) -> ListResult<Vec<ListEntry>> {
        Ok(self
            .store
            .list_active_entries(self.kind, EntryFilter::default())
            .await?)
    }

    pub async fn list_active(&self, user_id: i64) -> ListResult<Vec<ListEntry>> {
        let filter = EntryFilter {
            user_id: Some(user_id),
            status: None,
        };
        Ok(self.store.list_active_entries(self.kind, filter).await?)
    }

    pub async fn list_by_status(
        &self,
        user_id: i64,
        status: EntryStatus,
    ) -> ListResult<Vec<ListEntry>> {
        let filter = EntryFilter {
            user_id: Some(user_id),
            status: Some(status),
        };
        Ok(self.store.list_active_entries(self.kind, filter).await?)
    }
}
