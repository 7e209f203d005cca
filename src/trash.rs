//! Trash store: soft delete with retention-based expiry
//!
//! Each trashed session gets its own slot directory named by a fresh token:
//!
//! ```text
//! <trash root>/<trashId>/meta.json
//! <trash root>/<trashId>/payload/<home-relative path of the session>
//! ```
//!
//! The metadata record is the only thing restore trusts, and it is plain
//! data that can be edited by hand. Every path derived from it is therefore
//! re-validated against its root on every restore.

use crate::batch::{run_batch, BatchFailure, BatchReport, Lookup};
use crate::error::{ChatshelfError, Result};
use crate::fs_utils::{
    ensure_no_symlinks_below, is_path_inside_root, lexical_absolute, move_path,
    normalize_path_for_display, path_exists, resolve_within_root,
};
use crate::providers::{Provider, SessionItem, SessionState};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Metadata file inside each slot
pub const TRASH_META_FILE: &str = "meta.json";

/// Directory inside each slot holding the moved file
pub const PAYLOAD_DIR: &str = "payload";

/// Current metadata format version
pub const TRASH_META_VERSION: u32 = 1;

/// Longest accepted trash id
const MAX_TRASH_ID_LEN: usize = 64;

/// Returns true if `id` is a non-empty token of `[A-Za-z0-9_-]`
///
/// Checked before any path is built from the id, independent of the
/// containment guard.
pub fn is_valid_trash_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_TRASH_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Generates a fresh slot token (ULID, sortable by creation time)
pub fn new_trash_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Persisted record describing one trashed session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashMeta {
    /// Format version
    pub version: u32,
    /// Slot token
    pub trash_id: String,
    /// Producing tool
    pub provider: Provider,
    /// Provider home the session came from
    pub home_root: String,
    /// Path to restore to, relative to `home_root`
    pub original_relative_path: String,
    /// Payload location, relative to the slot directory
    pub payload_relative_path: String,
    /// State the session was in when trashed
    pub original_state: SessionState,
    /// Item id at the time of deletion
    pub original_item_id: String,
    /// Provider-native id
    pub thread_id: String,
    /// Display title at the time of deletion
    pub title: String,
    /// File size
    pub size_bytes: u64,
    /// Last modification time of the session
    pub updated_at: DateTime<Utc>,
    /// When the session was trashed
    pub deleted_at: DateTime<Utc>,
    /// When the slot becomes eligible for purge
    pub expires_at: DateTime<Utc>,
}

/// A trash slot as seen by a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashItem {
    /// Persisted metadata
    #[serde(flatten)]
    pub meta: TrashMeta,
    /// `now >= expires_at`
    pub expired: bool,
    /// Whether the payload file is physically present
    pub payload_exists: bool,
}

/// Output of restoring one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    /// Provider the session went back to
    pub provider: Provider,
    /// Home-relative path the session was restored to
    pub restored_to: String,
    /// Item id at the restored location
    pub item_id: String,
}

/// Outcome of an expiry sweep
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Slots found expired
    pub expired_candidates: usize,
    /// Slots purged
    pub succeeded: Vec<String>,
    /// Slots that could not be purged
    pub failed: Vec<BatchFailure>,
}

/// Store for trashed sessions
pub struct TrashStore {
    root: PathBuf,
    retention_days: u32,
    home_roots: HashMap<Provider, PathBuf>,
    mutation_lock: tokio::sync::Mutex<()>,
}

impl TrashStore {
    /// Creates a store at `root`
    ///
    /// `home_roots` are the only directories restore will write into; a
    /// slot whose provider has no configured home cannot be restored.
    pub fn new(
        root: impl Into<PathBuf>,
        retention_days: u32,
        home_roots: HashMap<Provider, PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            retention_days,
            home_roots,
            mutation_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Trash root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Days a trashed session stays restorable
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    fn slot_dir(&self, trash_id: &str) -> Result<PathBuf> {
        if !is_valid_trash_id(trash_id) {
            return Err(ChatshelfError::MalformedToken(trash_id.to_string()).into());
        }
        resolve_within_root(&self.root, trash_id, "trash")
    }

    async fn write_meta(slot: &Path, meta: &TrashMeta) -> Result<()> {
        let body = serde_json::to_vec_pretty(meta)?;
        let tmp = slot.join(format!("{}.tmp", TRASH_META_FILE));
        tokio::fs::write(&tmp, body)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, slot.join(TRASH_META_FILE))
            .await
            .with_context(|| format!("Failed to finalize metadata in {:?}", slot))?;
        Ok(())
    }

    async fn read_meta(slot: &Path) -> Result<TrashMeta> {
        let path = slot.join(TRASH_META_FILE);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let shown = normalize_path_for_display(&path);
                return Err(ChatshelfError::NotFound(format!("trash metadata {}", shown)).into());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to read {:?}", path)))
            }
        };
        serde_json::from_slice(&raw).map_err(|e| {
            ChatshelfError::Unclassifiable(format!(
                "trash metadata {}: {}",
                normalize_path_for_display(&path),
                e
            ))
            .into()
        })
    }

    /// Rejects metadata recorded for a different slot
    fn ensure_meta_names_slot(trash_id: &str, meta: &TrashMeta) -> Result<()> {
        if meta.trash_id != trash_id {
            return Err(ChatshelfError::Unclassifiable(format!(
                "trash slot {} holds metadata for {}",
                trash_id, meta.trash_id
            ))
            .into());
        }
        Ok(())
    }

    async fn read_slot_meta(slot: &Path, trash_id: &str) -> Result<TrashMeta> {
        let meta = Self::read_meta(slot).await?;
        Self::ensure_meta_names_slot(trash_id, &meta)?;
        Ok(meta)
    }

    /// Payload path for a slot, guarded to stay under `slot/payload`
    fn payload_path(slot: &Path, meta: &TrashMeta) -> Result<PathBuf> {
        let payload_root = lexical_absolute(&slot.join(PAYLOAD_DIR));
        let payload = resolve_within_root(slot, &meta.payload_relative_path, "trash payload")?;
        if !is_path_inside_root(&payload_root, &payload) || payload == payload_root {
            return Err(ChatshelfError::OutOfBoundsPath {
                label: "trash payload".to_string(),
                path: meta.payload_relative_path.clone(),
            }
            .into());
        }
        Ok(payload)
    }

    /// Restore destination and its home, guarded to stay inside that home
    fn restore_target(&self, meta: &TrashMeta) -> Result<(&Path, PathBuf)> {
        let home = self.home_roots.get(&meta.provider).ok_or_else(|| {
            ChatshelfError::OutOfBoundsPath {
                label: format!("{} home", meta.provider),
                path: meta.home_root.clone(),
            }
        })?;
        if lexical_absolute(Path::new(&meta.home_root)) != lexical_absolute(home) {
            return Err(ChatshelfError::OutOfBoundsPath {
                label: format!("{} home", meta.provider),
                path: meta.home_root.clone(),
            }
            .into());
        }
        let target = resolve_within_root(home, &meta.original_relative_path, "restore")?;
        if target == lexical_absolute(home) {
            return Err(ChatshelfError::OutOfBoundsPath {
                label: "restore".to_string(),
                path: meta.original_relative_path.clone(),
            }
            .into());
        }
        Ok((home.as_path(), target))
    }

    /// Moves a session into a new trash slot
    ///
    /// Metadata is written before the file moves, so a crash in between
    /// leaves a slot whose payload is reported missing rather than an
    /// unlabeled file.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBoundsPath` if the item's relative path escapes
    /// `home_root`, `NotFound` if the file is gone, or the I/O error of a
    /// failed move (the new slot is removed again in that case).
    pub async fn trash_session_item(
        &self,
        item: &SessionItem,
        home_root: &Path,
    ) -> Result<TrashItem> {
        let _guard = self.mutation_lock.lock().await;

        let source = resolve_within_root(home_root, &item.relative_path, "session home")?;
        ensure_no_symlinks_below(home_root, &source, "session home").await?;
        if !path_exists(&source).await? {
            return Err(ChatshelfError::NotFound(item.relative_path.clone()).into());
        }

        let trash_id = new_trash_id();
        let slot = self.slot_dir(&trash_id)?;
        let payload_relative_path = format!("{}/{}", PAYLOAD_DIR, item.relative_path);
        let deleted_at = Utc::now();
        let meta = TrashMeta {
            version: TRASH_META_VERSION,
            trash_id: trash_id.clone(),
            provider: item.provider,
            home_root: normalize_path_for_display(&lexical_absolute(home_root)),
            original_relative_path: item.relative_path.clone(),
            payload_relative_path,
            original_state: item.state,
            original_item_id: item.item_id.clone(),
            thread_id: item.thread_id.clone(),
            title: item.title.clone(),
            size_bytes: item.size_bytes,
            updated_at: item.updated_at,
            deleted_at,
            expires_at: deleted_at + Duration::days(i64::from(self.retention_days)),
        };
        let payload = Self::payload_path(&slot, &meta)?;

        tokio::fs::create_dir_all(&slot)
            .await
            .with_context(|| format!("Failed to create trash slot {:?}", slot))?;

        let moved = match Self::write_meta(&slot, &meta).await {
            Ok(()) => move_path(&source, &payload).await,
            Err(e) => Err(e),
        };
        if let Err(e) = moved {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&slot).await {
                return Err(e.context(format!(
                    "trash slot {} could not be removed: {}",
                    trash_id, cleanup
                )));
            }
            return Err(e);
        }

        tracing::info!(
            trash_id = %trash_id,
            provider = %item.provider,
            path = %item.relative_path,
            "Moved session to trash"
        );

        Ok(TrashItem {
            expired: Utc::now() >= meta.expires_at,
            payload_exists: true,
            meta,
        })
    }

    /// Lists every readable slot, newest deletion first
    ///
    /// Slots with malformed names or unreadable metadata are skipped with a
    /// warning. A missing trash root yields an empty list.
    pub async fn list_trash_items(&self) -> Result<Vec<TrashItem>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to read {:?}", self.root)))
            }
        };

        let now = Utc::now();
        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to read {:?}", self.root))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_valid_trash_id(&name) {
                continue;
            }
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let slot = entry.path();

            let meta = match Self::read_meta(&slot).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(slot = %name, error = %e, "Skipping unreadable trash slot");
                    continue;
                }
            };
            if let Err(e) = Self::ensure_meta_names_slot(&name, &meta) {
                tracing::warn!(slot = %name, error = %e, "Skipping trash slot");
                continue;
            }

            let payload_exists = match Self::payload_path(&slot, &meta) {
                Ok(payload) => path_exists(&payload).await?,
                Err(_) => false,
            };
            items.push(TrashItem {
                expired: now >= meta.expires_at,
                payload_exists,
                meta,
            });
        }

        items.sort_by(|a, b| {
            b.meta
                .deleted_at
                .cmp(&a.meta.deleted_at)
                .then_with(|| b.meta.trash_id.cmp(&a.meta.trash_id))
        });
        Ok(items)
    }

    /// Provider recorded in a slot's metadata
    pub async fn slot_provider(&self, trash_id: &str) -> Result<Provider> {
        let slot = self.slot_dir(trash_id)?;
        Ok(Self::read_slot_meta(&slot, trash_id).await?.provider)
    }

    /// Restores one slot to its original location and removes the slot
    ///
    /// Both the payload and the destination are checked lexically and then
    /// on disk, so a slot or home directory replaced by a symlink is refused.
    pub async fn restore_item(&self, trash_id: &str) -> Result<RestoreOutcome> {
        let slot = self.slot_dir(trash_id)?;
        let _guard = self.mutation_lock.lock().await;

        let meta = Self::read_slot_meta(&slot, trash_id).await?;
        let payload = Self::payload_path(&slot, &meta)?;
        let (home, target) = self.restore_target(&meta)?;
        ensure_no_symlinks_below(&self.root, &payload, "trash payload").await?;
        ensure_no_symlinks_below(home, &target, "restore").await?;

        if !path_exists(&payload).await? {
            return Err(ChatshelfError::NotFound(format!(
                "payload for trash item {}",
                trash_id
            ))
            .into());
        }
        if path_exists(&target).await? {
            return Err(ChatshelfError::DestinationExists(meta.original_relative_path).into());
        }

        move_path(&payload, &target).await?;
        tokio::fs::remove_dir_all(&slot)
            .await
            .with_context(|| format!("Restored {} but failed to remove its trash slot", trash_id))?;

        tracing::info!(
            trash_id = %trash_id,
            provider = %meta.provider,
            path = %meta.original_relative_path,
            "Restored session from trash"
        );

        Ok(RestoreOutcome {
            provider: meta.provider,
            item_id: meta.provider.encode_item_id(&meta.original_relative_path),
            restored_to: meta.original_relative_path,
        })
    }

    /// Deletes one slot outright; an already-absent slot is not an error
    pub async fn purge_item(&self, trash_id: &str) -> Result<()> {
        let slot = self.slot_dir(trash_id)?;
        let _guard = self.mutation_lock.lock().await;

        match tokio::fs::remove_dir_all(&slot).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to purge trash item {}", trash_id)))
            }
        }
        tracing::info!(trash_id = %trash_id, "Purged trash item");
        Ok(())
    }

    /// Restores each id independently
    pub async fn restore(&self, ids: &[String]) -> Result<BatchReport<RestoreOutcome>> {
        run_batch(
            ids,
            |ids| async move { Ok(Lookup::passthrough(ids)) },
            |id| async move { self.restore_item(&id).await },
        )
        .await
    }

    /// Purges each id independently
    pub async fn purge(&self, ids: &[String]) -> Result<BatchReport<String>> {
        run_batch(
            ids,
            |ids| async move { Ok(Lookup::passthrough(ids)) },
            |id| async move {
                self.purge_item(&id).await?;
                Ok(id)
            },
        )
        .await
    }

    /// Purges every expired slot
    pub async fn cleanup_expired(&self) -> Result<CleanupReport> {
        let expired: Vec<String> = self
            .list_trash_items()
            .await?
            .into_iter()
            .filter(|item| item.expired)
            .map(|item| item.meta.trash_id)
            .collect();

        if expired.is_empty() {
            return Ok(CleanupReport::default());
        }

        let report = self.purge(&expired).await?;
        tracing::info!(
            expired = expired.len(),
            purged = report.succeeded_count,
            "Trash expiry sweep finished"
        );
        Ok(CleanupReport {
            expired_candidates: expired.len(),
            succeeded: report.succeeded.into_iter().map(|s| s.result).collect(),
            failed: report.failed,
        })
    }
}
