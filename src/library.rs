//! Session library: one entry point over every provider store and the trash
//!
//! Callers hand in opaque item ids from any provider; the id prefix decides
//! which store resolves it. Each mutating operation is a batch with
//! per-item success or failure.

use crate::batch::{run_batch, BatchReport, Lookup};
use crate::config::ResolvedPaths;
use crate::error::{ChatshelfError, Result};
use crate::providers::claude::ClaudeStore;
use crate::providers::codex::CodexStore;
use crate::providers::gemini::GeminiStore;
use crate::providers::{
    FindResult, MoveOutcome, Provider, SessionItem, SessionListing, SessionStore,
};
use crate::trash::{CleanupReport, RestoreOutcome, TrashItem, TrashStore};
use std::collections::{BTreeMap, HashMap};

/// Which direction an archive move goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveDirection {
    Archive,
    Unarchive,
}

impl ArchiveDirection {
    fn operation(self) -> &'static str {
        match self {
            ArchiveDirection::Archive => "archive",
            ArchiveDirection::Unarchive => "unarchive",
        }
    }
}

/// All session stores plus the trash
pub struct SessionLibrary {
    codex: CodexStore,
    claude: ClaudeStore,
    gemini: GeminiStore,
    trash: TrashStore,
    auto_cleanup: bool,
}

impl SessionLibrary {
    /// Builds stores from resolved configuration
    pub fn new(paths: &ResolvedPaths) -> Self {
        let home_roots = HashMap::from([
            (Provider::Codex, paths.codex_home.clone()),
            (Provider::Claude, paths.claude_home.clone()),
            (Provider::Gemini, paths.gemini_home.clone()),
        ]);

        Self {
            codex: CodexStore::with_desktop_state(
                &paths.codex_home,
                paths.codex_desktop_state_file.clone(),
            ),
            claude: ClaudeStore::new(&paths.claude_home),
            gemini: GeminiStore::new(&paths.gemini_home),
            trash: TrashStore::new(&paths.trash_root, paths.retention_days, home_roots),
            auto_cleanup: paths.auto_cleanup,
        }
    }

    /// Store serving `provider`
    pub fn store(&self, provider: Provider) -> &dyn SessionStore {
        match provider {
            Provider::Codex => &self.codex,
            Provider::Claude => &self.claude,
            Provider::Gemini => &self.gemini,
        }
    }

    /// Trash store
    pub fn trash_store(&self) -> &TrashStore {
        &self.trash
    }

    /// Lists every provider, newest first
    pub async fn list_all(&self) -> Result<SessionListing> {
        let mut items = Vec::new();
        for provider in Provider::ALL {
            items.extend(self.store(provider).list_sessions().await?.items);
        }
        Ok(SessionListing::from_items(items))
    }

    /// Lists one provider
    pub async fn list_provider(&self, provider: Provider) -> Result<SessionListing> {
        self.store(provider).list_sessions().await
    }

    /// Resolves ids from any mix of providers, preserving request order
    ///
    /// Ids without a known provider prefix are reported missing. Each
    /// provider is listed at most once.
    pub async fn find_items(&self, ids: &[String]) -> Result<FindResult> {
        let mut by_provider: BTreeMap<Provider, Vec<String>> = BTreeMap::new();
        for id in ids {
            if let Some(provider) = Provider::from_item_id(id) {
                by_provider.entry(provider).or_default().push(id.clone());
            }
        }

        let mut found: HashMap<String, SessionItem> = HashMap::new();
        for (provider, provider_ids) in by_provider {
            let result = self.store(provider).find_items_by_ids(&provider_ids).await?;
            found.extend(result.found.into_iter().map(|item| (item.item_id.clone(), item)));
        }

        let mut result = FindResult::default();
        for id in ids {
            match found.remove(id) {
                Some(item) => result.found.push(item),
                None => result.missing.push(id.clone()),
            }
        }
        Ok(result)
    }

    async fn move_archive_state(
        &self,
        item: SessionItem,
        direction: ArchiveDirection,
    ) -> Result<MoveOutcome> {
        let store = self.store(item.provider);
        let Some(archivable) = store.as_archivable() else {
            return Err(ChatshelfError::UnsupportedOperation {
                provider: item.provider.to_string(),
                operation: direction.operation().to_string(),
            }
            .into());
        };
        match direction {
            ArchiveDirection::Archive => archivable.archive_item(&item).await,
            ArchiveDirection::Unarchive => archivable.unarchive_item(&item).await,
        }
    }

    async fn archive_batch(
        &self,
        ids: &[String],
        direction: ArchiveDirection,
    ) -> Result<BatchReport<MoveOutcome>> {
        run_batch(
            ids,
            |ids| async move { self.find_items(&ids).await.map(Lookup::from) },
            |item| self.move_archive_state(item, direction),
        )
        .await
    }

    /// Moves active sessions to the archive
    pub async fn archive(&self, ids: &[String]) -> Result<BatchReport<MoveOutcome>> {
        self.archive_batch(ids, ArchiveDirection::Archive).await
    }

    /// Moves archived sessions back to active
    pub async fn unarchive(&self, ids: &[String]) -> Result<BatchReport<MoveOutcome>> {
        self.archive_batch(ids, ArchiveDirection::Unarchive).await
    }

    /// Moves sessions into the trash
    ///
    /// Works for every provider and for both active and archived sessions.
    /// The owning store's lock is held while the file is re-checked and moved.
    pub async fn trash(&self, ids: &[String]) -> Result<BatchReport<TrashItem>> {
        run_batch(
            ids,
            |ids| async move { self.find_items(&ids).await.map(Lookup::from) },
            |item| async move {
                let store = self.store(item.provider);
                let _guard = store.mutation_lock().lock().await;
                self.trash.trash_session_item(&item, store.home_root()).await
            },
        )
        .await
    }

    /// Lists trashed sessions, newest deletion first
    pub async fn list_trash(&self) -> Result<Vec<TrashItem>> {
        self.trash.list_trash_items().await
    }

    /// Restores trashed sessions
    ///
    /// Each restore runs under the lock of the store it writes back into.
    pub async fn restore(&self, trash_ids: &[String]) -> Result<BatchReport<RestoreOutcome>> {
        run_batch(
            trash_ids,
            |ids| async move { Ok(Lookup::passthrough(ids)) },
            |trash_id| async move {
                let provider = self.trash.slot_provider(&trash_id).await?;
                let _guard = self.store(provider).mutation_lock().lock().await;
                self.trash.restore_item(&trash_id).await
            },
        )
        .await
    }

    /// Purges trashed sessions
    pub async fn purge(&self, trash_ids: &[String]) -> Result<BatchReport<String>> {
        self.trash.purge(trash_ids).await
    }

    /// Purges every expired trash slot
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        self.trash.cleanup_expired().await
    }

    /// Runs the expiry sweep if enabled in configuration
    ///
    /// A failed sweep is logged and otherwise ignored so it never blocks the
    /// command that triggered it.
    pub async fn auto_cleanup(&self) -> Option<CleanupReport> {
        if !self.auto_cleanup {
            return None;
        }
        match self.trash.cleanup_expired().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "Automatic trash cleanup failed");
                None
            }
        }
    }
}
