//! Gemini CLI session store
//!
//! Chats are whole JSON documents at `tmp/<projectHash>/chats/*.json`. A
//! document may carry an explicit `summary`, which wins over the first user
//! message as the title. There is no archived location.

use crate::error::{is_not_found, ChatshelfError, Result};
use crate::fs_utils::{relative_display, walk_files};
use crate::providers::{
    created_or_modified, stat_if_present, to_utc, Provider, SessionExtras, SessionItem,
    SessionListing, SessionState, SessionStore,
};
use crate::title::{
    content_text, is_system_generated, placeholder_title, title_from_message, FileStamp,
    ResolvedSignals, TitleCache,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directory holding per-project-hash folders
pub const TMP_DIR: &str = "tmp";

/// Folder name holding chat documents inside a project hash directory
pub const CHATS_DIR: &str = "chats";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ChatDocument {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    project_hash: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    messages: Vec<Value>,
}

#[derive(Debug, Clone, Default)]
struct GeminiSignals {
    resolved: ResolvedSignals,
    session_id: Option<String>,
    project_hash: Option<String>,
    started_at: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
    message_count: usize,
}

/// Store for Gemini CLI chats
pub struct GeminiStore {
    home: PathBuf,
    cache: TitleCache<GeminiSignals>,
    mutation_lock: tokio::sync::Mutex<()>,
}

impl GeminiStore {
    /// Creates a store rooted at the Gemini home (usually `~/.gemini`)
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cache: TitleCache::new(),
            mutation_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Root of project hash directories
    pub fn tmp_root(&self) -> PathBuf {
        self.home.join(TMP_DIR)
    }

    async fn resolve_signals(path: &Path) -> Result<GeminiSignals> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;

        let doc: ChatDocument = match serde_json::from_slice(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                let reason = ChatshelfError::Unclassifiable(format!("{:?}: {}", path, e));
                tracing::debug!(%reason, "Treating Gemini chat as signal-free");
                ChatDocument::default()
            }
        };

        let first_user = doc
            .messages
            .iter()
            .find(|m| m.get("type").and_then(Value::as_str) == Some("user"))
            .and_then(|m| m.get("content").and_then(content_text));

        let title = doc
            .summary
            .as_deref()
            .and_then(|summary| title_from_message(summary, &[]))
            .or_else(|| {
                first_user
                    .as_deref()
                    .and_then(|text| title_from_message(text, &[]))
            });

        Ok(GeminiSignals {
            resolved: ResolvedSignals {
                title,
                system_generated: is_system_generated(first_user.as_deref(), None),
                source: None,
            },
            session_id: doc.session_id.filter(|s| !s.is_empty()),
            project_hash: doc.project_hash.filter(|s| !s.is_empty()),
            started_at: doc.start_time.as_deref().and_then(parse_rfc3339),
            last_updated: doc.last_updated.as_deref().and_then(parse_rfc3339),
            message_count: doc.messages.len(),
        })
    }

    async fn build_item(
        &self,
        path: &Path,
        live: &mut HashSet<PathBuf>,
    ) -> Result<Option<SessionItem>> {
        let Some(metadata) = stat_if_present(path).await? else {
            return Ok(None);
        };
        live.insert(path.to_path_buf());

        let stamp = FileStamp::from_metadata(&metadata);
        let signals = match self.cache.get(path, &stamp, None) {
            Some(hit) => hit,
            None => match Self::resolve_signals(path).await {
                Ok(resolved) => {
                    self.cache
                        .insert(path.to_path_buf(), stamp, None, resolved.clone());
                    resolved
                }
                Err(e) if is_not_found(&e) => return Ok(None),
                Err(e) => return Err(e),
            },
        };

        if signals.resolved.system_generated {
            tracing::debug!(path = ?path, "Hiding system-generated Gemini session");
            return Ok(None);
        }

        let Some(relative_path) = relative_display(&self.home, path) else {
            return Ok(None);
        };
        let thread_id = signals.session_id.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let project = signals.project_hash.clone().or_else(|| {
            path.parent()
                .and_then(Path::parent)
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
        });
        let title = signals
            .resolved
            .title
            .clone()
            .unwrap_or_else(|| placeholder_title(&thread_id));

        Ok(Some(SessionItem {
            item_id: Provider::Gemini.encode_item_id(&relative_path),
            thread_id,
            title,
            state: SessionState::Active,
            provider: Provider::Gemini,
            absolute_path: path.to_path_buf(),
            relative_path,
            size_bytes: stamp.size,
            created_at: signals
                .started_at
                .unwrap_or_else(|| created_or_modified(&metadata)),
            updated_at: signals
                .last_updated
                .unwrap_or_else(|| to_utc(stamp.modified)),
            extras: SessionExtras {
                git_branch: None,
                cwd: None,
                project,
                message_count: Some(signals.message_count),
                source: None,
                cli_version: None,
            },
        }))
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `tmp/<hash>/chats/<file>.json`
fn is_chat_file(tmp_root: &Path, path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return false;
    }
    let Ok(rel) = path.strip_prefix(tmp_root) else {
        return false;
    };
    let parts: Vec<_> = rel.components().collect();
    parts.len() == 3 && parts[1].as_os_str() == CHATS_DIR
}

#[async_trait]
impl SessionStore for GeminiStore {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn home_root(&self) -> &Path {
        &self.home
    }

    fn mutation_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.mutation_lock
    }

    async fn list_sessions(&self) -> Result<SessionListing> {
        let tmp_root = self.tmp_root();
        let mut live = HashSet::new();
        let mut items = Vec::new();

        for path in walk_files(&tmp_root).await? {
            if !is_chat_file(&tmp_root, &path) {
                continue;
            }
            if let Some(item) = self.build_item(&path, &mut live).await? {
                items.push(item);
            }
        }

        self.cache.retain_only(&live);
        tracing::debug!(count = items.len(), "Listed Gemini sessions");
        Ok(SessionListing::from_items(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{gemini_chat, temp_dir, write_file};

    #[test]
    fn test_is_chat_file_layout() {
        let root = Path::new("/h/tmp");
        assert!(is_chat_file(root, Path::new("/h/tmp/abc/chats/session-1.json")));
        assert!(!is_chat_file(root, Path::new("/h/tmp/abc/logs.json")));
        assert!(!is_chat_file(root, Path::new("/h/tmp/abc/chats/x/deep.json")));
        assert!(!is_chat_file(root, Path::new("/h/tmp/abc/chats/notes.txt")));
    }

    #[tokio::test]
    async fn test_summary_preferred_over_first_message() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            "tmp/9f8e/chats/session-a.json",
            &gemini_chat("a", Some("Release checklist"), "what's left before release?"),
        );
        write_file(
            temp.path(),
            "tmp/9f8e/chats/session-b.json",
            &gemini_chat("b", None, "draft the changelog"),
        );
        let store = GeminiStore::new(temp.path());

        let listing = store.list_sessions().await.unwrap();
        assert_eq!(listing.counts.total, 2);
        let a = listing.items.iter().find(|i| i.thread_id == "a").unwrap();
        assert_eq!(a.title, "Release checklist");
        assert_eq!(a.extras.message_count, Some(2));
        assert_eq!(a.extras.project.as_deref(), Some("9f8e"));
        let b = listing.items.iter().find(|i| i.thread_id == "b").unwrap();
        assert_eq!(b.title, "draft the changelog");
    }

    #[tokio::test]
    async fn test_corrupt_and_system_chats_are_hidden() {
        let temp = temp_dir();
        write_file(temp.path(), "tmp/h/chats/broken.json", "{\"messages\": [");
        write_file(
            temp.path(),
            "tmp/h/chats/ctx.json",
            &gemini_chat("ctx", None, "<environment_context>x</environment_context>"),
        );
        write_file(
            temp.path(),
            "tmp/h/chats/ok.json",
            &gemini_chat("ok", None, "hello"),
        );
        let store = GeminiStore::new(temp.path());

        let listing = store.list_sessions().await.unwrap();
        assert_eq!(listing.counts.total, 1);
        assert_eq!(listing.items[0].thread_id, "ok");
    }

    #[tokio::test]
    async fn test_timestamps_come_from_document() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            "tmp/h/chats/t.json",
            &gemini_chat("t", None, "hello"),
        );
        let store = GeminiStore::new(temp.path());
        let item = store.list_sessions().await.unwrap().items.remove(0);
        assert_eq!(item.created_at.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        assert_eq!(item.updated_at.to_rfc3339(), "2026-03-01T10:05:00+00:00");
    }
}
