//! Claude Code session store
//!
//! Transcripts live under `projects/`, one directory per project (nesting is
//! tolerated), each holding flat `<sessionId>.jsonl` files. Sub-agent
//! transcripts (`agent-*.jsonl`, anything under `subagents/`) are not
//! sessions of their own. Claude Code has no archived location, so this
//! store only implements [`SessionStore`].

use crate::error::{is_not_found, Result};
use crate::fs_utils::{relative_display, walk_files};
use crate::providers::{
    created_or_modified, stat_if_present, to_utc, Provider, SessionExtras, SessionItem,
    SessionListing, SessionState, SessionStore,
};
use crate::title::{
    content_text, is_system_generated, placeholder_title, scan_jsonl, title_from_message,
    FileStamp, ResolvedSignals, ScanControl, TitleCache,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Directory holding per-project transcript folders
pub const PROJECTS_DIR: &str = "projects";

/// Lines read before giving up on finding a title
const CLAUDE_SCAN_LINE_LIMIT: usize = 400;

#[derive(Debug, Clone, Default)]
struct ClaudeSignals {
    resolved: ResolvedSignals,
    git_branch: Option<String>,
    cwd: Option<String>,
}

/// Store for Claude Code transcripts
pub struct ClaudeStore {
    home: PathBuf,
    cache: TitleCache<ClaudeSignals>,
    mutation_lock: tokio::sync::Mutex<()>,
}

impl ClaudeStore {
    /// Creates a store rooted at the Claude home (usually `~/.claude`)
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cache: TitleCache::new(),
            mutation_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Root of project directories
    pub fn projects_root(&self) -> PathBuf {
        self.home.join(PROJECTS_DIR)
    }

    async fn resolve_signals(path: &Path) -> Result<ClaudeSignals> {
        let mut signals = ClaudeSignals::default();
        let mut first_user: Option<String> = None;

        scan_jsonl(path, CLAUDE_SCAN_LINE_LIMIT, |record| {
            if signals.cwd.is_none() {
                signals.cwd = string_at(record, "cwd");
            }
            if signals.git_branch.is_none() {
                signals.git_branch = string_at(record, "gitBranch");
            }

            if first_user.is_none() && is_user_authored(record) {
                first_user = record
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(content_text);
            }

            if first_user.is_some() {
                ScanControl::Stop
            } else {
                ScanControl::Continue
            }
        })
        .await?;

        signals.resolved = ResolvedSignals {
            title: first_user
                .as_deref()
                .and_then(|text| title_from_message(text, &[])),
            system_generated: is_system_generated(first_user.as_deref(), None),
            source: None,
        };
        Ok(signals)
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
            tracing::debug!(path = ?path, "Hiding system-generated Claude session");
            return Ok(None);
        }

        let Some(relative_path) = relative_display(&self.home, path) else {
            return Ok(None);
        };
        let thread_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let projects_root = self.projects_root();
        let project = path
            .parent()
            .filter(|parent| *parent != projects_root.as_path())
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());

        let title = signals
            .resolved
            .title
            .clone()
            .unwrap_or_else(|| placeholder_title(&thread_id));

        Ok(Some(SessionItem {
            item_id: Provider::Claude.encode_item_id(&relative_path),
            thread_id,
            title,
            state: SessionState::Active,
            provider: Provider::Claude,
            absolute_path: path.to_path_buf(),
            relative_path,
            size_bytes: stamp.size,
            created_at: created_or_modified(&metadata),
            updated_at: to_utc(stamp.modified),
            extras: SessionExtras {
                git_branch: signals.git_branch.clone(),
                cwd: signals.cwd.clone(),
                project,
                message_count: None,
                source: None,
                cli_version: None,
            },
        }))
    }
}

fn string_at(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A `user` record typed by a person
///
/// Meta records (command caveats), sidechain records (sub-agent turns), and
/// records carrying only tool results do not count.
fn is_user_authored(record: &Value) -> bool {
    if record.get("type").and_then(Value::as_str) != Some("user") {
        return false;
    }
    let flag = |key: &str| record.get(key).and_then(Value::as_bool).unwrap_or(false);
    if flag("isMeta") || flag("isSidechain") {
        return false;
    }
    record
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(content_text)
        .is_some()
}

/// Transcript files only; sub-agent logs are skipped
fn is_transcript_file(projects_root: &Path, path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return false;
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if stem.is_empty() || stem.starts_with("agent-") {
        return false;
    }
    let rel = path.strip_prefix(projects_root).unwrap_or(path);
    !rel
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part == "subagents"))
}

#[async_trait]
impl SessionStore for ClaudeStore {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn home_root(&self) -> &Path {
        &self.home
    }

    fn mutation_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.mutation_lock
    }

    async fn list_sessions(&self) -> Result<SessionListing> {
        let projects_root = self.projects_root();
        let mut live = HashSet::new();
        let mut items = Vec::new();

        for path in walk_files(&projects_root).await? {
            if !is_transcript_file(&projects_root, &path) {
                continue;
            }
            if let Some(item) = self.build_item(&path, &mut live).await? {
                items.push(item);
            }
        }

        self.cache.retain_only(&live);
        tracing::debug!(count = items.len(), "Listed Claude sessions");
        Ok(SessionListing::from_items(items))
    }
}
