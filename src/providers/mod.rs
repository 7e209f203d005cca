//! Session store abstraction and provider implementations
//!
//! Each producing tool (Codex, Claude, Gemini) lays its conversation logs out
//! differently on disk, so each gets its own store. The stores share the
//! [`SessionStore`] contract; only stores with an archived location also
//! implement [`ArchivableStore`].

pub mod claude;
pub mod codex;
pub mod gemini;

pub use claude::ClaudeStore;
pub use codex::CodexStore;
pub use gemini::GeminiStore;

use crate::error::{ChatshelfError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// Tool that produced a conversation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI Codex CLI / desktop
    Codex,
    /// Claude Code
    Claude,
    /// Gemini CLI
    Gemini,
}

impl Provider {
    /// Every supported provider, in listing order
    pub const ALL: [Provider; 3] = [Provider::Codex, Provider::Claude, Provider::Gemini];

    /// Lowercase tag used in config, CLI, and serialized records
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Codex => "codex",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
        }
    }

    /// Prefix marking this provider's item ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Provider::Codex => "cx_",
            Provider::Claude => "cl_",
            Provider::Gemini => "gm_",
        }
    }

    /// Routes an item id to its provider without decoding it
    pub fn from_item_id(id: &str) -> Option<Provider> {
        Self::ALL.into_iter().find(|p| p.owns_item_id(id))
    }

    /// Returns true if `id` was produced by [`Provider::encode_item_id`] for this provider
    pub fn owns_item_id(&self, id: &str) -> bool {
        id.starts_with(self.id_prefix())
    }

    /// Encodes a home-relative path into an opaque item id
    ///
    /// # Examples
    ///
    /// ```
    /// use chatshelf::providers::Provider;
    ///
    /// let id = Provider::Claude.encode_item_id("projects/app/abc.jsonl");
    /// assert!(id.starts_with("cl_"));
    /// assert_eq!(
    ///     Provider::Claude.decode_item_id(&id).as_deref(),
    ///     Some("projects/app/abc.jsonl")
    /// );
    /// assert!(Provider::Codex.decode_item_id(&id).is_none());
    /// ```
    pub fn encode_item_id(&self, relative_path: &str) -> String {
        format!(
            "{}{}",
            self.id_prefix(),
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(relative_path.as_bytes())
        )
    }

    /// Recovers the home-relative path from one of this provider's ids
    pub fn decode_item_id(&self, id: &str) -> Option<String> {
        let encoded = id.strip_prefix(self.id_prefix())?;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ChatshelfError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "codex" => Ok(Provider::Codex),
            "claude" => Ok(Provider::Claude),
            "gemini" => Ok(Provider::Gemini),
            other => Err(ChatshelfError::Config(format!(
                "Unknown provider: {}. Must be one of: codex, claude, gemini",
                other
            ))),
        }
    }
}

/// Live location of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Under the provider's primary root
    Active,
    /// Under the provider's archived root
    Archived,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => f.write_str("active"),
            SessionState::Archived => f.write_str("archived"),
        }
    }
}

/// Provider-specific fields; none are required by the shared contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExtras {
    /// Git branch the session ran on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Working directory recorded by the tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Project directory name or project hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Number of messages, when cheaply known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
    /// Session source tag (cli, vscode, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Version of the tool that wrote the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_version: Option<String>,
}

/// A conversation as seen by one listing
///
/// Rebuilt on every listing and never persisted. `item_id` is the only
/// handle callers should hold on to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    /// Opaque id derived from the home-relative path
    pub item_id: String,
    /// Provider-native conversation id
    pub thread_id: String,
    /// Display title, never empty
    pub title: String,
    /// Active or archived
    pub state: SessionState,
    /// Producing tool
    pub provider: Provider,
    /// Location on disk
    pub absolute_path: PathBuf,
    /// Location relative to the provider home, forward slashes
    pub relative_path: String,
    /// File size
    pub size_bytes: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Provider-specific extras
    #[serde(flatten)]
    pub extras: SessionExtras,
}

/// Per-state totals of a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    /// Items in the active state
    pub active: usize,
    /// Items in the archived state
    pub archived: usize,
    /// All items
    pub total: usize,
}

impl SessionCounts {
    /// Tallies the states of `items`
    pub fn tally(items: &[SessionItem]) -> Self {
        let archived = items
            .iter()
            .filter(|i| i.state == SessionState::Archived)
            .count();
        Self {
            active: items.len() - archived,
            archived,
            total: items.len(),
        }
    }
}

/// Result of a full listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionListing {
    /// Items sorted by `updated_at`, newest first
    pub items: Vec<SessionItem>,
    /// Totals by state
    pub counts: SessionCounts,
}

impl SessionListing {
    /// Sorts `items` newest first and computes counts
    pub fn from_items(mut items: Vec<SessionItem>) -> Self {
        items.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        let counts = SessionCounts::tally(&items);
        Self { items, counts }
    }
}

/// Items resolved from a set of ids
#[derive(Debug, Clone, Default)]
pub struct FindResult {
    /// Items present in a fresh listing
    pub found: Vec<SessionItem>,
    /// Ids with no matching item
    pub missing: Vec<String>,
}

impl FindResult {
    /// Matches `ids` against a listing, preserving request order
    pub fn from_listing(ids: &[String], listing: SessionListing) -> Self {
        let mut by_id: HashMap<String, SessionItem> = listing
            .items
            .into_iter()
            .map(|item| (item.item_id.clone(), item))
            .collect();
        let mut result = FindResult::default();
        for id in ids {
            match by_id.remove(id) {
                Some(item) => result.found.push(item),
                None => result.missing.push(id.clone()),
            }
        }
        result
    }
}

/// Paths touched by an archive or unarchive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// Item id at the new location
    pub item_id: String,
    /// Home-relative source path
    pub from: String,
    /// Home-relative destination path
    pub to: String,
}

/// Contract shared by every provider store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Provider served by this store
    fn provider(&self) -> Provider;

    /// Root all of this store's relative paths are relative to
    fn home_root(&self) -> &Path;

    /// Held across every decide-then-move on files under [`Self::home_root`]
    fn mutation_lock(&self) -> &tokio::sync::Mutex<()>;

    /// Discovers sessions, hiding system-generated ones
    ///
    /// A missing root counts as zero items. Files that vanish mid-scan are
    /// skipped; other I/O errors fail the whole listing.
    async fn list_sessions(&self) -> Result<SessionListing>;

    /// Resolves ids against a fresh listing
    async fn find_items_by_ids(&self, ids: &[String]) -> Result<FindResult> {
        let listing = self.list_sessions().await?;
        Ok(FindResult::from_listing(ids, listing))
    }

    /// Returns the archive capability, if this provider has one
    fn as_archivable(&self) -> Option<&dyn ArchivableStore> {
        None
    }
}

/// Stores whose provider keeps an archived location
#[async_trait]
pub trait ArchivableStore: SessionStore {
    /// Moves an active item under the archived root
    async fn archive_item(&self, item: &SessionItem) -> Result<MoveOutcome>;

    /// Moves an archived item back under the active root
    async fn unarchive_item(&self, item: &SessionItem) -> Result<MoveOutcome>;
}

/// Converts an optional filesystem time to UTC, falling back to the epoch
pub(crate) fn to_utc(time: Option<SystemTime>) -> DateTime<Utc> {
    DateTime::<Utc>::from(time.unwrap_or(SystemTime::UNIX_EPOCH))
}

/// Stats a file, treating not-found as absent
pub(crate) async fn stat_if_present(path: &Path) -> Result<Option<Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to stat {:?}", path))),
    }
}

/// Creation time from metadata, falling back to modification time
pub(crate) fn created_or_modified(metadata: &Metadata) -> DateTime<Utc> {
    to_utc(metadata.created().ok().or_else(|| metadata.modified().ok()))
}
