//! Codex session store
//!
//! Layout under the Codex home:
//!
//! ```text
//! sessions/YYYY/MM/DD/rollout-<YYYY-MM-DDTHH-MM-SS>-<threadId>.jsonl   active
//! archived_sessions/rollout-<...>.jsonl                                archived
//! .codex-global-state.json                                             desktop titles
//! ```
//!
//! Rollouts start with a `session_meta` record carrying the thread id and a
//! source tag; user input arrives as `event_msg` records of type
//! `user_message`. Titles set in the desktop app override the heuristic.

use crate::error::{ChatshelfError, Result};
use crate::fs_utils::{
    is_path_inside_root, move_path, relative_display, resolve_within_root, walk_files,
};
use crate::providers::{
    created_or_modified, stat_if_present, to_utc, ArchivableStore, MoveOutcome, Provider,
    SessionExtras, SessionItem, SessionListing, SessionState, SessionStore,
};
use crate::title::{
    content_text, is_system_generated, placeholder_title, scan_jsonl, title_from_message,
    FileStamp, ResolvedSignals, ScanControl, TitleCache,
};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Directory holding date-partitioned active rollouts
pub const SESSIONS_DIR: &str = "sessions";

/// Directory holding archived rollouts
pub const ARCHIVED_DIR: &str = "archived_sessions";

/// Desktop app state file, relative to the Codex home
pub const DESKTOP_STATE_FILE: &str = ".codex-global-state.json";

/// Lines read before giving up on finding a title
const CODEX_SCAN_LINE_LIMIT: usize = 700;

/// IDE integrations wrap the request after this heading
const CODEX_BOILERPLATE_MARKERS: &[&str] = &["## My request for Codex:"];

/// Parts of a rollout file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutName {
    /// Four-digit year
    pub year: String,
    /// Two-digit month
    pub month: String,
    /// Two-digit day
    pub day: String,
    /// Local wall-clock time the rollout started
    pub started_at: NaiveDateTime,
    /// Thread id suffix
    pub thread_id: String,
}

fn rollout_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^rollout-(\d{4})-(\d{2})-(\d{2})T(\d{2})-(\d{2})-(\d{2})-([A-Za-z0-9][A-Za-z0-9_-]*)\.jsonl$",
        )
        .expect("rollout file name pattern is valid")
    })
}

/// Parses `rollout-<timestamp>-<threadId>.jsonl`
///
/// Returns `None` when the name does not follow the grammar or the embedded
/// date is not a real calendar date.
///
/// # Examples
///
/// ```
/// use chatshelf::providers::codex::parse_rollout_file_name;
///
/// let parsed = parse_rollout_file_name("rollout-2026-02-08T03-11-52-abc-123.jsonl").unwrap();
/// assert_eq!(parsed.year, "2026");
/// assert_eq!(parsed.thread_id, "abc-123");
/// assert!(parse_rollout_file_name("notes.jsonl").is_none());
/// ```
pub fn parse_rollout_file_name(name: &str) -> Option<RolloutName> {
    let caps = rollout_name_pattern().captures(name)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
    let num = |i: usize| field(i).parse::<u32>().ok();

    let date = NaiveDate::from_ymd_opt(field(1).parse().ok()?, num(2)?, num(3)?)?;
    let started_at = date.and_hms_opt(num(4)?, num(5)?, num(6)?)?;

    Some(RolloutName {
        year: field(1).to_string(),
        month: field(2).to_string(),
        day: field(3).to_string(),
        started_at,
        thread_id: field(7).to_string(),
    })
}

/// Signals cached per rollout file
#[derive(Debug, Clone, Default)]
struct CodexSignals {
    resolved: ResolvedSignals,
    thread_id: Option<String>,
    git_branch: Option<String>,
    cwd: Option<String>,
    cli_version: Option<String>,
}

/// Desktop title overrides, reloaded only when the state file changes
#[derive(Default)]
struct DesktopTitles {
    version: Option<String>,
    titles: Arc<HashMap<String, String>>,
}

/// Store for Codex rollouts
pub struct CodexStore {
    home: PathBuf,
    desktop_state_path: PathBuf,
    cache: TitleCache<CodexSignals>,
    desktop_titles: Mutex<DesktopTitles>,
    mutation_lock: tokio::sync::Mutex<()>,
}

impl CodexStore {
    /// Creates a store rooted at the Codex home
    ///
    /// The desktop state file defaults to `<home>/.codex-global-state.json`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let desktop_state_path = home.join(DESKTOP_STATE_FILE);
        Self::with_desktop_state(home, desktop_state_path)
    }

    /// Creates a store with an explicit desktop state file location
    pub fn with_desktop_state(home: impl Into<PathBuf>, desktop_state_path: PathBuf) -> Self {
        Self {
            home: home.into(),
            desktop_state_path,
            cache: TitleCache::new(),
            desktop_titles: Mutex::new(DesktopTitles::default()),
            mutation_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Root of active rollouts
    pub fn sessions_root(&self) -> PathBuf {
        self.home.join(SESSIONS_DIR)
    }

    /// Root of archived rollouts
    pub fn archived_root(&self) -> PathBuf {
        self.home.join(ARCHIVED_DIR)
    }

    /// Loads desktop title overrides, returning the version token and map
    ///
    /// A missing or unparsable state file means no overrides.
    async fn load_desktop_titles(&self) -> (Option<String>, Arc<HashMap<String, String>>) {
        let metadata = match stat_if_present(&self.desktop_state_path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, "Could not stat desktop state");
                None
            }
        };
        let version = match metadata {
            Some(metadata) => {
                let stamp = FileStamp::from_metadata(&metadata);
                let nanos = stamp
                    .modified
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                Some(format!("{}:{}", nanos, stamp.size))
            }
            None => None,
        };

        {
            let cached = self
                .desktop_titles
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if cached.version == version {
                return (version, Arc::clone(&cached.titles));
            }
        }

        let titles = match &version {
            Some(_) => Arc::new(self.read_desktop_titles().await),
            None => Arc::new(HashMap::new()),
        };

        let mut cached = self
            .desktop_titles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cached.version = version.clone();
        cached.titles = Arc::clone(&titles);
        (version, titles)
    }

    async fn read_desktop_titles(&self) -> HashMap<String, String> {
        let raw = match tokio::fs::read_to_string(&self.desktop_state_path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = ?self.desktop_state_path, error = %e, "Could not read desktop state");
                return HashMap::new();
            }
        };
        let doc: Value = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(path = ?self.desktop_state_path, error = %e, "Desktop state is not valid JSON");
                return HashMap::new();
            }
        };

        doc.get("thread-titles")
            .and_then(|t| t.get("titles"))
            .and_then(Value::as_object)
            .map(|titles| {
                titles
                    .iter()
                    .filter_map(|(thread_id, raw)| {
                        let title = title_from_message(raw.as_str()?, &[])?;
                        Some((thread_id.clone(), title))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn resolve_signals(path: &Path) -> Result<CodexSignals> {
        let mut signals = CodexSignals::default();
        let mut meta_seen = false;
        let mut source: Option<String> = None;
        let mut first_user: Option<String> = None;
        let mut fallback_user: Option<String> = None;

        scan_jsonl(path, CODEX_SCAN_LINE_LIMIT, |record| {
            let payload = record.get("payload").unwrap_or(&Value::Null);
            match record.get("type").and_then(Value::as_str) {
                Some("session_meta") if !meta_seen => {
                    meta_seen = true;
                    signals.thread_id = str_field(payload, "id");
                    signals.cwd = str_field(payload, "cwd");
                    signals.cli_version = str_field(payload, "cli_version");
                    signals.git_branch = payload
                        .get("git")
                        .and_then(|git| str_field(git, "branch"));
                    source = payload.get("source").and_then(source_tag);
                }
                Some("event_msg") if first_user.is_none() => {
                    if payload.get("type").and_then(Value::as_str) == Some("user_message") {
                        first_user = Some(str_field(payload, "message").unwrap_or_default());
                    }
                }
                Some("response_item") if fallback_user.is_none() => {
                    if is_user_message(payload) {
                        fallback_user = payload.get("content").and_then(content_text);
                    }
                }
                // Legacy rollouts wrote messages at the top level
                Some("message") if fallback_user.is_none() => {
                    if is_user_message(record) {
                        fallback_user = record.get("content").and_then(content_text);
                    }
                }
                _ => {}
            }

            if first_user.is_some() && meta_seen {
                ScanControl::Stop
            } else {
                ScanControl::Continue
            }
        })
        .await?;

        let user_text = first_user.or(fallback_user);
        signals.resolved = ResolvedSignals {
            title: user_text
                .as_deref()
                .and_then(|text| title_from_message(text, CODEX_BOILERPLATE_MARKERS)),
            system_generated: is_system_generated(user_text.as_deref(), source.as_deref()),
            source,
        };
        Ok(signals)
    }

    async fn build_item(
        &self,
        path: &Path,
        state: SessionState,
        desktop: &(Option<String>, Arc<HashMap<String, String>>),
        live: &mut HashSet<PathBuf>,
    ) -> Result<Option<SessionItem>> {
        let Some(metadata) = stat_if_present(path).await? else {
            return Ok(None);
        };
        live.insert(path.to_path_buf());

        let (version, desktop_titles) = desktop;
        let stamp = FileStamp::from_metadata(&metadata);
        let signals = match self.cache.get(path, &stamp, version.as_deref()) {
            Some(hit) => hit,
            None => match Self::resolve_signals(path).await {
                Ok(resolved) => {
                    self.cache
                        .insert(path.to_path_buf(), stamp, version.clone(), resolved.clone());
                    resolved
                }
                Err(e) if crate::error::is_not_found(&e) => return Ok(None),
                Err(e) => return Err(e),
            },
        };

        if signals.resolved.system_generated {
            tracing::debug!(path = ?path, "Hiding system-generated Codex session");
            return Ok(None);
        }

        let Some(relative_path) = relative_display(&self.home, path) else {
            return Ok(None);
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = parse_rollout_file_name(&file_name);

        let thread_id = signals
            .thread_id
            .clone()
            .or_else(|| parsed.as_ref().map(|p| p.thread_id.clone()))
            .unwrap_or_else(|| file_name.trim_end_matches(".jsonl").to_string());

        let title = desktop_titles
            .get(&thread_id)
            .cloned()
            .or_else(|| signals.resolved.title.clone())
            .unwrap_or_else(|| placeholder_title(&thread_id));

        let updated_at = to_utc(stamp.modified);
        let created_at = parsed
            .as_ref()
            .and_then(|p| Local.from_local_datetime(&p.started_at).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| created_or_modified(&metadata));

        Ok(Some(SessionItem {
            item_id: Provider::Codex.encode_item_id(&relative_path),
            thread_id,
            title,
            state,
            provider: Provider::Codex,
            absolute_path: path.to_path_buf(),
            relative_path,
            size_bytes: stamp.size,
            created_at,
            updated_at,
            extras: SessionExtras {
                git_branch: signals.git_branch.clone(),
                cwd: signals.cwd.clone(),
                project: None,
                message_count: None,
                source: signals.resolved.source.clone(),
                cli_version: signals.cli_version.clone(),
            },
        }))
    }

    /// Resolves an item's current file, refusing paths outside `root`
    fn locate(&self, item: &SessionItem, root: &Path, label: &str) -> Result<PathBuf> {
        let source = resolve_within_root(&self.home, &item.relative_path, label)?;
        if !is_path_inside_root(root, &source) {
            return Err(ChatshelfError::OutOfBoundsPath {
                label: label.to_string(),
                path: item.relative_path.clone(),
            }
            .into());
        }
        Ok(source)
    }

    async fn move_item(&self, source: &Path, destination: &Path) -> Result<MoveOutcome> {
        move_path(source, destination).await?;

        let from = relative_display(&self.home, source).unwrap_or_default();
        let to = relative_display(&self.home, destination).unwrap_or_default();
        Ok(MoveOutcome {
            item_id: Provider::Codex.encode_item_id(&to),
            from,
            to,
        })
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_user_message(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("message")
        && value.get("role").and_then(Value::as_str) == Some("user")
}

/// Flattens the `source` field to a lowercase tag
///
/// Plain strings pass through; objects such as `{"subagent": "review"}`
/// become `subagent_review`.
fn source_tag(source: &Value) -> Option<String> {
    match source {
        Value::String(s) if !s.is_empty() => Some(s.to_lowercase()),
        Value::Object(map) => {
            let (key, inner) = map.iter().next()?;
            let detail = match inner {
                Value::String(s) => Some(s.clone()),
                Value::Object(inner) => inner.keys().next().cloned(),
                _ => None,
            };
            Some(match detail {
                Some(detail) => format!("{}_{}", key, detail).to_lowercase(),
                None => key.to_lowercase(),
            })
        }
        _ => None,
    }
}

fn is_rollout_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("rollout-") && n.ends_with(".jsonl"))
        .unwrap_or(false)
}

#[async_trait]
impl SessionStore for CodexStore {
    fn provider(&self) -> Provider {
        Provider::Codex
    }

    fn home_root(&self) -> &Path {
        &self.home
    }

    fn mutation_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.mutation_lock
    }

    async fn list_sessions(&self) -> Result<SessionListing> {
        let desktop = self.load_desktop_titles().await;
        let mut live = HashSet::new();
        let mut items = Vec::new();

        for (state, root) in [
            (SessionState::Active, self.sessions_root()),
            (SessionState::Archived, self.archived_root()),
        ] {
            for path in walk_files(&root).await? {
                if !is_rollout_file(&path) {
                    continue;
                }
                if let Some(item) = self.build_item(&path, state, &desktop, &mut live).await? {
                    items.push(item);
                }
            }
        }

        self.cache.retain_only(&live);
        tracing::debug!(count = items.len(), "Listed Codex sessions");
        Ok(SessionListing::from_items(items))
    }

    fn as_archivable(&self) -> Option<&dyn ArchivableStore> {
        Some(self)
    }
}

#[async_trait]
impl ArchivableStore for CodexStore {
    async fn archive_item(&self, item: &SessionItem) -> Result<MoveOutcome> {
        let _guard = self.mutation_lock.lock().await;

        if item.state != SessionState::Active {
            return Err(ChatshelfError::InvalidTransition(format!(
                "cannot archive {} item {}",
                item.state, item.thread_id
            ))
            .into());
        }

        let sessions_root = self.sessions_root();
        let source = self.locate(item, &sessions_root, "codex sessions")?;
        let file_name = source.file_name().ok_or_else(|| {
            ChatshelfError::UnparsableLocation(item.relative_path.clone())
        })?;
        let destination = self.archived_root().join(file_name);

        let outcome = self.move_item(&source, &destination).await?;
        tracing::info!(from = %outcome.from, to = %outcome.to, "Archived Codex session");
        Ok(outcome)
    }

    async fn unarchive_item(&self, item: &SessionItem) -> Result<MoveOutcome> {
        let _guard = self.mutation_lock.lock().await;

        if item.state != SessionState::Archived {
            return Err(ChatshelfError::InvalidTransition(format!(
                "cannot unarchive {} item {}",
                item.state, item.thread_id
            ))
            .into());
        }

        let archived_root = self.archived_root();
        let source = self.locate(item, &archived_root, "codex archive")?;
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ChatshelfError::UnparsableLocation(item.relative_path.clone()))?;
        let parsed = parse_rollout_file_name(file_name)
            .ok_or_else(|| ChatshelfError::UnparsableLocation(file_name.to_string()))?;

        let destination = self
            .sessions_root()
            .join(&parsed.year)
            .join(&parsed.month)
            .join(&parsed.day)
            .join(file_name);

        let outcome = self.move_item(&source, &destination).await?;
        tracing::info!(from = %outcome.from, to = %outcome.to, "Unarchived Codex session");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        codex_active_path, codex_rollout, domain_error, jsonl, temp_dir, write_file,
    };
    use serde_json::json;

    #[test]
    fn test_parse_rollout_file_name_valid() {
        let parsed =
            parse_rollout_file_name("rollout-2026-02-08T03-11-52-0199a1b2-c3d4-e5f6.jsonl")
                .unwrap();
        assert_eq!(parsed.year, "2026");
        assert_eq!(parsed.month, "02");
        assert_eq!(parsed.day, "08");
        assert_eq!(parsed.thread_id, "0199a1b2-c3d4-e5f6");
        assert_eq!(
            parsed.started_at,
            NaiveDate::from_ymd_opt(2026, 2, 8)
                .unwrap()
                .and_hms_opt(3, 11, 52)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_rollout_file_name_rejects_bad_grammar() {
        for name in [
            "rollout-2026-02-08-abc.jsonl",
            "rollout-2026-02-08T03-11-52-.jsonl",
            "rollout-2026-02-08T03-11-52-abc.json",
            "session-2026-02-08T03-11-52-abc.jsonl",
            "rollout-2026-13-40T03-11-52-abc.jsonl",
        ] {
            assert!(parse_rollout_file_name(name).is_none(), "{name} should not parse");
        }
    }

    #[test]
    fn test_source_tag_shapes() {
        assert_eq!(source_tag(&json!("VSCode")), Some("vscode".to_string()));
        assert_eq!(
            source_tag(&json!({"subagent": "review"})),
            Some("subagent_review".to_string())
        );
        assert_eq!(
            source_tag(&json!({"subagent": {"thread_spawn": {"depth": 1}}})),
            Some("subagent_thread_spawn".to_string())
        );
        assert_eq!(source_tag(&json!(null)), None);
    }

    #[tokio::test]
    async fn test_list_sessions_missing_home_is_empty() {
        let temp = temp_dir();
        let store = CodexStore::new(temp.path().join("no-codex"));
        let listing = store.list_sessions().await.unwrap();
        assert!(listing.items.is_empty());
        assert_eq!(listing.counts.total, 0);
    }

    #[tokio::test]
    async fn test_list_sessions_resolves_title_and_extras() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            &codex_active_path("t1"),
            &codex_rollout("t1", "  Fix   the flaky\n test ", "cli"),
        );
        let store = CodexStore::new(temp.path());

        let listing = store.list_sessions().await.unwrap();
        assert_eq!(listing.items.len(), 1);
        let item = &listing.items[0];
        assert_eq!(item.title, "Fix the flaky test");
        assert_eq!(item.thread_id, "t1");
        assert_eq!(item.state, SessionState::Active);
        assert_eq!(item.relative_path, codex_active_path("t1"));
        assert_eq!(item.extras.git_branch.as_deref(), Some("main"));
        assert_eq!(item.extras.cli_version.as_deref(), Some("0.98.0"));
        assert_eq!(item.extras.source.as_deref(), Some("cli"));
        assert_eq!(
            Provider::Codex.decode_item_id(&item.item_id).as_deref(),
            Some(item.relative_path.as_str())
        );
    }

    #[tokio::test]
    async fn test_list_sessions_hides_system_sessions() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            &codex_active_path("real"),
            &codex_rollout("real", "write docs", "cli"),
        );
        write_file(
            temp.path(),
            &codex_active_path("skill"),
            &codex_rollout("skill", "<skill>", "cli"),
        );
        write_file(
            temp.path(),
            &codex_active_path("exec"),
            &codex_rollout("exec", "run in CI", "exec"),
        );
        write_file(
            temp.path(),
            &codex_active_path("empty"),
            &jsonl(&[json!({"type": "session_meta", "payload": {"id": "empty"}})]),
        );
        let store = CodexStore::new(temp.path());

        let listing = store.list_sessions().await.unwrap();
        assert_eq!(listing.counts.total, 1);
        assert_eq!(listing.items[0].title, "write docs");
    }

    #[tokio::test]
    async fn test_list_sessions_strips_ide_boilerplate() {
        let temp = temp_dir();
        let message = "# Context from my IDE setup:\n## Open tabs: a.rs\n## My request for Codex:\nadd tests";
        write_file(
            temp.path(),
            &codex_active_path("ide"),
            &codex_rollout("ide", message, "vscode"),
        );
        let store = CodexStore::new(temp.path());
        let listing = store.list_sessions().await.unwrap();
        assert_eq!(listing.items[0].title, "add tests");
    }

    #[tokio::test]
    async fn test_title_past_line_cap_is_missed() {
        let temp = temp_dir();
        let mut records = vec![json!({"type": "session_meta", "payload": {"id": "long", "source": "cli"}})];
        for i in 0..CODEX_SCAN_LINE_LIMIT {
            records.push(json!({"type": "event_msg", "payload": {"type": "token_count", "n": i}}));
        }
        records.push(json!({"type": "event_msg", "payload": {"type": "user_message", "message": "too late"}}));
        write_file(temp.path(), &codex_active_path("long"), &jsonl(&records));
        let store = CodexStore::new(temp.path());

        let listing = store.list_sessions().await.unwrap();
        assert!(listing.items.is_empty());
    }

    #[tokio::test]
    async fn test_desktop_titles_override_and_reload() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            &codex_active_path("t1"),
            &codex_rollout("t1", "heuristic title", "cli"),
        );
        let store = CodexStore::new(temp.path());
        assert_eq!(
            store.list_sessions().await.unwrap().items[0].title,
            "heuristic title"
        );

        write_file(
            temp.path(),
            DESKTOP_STATE_FILE,
            &json!({"thread-titles": {"titles": {"t1": "Renamed   in app"}}}).to_string(),
        );
        assert_eq!(
            store.list_sessions().await.unwrap().items[0].title,
            "Renamed in app"
        );

        write_file(temp.path(), DESKTOP_STATE_FILE, "{not json");
        assert_eq!(
            store.list_sessions().await.unwrap().items[0].title,
            "heuristic title"
        );
    }

    #[tokio::test]
    async fn test_cache_pruned_after_listing() {
        let temp = temp_dir();
        let path = write_file(
            temp.path(),
            &codex_active_path("gone"),
            &codex_rollout("gone", "temporary", "cli"),
        );
        let store = CodexStore::new(temp.path());
        store.list_sessions().await.unwrap();
        assert_eq!(store.cache.len(), 1);

        std::fs::remove_file(path).unwrap();
        store.list_sessions().await.unwrap();
        assert!(store.cache.is_empty());
    }

    #[tokio::test]
    async fn test_archive_and_unarchive_round_trip() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            &codex_active_path("t1"),
            &codex_rollout("t1", "keep me", "cli"),
        );
        write_file(
            temp.path(),
            &codex_active_path("t2"),
            &codex_rollout("t2", "other", "cli"),
        );
        let store = CodexStore::new(temp.path());

        let before = store.list_sessions().await.unwrap();
        assert_eq!((before.counts.active, before.counts.archived), (2, 0));
        let item = before.items.iter().find(|i| i.thread_id == "t1").unwrap();

        let archived = store.archive_item(item).await.unwrap();
        assert_eq!(
            archived.to,
            "archived_sessions/rollout-2026-02-08T03-11-52-t1.jsonl"
        );
        let mid = store.list_sessions().await.unwrap();
        assert_eq!((mid.counts.active, mid.counts.archived), (1, 1));

        let archived_item = mid
            .items
            .iter()
            .find(|i| i.item_id == archived.item_id)
            .unwrap();
        let restored = store.unarchive_item(archived_item).await.unwrap();
        assert_eq!(restored.to, codex_active_path("t1"));

        let after = store.list_sessions().await.unwrap();
        assert_eq!((after.counts.active, after.counts.archived), (2, 0));
    }

    #[tokio::test]
    async fn test_archive_rejects_wrong_state_and_existing_destination() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            &codex_active_path("t1"),
            &codex_rollout("t1", "hello", "cli"),
        );
        write_file(
            temp.path(),
            "archived_sessions/rollout-2026-02-08T03-11-52-t1.jsonl",
            &codex_rollout("t1", "hello", "cli"),
        );
        let store = CodexStore::new(temp.path());
        let listing = store.list_sessions().await.unwrap();

        let active = listing
            .items
            .iter()
            .find(|i| i.state == SessionState::Active)
            .unwrap();
        let err = store.archive_item(active).await.unwrap_err();
        assert!(matches!(
            domain_error(&err),
            ChatshelfError::DestinationExists(_)
        ));

        let archived = listing
            .items
            .iter()
            .find(|i| i.state == SessionState::Archived)
            .unwrap();
        let err = store.archive_item(archived).await.unwrap_err();
        assert!(matches!(
            domain_error(&err),
            ChatshelfError::InvalidTransition(_)
        ));
        let err = store.unarchive_item(active).await.unwrap_err();
        assert!(matches!(
            domain_error(&err),
            ChatshelfError::InvalidTransition(_)
        ));
    }

    #[tokio::test]
    async fn test_unarchive_unparsable_name() {
        let temp = temp_dir();
        write_file(
            temp.path(),
            "archived_sessions/rollout-renamed-by-hand.jsonl",
            &codex_rollout("odd", "hello", "cli"),
        );
        let store = CodexStore::new(temp.path());
        let listing = store.list_sessions().await.unwrap();
        assert_eq!(listing.counts.archived, 1);

        let err = store.unarchive_item(&listing.items[0]).await.unwrap_err();
        assert!(matches!(
            domain_error(&err),
            ChatshelfError::UnparsableLocation(_)
        ));
    }
}
