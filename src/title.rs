//! Title and provenance signal resolution
//!
//! Conversation files are scanned line by line, with a hard cap on how many
//! lines are read, until every signal a provider needs has been seen. The
//! result is memoized per file in a [`TitleCache`] keyed on the file's
//! modification time and size.

use crate::error::Result;
use anyhow::Context;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use unicode_segmentation::UnicodeSegmentation;

/// Maximum visible characters in a display title
pub const TITLE_MAX_CHARS: usize = 56;

/// Appended to titles cut at [`TITLE_MAX_CHARS`]
pub const TITLE_ELLIPSIS: char = '…';

/// First-message prefixes that mark a session as machine-initiated
///
/// Matched case-insensitively against the trimmed first user message.
const SYSTEM_TRIGGER_PREFIXES: &[&str] = &[
    // skill invocations
    "<skill",
    "<command-name>",
    "<command-message>",
    "base directory for this skill",
    // agent instruction headers
    "# agents.md instructions",
    "<user_instructions>",
    "# claude.md",
    // injected wrapper tags
    "<environment_context",
    "<permissions",
    "<context",
    "<collaboration",
];

/// Session sources that never involve a person typing
const NON_INTERACTIVE_SOURCES: &[&str] = &["exec", "mcp"];

/// Source tags starting with this are spawned by another agent
const SUBAGENT_SOURCE_PREFIX: &str = "subagent";

/// Collapses runs of whitespace to single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caps a title at [`TITLE_MAX_CHARS`] characters
///
/// Longer titles keep their first 55 characters followed by an ellipsis.
/// A character here is an extended grapheme cluster, so combining marks and
/// joined emoji count once and are never split.
///
/// # Examples
///
/// ```
/// use chatshelf::title::truncate_title;
///
/// let long = "x".repeat(80);
/// let cut = truncate_title(&long);
/// assert_eq!(cut.chars().count(), 56);
/// assert!(cut.ends_with('…'));
/// ```
pub fn truncate_title(text: &str) -> String {
    if text.graphemes(true).count() <= TITLE_MAX_CHARS {
        return text.to_string();
    }
    let mut out: String = text.graphemes(true).take(TITLE_MAX_CHARS - 1).collect();
    out.push(TITLE_ELLIPSIS);
    out
}

/// Drops everything up to and including the first boilerplate marker found
pub fn strip_boilerplate<'a>(text: &'a str, markers: &[&str]) -> &'a str {
    for marker in markers {
        if let Some(idx) = text.find(marker) {
            return &text[idx + marker.len()..];
        }
    }
    text
}

/// Turns a raw user message into a display title
///
/// Returns `None` when nothing printable remains.
pub fn title_from_message(raw: &str, boilerplate_markers: &[&str]) -> Option<String> {
    let collapsed = collapse_whitespace(strip_boilerplate(raw, boilerplate_markers));
    if collapsed.is_empty() {
        None
    } else {
        Some(truncate_title(&collapsed))
    }
}

/// Title shown when a session has no usable first message
pub fn placeholder_title(thread_id: &str) -> String {
    let short: String = thread_id.chars().take(8).collect();
    if short.is_empty() {
        "Untitled session".to_string()
    } else {
        format!("Untitled session {}", short)
    }
}

/// Returns true if the first user message looks machine-generated
pub fn is_system_trigger(first_user_text: &str) -> bool {
    let lowered = first_user_text.trim_start().to_lowercase();
    SYSTEM_TRIGGER_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Decides whether a session should be hidden from listings
///
/// # Arguments
///
/// * `first_user_text` - Raw text of the first user-authored record, if any
/// * `source` - Session source tag for providers that record one
pub fn is_system_generated(first_user_text: Option<&str>, source: Option<&str>) -> bool {
    let Some(text) = first_user_text else {
        return true;
    };
    if is_system_trigger(text) {
        return true;
    }
    match source {
        Some(source) => {
            let lowered = source.to_lowercase();
            NON_INTERACTIVE_SOURCES.contains(&lowered.as_str())
                || lowered.starts_with(SUBAGENT_SOURCE_PREFIX)
        }
        None => false,
    }
}

/// Outcome of resolving a conversation file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSignals {
    /// Display title, if the first user message produced one
    pub title: Option<String>,
    /// Session source tag, when the provider records one
    pub source: Option<String>,
    /// Hidden from listings
    pub system_generated: bool,
}

/// Whether a line visitor wants more input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Keep reading
    Continue,
    /// All needed signals captured
    Stop,
}

/// Streams up to `max_lines` JSON records from a newline-delimited file
///
/// Blank and unparsable lines are skipped silently (a partially written
/// trailing line is normal). Invalid UTF-8 is replaced rather than rejected.
/// Blank lines still count toward the cap.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened or read.
pub async fn scan_jsonl<F>(path: &Path, max_lines: usize, mut visit: F) -> Result<()>
where
    F: FnMut(&Value) -> ScanControl,
{
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {:?}", path))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    for _ in 0..max_lines {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };
        if visit(&value) == ScanControl::Stop {
            break;
        }
    }

    Ok(())
}

/// Extracts text from a message `content` field
///
/// Accepts a bare string or an array of parts carrying `text`. Parts of
/// other kinds (tool results, images) are ignored.
pub fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|part| {
                    matches!(
                        part.get("type").and_then(Value::as_str),
                        None | Some("text") | Some("input_text")
                    )
                })
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        _ => None,
    }
}

/// Modification time and size of a file at the moment it was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    /// Last modification time, if the platform reports one
    pub modified: Option<SystemTime>,
    /// Length in bytes
    pub size: u64,
}

impl FileStamp {
    /// Captures the stamp from filesystem metadata
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            size: metadata.len(),
        }
    }
}

struct CacheEntry<S> {
    stamp: FileStamp,
    version: Option<String>,
    signals: S,
}

/// Memoized resolution results, keyed by absolute path
///
/// An entry is valid only while the observed stamp matches, and, for callers
/// that pass one, while the external override version matches too. Each
/// store owns its own cache.
pub struct TitleCache<S> {
    entries: Mutex<HashMap<PathBuf, CacheEntry<S>>>,
}

impl<S: Clone> TitleCache<S> {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, CacheEntry<S>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns cached signals if `stamp` and `version` still match
    pub fn get(&self, path: &Path, stamp: &FileStamp, version: Option<&str>) -> Option<S> {
        let entries = self.lock();
        let entry = entries.get(path)?;
        if entry.stamp == *stamp && entry.version.as_deref() == version {
            Some(entry.signals.clone())
        } else {
            None
        }
    }

    /// Stores signals observed at `stamp`
    pub fn insert(&self, path: PathBuf, stamp: FileStamp, version: Option<String>, signals: S) {
        self.lock().insert(
            path,
            CacheEntry {
                stamp,
                version,
                signals,
            },
        );
    }

    /// Drops entries for paths not observed in the latest full listing
    pub fn retain_only(&self, live: &HashSet<PathBuf>) {
        self.lock().retain(|path, _| live.contains(path));
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Clone> Default for TitleCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_title_cuts_to_55_plus_ellipsis() {
        let long = "a".repeat(60);
        let cut = truncate_title(&long);
        assert_eq!(cut.chars().count(), 56);
        assert_eq!(cut, format!("{}…", "a".repeat(55)));
    }

    #[test]
    fn test_truncate_title_keeps_exact_length() {
        let exact = "b".repeat(56);
        assert_eq!(truncate_title(&exact), exact);
    }

    #[test]
    fn test_truncate_title_counts_chars_not_bytes() {
        let wide = "é".repeat(56);
        assert_eq!(truncate_title(&wide), wide);
        let wider = "日".repeat(57);
        assert_eq!(truncate_title(&wider).chars().count(), 56);
    }

    #[test]
    fn test_truncate_title_counts_graphemes() {
        // e + combining acute accent renders as one character
        let decomposed = "e\u{301}".repeat(40);
        assert_eq!(truncate_title(&decomposed), decomposed);

        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        assert_eq!(truncate_title(&family.repeat(10)), family.repeat(10));

        let long = format!("{}{}", "a".repeat(54), family.repeat(3));
        let cut = truncate_title(&long);
        assert_eq!(cut, format!("{}{}…", "a".repeat(54), family));
        assert_eq!(cut.graphemes(true).count(), 56);
    }

    #[test]
    fn test_title_from_message_collapses_whitespace() {
        let title = title_from_message("  fix   the\n\tbuild  ", &[]).unwrap();
        assert_eq!(title, "fix the build");
    }

    #[test]
    fn test_title_from_message_strips_boilerplate() {
        let raw = "# Context from my IDE setup:\nfoo.rs\n## My request for Codex:\nrename it";
        let title = title_from_message(raw, &["## My request for Codex:"]).unwrap();
        assert_eq!(title, "rename it");
    }

    #[test]
    fn test_title_from_message_empty_is_none() {
        assert!(title_from_message(" \n ", &[]).is_none());
    }

    #[test]
    fn test_placeholder_title_uses_short_id() {
        assert_eq!(
            placeholder_title("0199a1b2-ffff"),
            "Untitled session 0199a1b2"
        );
        assert_eq!(placeholder_title(""), "Untitled session");
    }

    #[test]
    fn test_is_system_generated_rules() {
        assert!(is_system_generated(None, None));
        assert!(is_system_generated(Some("<skill>review</skill>"), None));
        assert!(is_system_generated(
            Some("# AGENTS.md instructions for /repo"),
            None
        ));
        assert!(is_system_generated(
            Some("<ENVIRONMENT_CONTEXT>cwd</ENVIRONMENT_CONTEXT>"),
            None
        ));
        assert!(is_system_generated(Some("hello"), Some("exec")));
        assert!(is_system_generated(Some("hello"), Some("subagent_review")));
        assert!(!is_system_generated(Some("hello"), Some("cli")));
        assert!(!is_system_generated(Some("refactor the parser"), None));
    }

    #[test]
    fn test_content_text_variants() {
        assert_eq!(
            content_text(&serde_json::json!("plain")),
            Some("plain".to_string())
        );
        let parts = serde_json::json!([
            {"type": "input_text", "text": "one"},
            {"type": "tool_result", "content": "ignored"},
            {"type": "text", "text": "two"}
        ]);
        assert_eq!(content_text(&parts), Some("one\ntwo".to_string()));
        let tool_only = serde_json::json!([{"type": "tool_result", "content": "x"}]);
        assert_eq!(content_text(&tool_only), None);
    }

    #[tokio::test]
    async fn test_scan_jsonl_skips_bad_lines_and_honors_cap() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("s.jsonl");
        let body = "{\"n\":1}\nnot json\n\n{\"n\":2}\n{\"n\":3}\n{\"n\":4";
        tokio::fs::write(&path, body).await.unwrap();

        let mut seen = Vec::new();
        scan_jsonl(&path, 4, |v| {
            seen.push(v["n"].as_i64().unwrap());
            ScanControl::Continue
        })
        .await
        .unwrap();
        assert_eq!(seen, vec![1, 2]);

        let mut all = Vec::new();
        scan_jsonl(&path, 100, |v| {
            all.push(v["n"].as_i64().unwrap());
            ScanControl::Continue
        })
        .await
        .unwrap();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_scan_jsonl_stops_early() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("s.jsonl");
        tokio::fs::write(&path, "{\"n\":1}\n{\"n\":2}\n").await.unwrap();

        let mut count = 0;
        scan_jsonl(&path, 100, |_| {
            count += 1;
            ScanControl::Stop
        })
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_title_cache_hit_and_invalidation() {
        let cache: TitleCache<String> = TitleCache::new();
        let path = PathBuf::from("/x/a.jsonl");
        let stamp = FileStamp {
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(10)),
            size: 42,
        };
        cache.insert(path.clone(), stamp, None, "cached".to_string());

        assert_eq!(cache.get(&path, &stamp, None), Some("cached".to_string()));

        let grown = FileStamp { size: 43, ..stamp };
        assert_eq!(cache.get(&path, &grown, None), None);

        let touched = FileStamp {
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(11)),
            ..stamp
        };
        assert_eq!(cache.get(&path, &touched, None), None);
    }

    #[test]
    fn test_title_cache_version_must_match() {
        let cache: TitleCache<u8> = TitleCache::new();
        let path = PathBuf::from("/x/b.jsonl");
        let stamp = FileStamp {
            modified: None,
            size: 1,
        };
        cache.insert(path.clone(), stamp, Some("v1".to_string()), 7);
        assert_eq!(cache.get(&path, &stamp, Some("v1")), Some(7));
        assert_eq!(cache.get(&path, &stamp, Some("v2")), None);
        assert_eq!(cache.get(&path, &stamp, None), None);
    }

    #[test]
    fn test_title_cache_retain_only_prunes() {
        let cache: TitleCache<u8> = TitleCache::new();
        let stamp = FileStamp {
            modified: None,
            size: 0,
        };
        cache.insert(PathBuf::from("/keep"), stamp, None, 1);
        cache.insert(PathBuf::from("/drop"), stamp, None, 2);

        let live: HashSet<PathBuf> = [PathBuf::from("/keep")].into_iter().collect();
        cache.retain_only(&live);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(Path::new("/keep"), &stamp, None), Some(1));
    }
}
