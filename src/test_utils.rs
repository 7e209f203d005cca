//! Test utilities for chatshelf
//!
//! Fixture writers for each provider's on-disk layout, plus helpers for
//! asserting on error kinds.

use crate::error::ChatshelfError;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Writes `content` at `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Joins records into newline-delimited JSON
pub fn jsonl(records: &[serde_json::Value]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

/// A Codex rollout: session_meta, injected context, then the user's message
pub fn codex_rollout(thread_id: &str, first_message: &str, source: &str) -> String {
    jsonl(&[
        json!({
            "timestamp": "2026-02-08T03:11:52.000Z",
            "type": "session_meta",
            "payload": {
                "id": thread_id,
                "cwd": "/work/app",
                "originator": "codex_cli_rs",
                "cli_version": "0.98.0",
                "source": source,
                "git": {"branch": "main"}
            }
        }),
        json!({
            "type": "response_item",
            "payload": {
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": "<environment_context>cwd</environment_context>"}]
            }
        }),
        json!({
            "type": "event_msg",
            "payload": {"type": "user_message", "message": first_message}
        }),
        json!({
            "type": "event_msg",
            "payload": {"type": "agent_message", "message": "on it"}
        }),
    ])
}

/// Relative path of a Codex rollout under `sessions/`
pub fn codex_active_path(thread_id: &str) -> String {
    format!(
        "sessions/2026/02/08/rollout-2026-02-08T03-11-52-{}.jsonl",
        thread_id
    )
}

/// A Claude Code transcript whose first user record carries `first_message`
pub fn claude_transcript(session_id: &str, first_message: &str) -> String {
    jsonl(&[
        json!({
            "type": "user",
            "isMeta": true,
            "sessionId": session_id,
            "message": {"role": "user", "content": "Caveat: local command output follows"}
        }),
        json!({
            "type": "user",
            "sessionId": session_id,
            "cwd": "/work/app",
            "gitBranch": "feature/x",
            "message": {"role": "user", "content": [{"type": "text", "text": first_message}]}
        }),
        json!({
            "type": "assistant",
            "sessionId": session_id,
            "message": {"role": "assistant", "content": [{"type": "text", "text": "sure"}]}
        }),
    ])
}

/// A Gemini CLI chat document
pub fn gemini_chat(session_id: &str, summary: Option<&str>, first_message: &str) -> String {
    let mut doc = json!({
        "sessionId": session_id,
        "projectHash": "9f8e",
        "startTime": "2026-03-01T10:00:00.000Z",
        "lastUpdated": "2026-03-01T10:05:00.000Z",
        "messages": [
            {"id": "m1", "type": "user", "content": first_message},
            {"id": "m2", "type": "gemini", "content": "done"}
        ]
    });
    if let Some(summary) = summary {
        doc["summary"] = json!(summary);
    }
    doc.to_string()
}

/// Extracts the domain error from an `anyhow::Error`
///
/// # Panics
///
/// Panics if the error is not a `ChatshelfError`
pub fn domain_error(err: &anyhow::Error) -> &ChatshelfError {
    err.downcast_ref::<ChatshelfError>()
        .unwrap_or_else(|| panic!("Expected ChatshelfError, got: {:#}", err))
}
