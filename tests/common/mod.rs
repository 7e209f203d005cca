use chatshelf::config::ResolvedPaths;
use chatshelf::SessionLibrary;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Provider homes and a trash root inside one temp directory
pub struct Workspace {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("failed to create tempdir"),
        }
    }

    pub fn codex_home(&self) -> PathBuf {
        self.temp.path().join("codex")
    }

    pub fn claude_home(&self) -> PathBuf {
        self.temp.path().join("claude")
    }

    pub fn gemini_home(&self) -> PathBuf {
        self.temp.path().join("gemini")
    }

    pub fn trash_root(&self) -> PathBuf {
        self.temp.path().join("trash")
    }

    pub fn paths(&self, retention_days: u32) -> ResolvedPaths {
        ResolvedPaths {
            codex_home: self.codex_home(),
            codex_desktop_state_file: self.codex_home().join(".codex-global-state.json"),
            claude_home: self.claude_home(),
            gemini_home: self.gemini_home(),
            trash_root: self.trash_root(),
            retention_days,
            auto_cleanup: false,
        }
    }

    pub fn library(&self, retention_days: u32) -> SessionLibrary {
        SessionLibrary::new(&self.paths(retention_days))
    }

    /// Writes a config file pointing every root into this workspace
    pub fn config_file(&self, retention_days: u32) -> PathBuf {
        let path = self.temp.path().join("config.yaml");
        let yaml = format!(
            "codex:\n  home: {}\nclaude:\n  home: {}\ngemini:\n  home: {}\ntrash:\n  root: {}\n  retention_days: {}\n  auto_cleanup: false\n",
            self.codex_home().display(),
            self.claude_home().display(),
            self.gemini_home().display(),
            self.trash_root().display(),
            retention_days
        );
        fs::write(&path, yaml).expect("failed to write config file");
        path
    }

    pub fn codex_session(&self, day: &str, thread_id: &str, first_message: &str) -> PathBuf {
        let relative = format!(
            "sessions/2026/01/{day}/rollout-2026-01-{day}T09-30-00-{thread_id}.jsonl"
        );
        write(
            &self.codex_home(),
            &relative,
            &jsonl(&[
                json!({"type": "session_meta", "payload": {"id": thread_id, "cwd": "/work", "source": "cli"}}),
                json!({"type": "event_msg", "payload": {"type": "user_message", "message": first_message}}),
            ]),
        )
    }

    pub fn codex_exec_session(&self, thread_id: &str) -> PathBuf {
        let relative =
            format!("sessions/2026/01/05/rollout-2026-01-05T09-30-00-{thread_id}.jsonl");
        write(
            &self.codex_home(),
            &relative,
            &jsonl(&[
                json!({"type": "session_meta", "payload": {"id": thread_id, "source": "exec"}}),
                json!({"type": "event_msg", "payload": {"type": "user_message", "message": "automated run"}}),
            ]),
        )
    }

    pub fn claude_session(&self, project: &str, session_id: &str, first_message: &str) -> PathBuf {
        write(
            &self.claude_home(),
            &format!("projects/{project}/{session_id}.jsonl"),
            &jsonl(&[
                json!({"type": "user", "sessionId": session_id, "cwd": "/work", "message": {"role": "user", "content": first_message}}),
                json!({"type": "assistant", "message": {"role": "assistant", "content": [{"type": "text", "text": "ok"}]}}),
            ]),
        )
    }

    pub fn gemini_session(&self, hash: &str, session_id: &str, first_message: &str) -> PathBuf {
        write(
            &self.gemini_home(),
            &format!("tmp/{hash}/chats/session-{session_id}.json"),
            &json!({
                "sessionId": session_id,
                "projectHash": hash,
                "messages": [
                    {"type": "user", "content": first_message},
                    {"type": "gemini", "content": "ok"}
                ]
            })
            .to_string(),
        )
    }
}

#[allow(dead_code)]
pub fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path has a parent"))
        .expect("failed to create fixture dirs");
    fs::write(&path, content).expect("failed to write fixture");
    path
}

#[allow(dead_code)]
pub fn jsonl(records: &[serde_json::Value]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}
