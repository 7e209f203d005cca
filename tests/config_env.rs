//! Environment override tests for configuration loading
//!
//! These mutate process-wide environment variables, so every test is
//! serialized.

use chatshelf::cli::Cli;
use chatshelf::Config;
use clap::Parser;
use serial_test::serial;
use std::path::PathBuf;

const VARS: [&str; 5] = [
    "CHATSHELF_CODEX_HOME",
    "CHATSHELF_CLAUDE_HOME",
    "CHATSHELF_GEMINI_HOME",
    "CHATSHELF_TRASH_ROOT",
    "CHATSHELF_RETENTION_DAYS",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

fn missing_config() -> (tempfile::TempDir, String) {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("absent.yaml");
    (temp, path.to_string_lossy().into_owned())
}

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["chatshelf"];
    argv.extend_from_slice(args);
    argv.push("list");
    Cli::try_parse_from(argv).unwrap()
}

#[test]
#[serial]
fn test_env_overrides_homes_and_trash() {
    clear_env();
    std::env::set_var("CHATSHELF_CODEX_HOME", "/env/codex");
    std::env::set_var("CHATSHELF_CLAUDE_HOME", "/env/claude");
    std::env::set_var("CHATSHELF_GEMINI_HOME", "/env/gemini");
    std::env::set_var("CHATSHELF_TRASH_ROOT", "/env/trash");
    std::env::set_var("CHATSHELF_RETENTION_DAYS", "5");

    let (_temp, path) = missing_config();
    let config = Config::load(Some(path.as_str()), &cli(&[])).unwrap();
    let paths = config.resolve().unwrap();
    clear_env();

    assert_eq!(paths.codex_home, PathBuf::from("/env/codex"));
    assert_eq!(paths.claude_home, PathBuf::from("/env/claude"));
    assert_eq!(paths.gemini_home, PathBuf::from("/env/gemini"));
    assert_eq!(paths.trash_root, PathBuf::from("/env/trash"));
    assert_eq!(paths.retention_days, 5);
}

#[test]
#[serial]
fn test_invalid_retention_env_is_ignored() {
    clear_env();
    std::env::set_var("CHATSHELF_RETENTION_DAYS", "soon");

    let (_temp, path) = missing_config();
    let config = Config::load(Some(path.as_str()), &cli(&[])).unwrap();
    clear_env();

    assert_eq!(config.trash.retention_days, 30);
}

#[test]
#[serial]
fn test_cli_overrides_beat_env() {
    clear_env();
    std::env::set_var("CHATSHELF_TRASH_ROOT", "/env/trash");
    std::env::set_var("CHATSHELF_RETENTION_DAYS", "5");

    let (_temp, path) = missing_config();
    let config = Config::load(
        Some(path.as_str()),
        &cli(&["--trash-root", "/cli/trash", "--retention-days", "9"]),
    )
    .unwrap();
    clear_env();

    assert_eq!(config.trash.root.as_deref(), Some("/cli/trash"));
    assert_eq!(config.trash.retention_days, 9);
}

#[test]
#[serial]
fn test_codex_home_env_is_default_fallback() {
    clear_env();
    let previous = std::env::var("CODEX_HOME").ok();
    std::env::set_var("CODEX_HOME", "/legacy/codex");

    let (_temp, path) = missing_config();
    let config = Config::load(Some(path.as_str()), &cli(&[])).unwrap();

    match previous {
        Some(value) => std::env::set_var("CODEX_HOME", value),
        None => std::env::remove_var("CODEX_HOME"),
    }

    assert_eq!(config.codex.home, "/legacy/codex");
}
