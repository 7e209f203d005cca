//! Command-line interface definition for chatshelf
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for listing, archiving, trashing, and restoring
//! assistant sessions.

use crate::providers::Provider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatshelf - Manage local AI assistant session logs
///
/// Lists Codex, Claude Code, and Gemini CLI conversations and moves them
/// between active, archived, and trashed states.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatshelf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Override the trash directory
    #[arg(long, global = true, value_name = "DIR")]
    pub trash_root: Option<PathBuf>,

    /// Override how many days trashed sessions are kept
    #[arg(long, global = true, value_name = "DAYS")]
    pub retention_days: Option<u32>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatshelf
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List sessions across providers
    List {
        /// Only list one provider (codex, claude, gemini)
        #[arg(short, long)]
        provider: Option<Provider>,

        /// List archived sessions instead of active ones
        #[arg(short, long, conflicts_with = "all")]
        archived: bool,

        /// List active and archived sessions together
        #[arg(long)]
        all: bool,
    },

    /// Move active Codex sessions to the archive
    Archive {
        /// Session ids as printed by `list`
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Move archived Codex sessions back to their dated folder
    Unarchive {
        /// Session ids as printed by `list --archived`
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Move sessions into the trash
    Trash {
        /// Session ids as printed by `list`
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// List trashed sessions
    TrashList,

    /// Restore trashed sessions to where they came from
    Restore {
        /// Trash ids as printed by `trash-list`
        #[arg(required = true, value_name = "TRASH_ID")]
        ids: Vec<String>,
    },

    /// Permanently delete trashed sessions
    Purge {
        /// Trash ids as printed by `trash-list`
        #[arg(required = true, value_name = "TRASH_ID")]
        ids: Vec<String>,
    },

    /// Purge every trashed session past its retention period
    Cleanup,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
