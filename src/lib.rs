//! chatshelf - session lifecycle and trash engine for AI assistant logs
//!
//! This library discovers conversation logs written by Codex, Claude Code,
//! and Gemini CLI, derives display titles for them, and moves them between
//! active, archived, and trashed states without ever overwriting a file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `providers`: the shared session model and one store per provider
//! - `title`: title derivation and system-session detection
//! - `trash`: soft delete with retention, restore, and purge
//! - `batch`: per-item success/failure reporting for bulk operations
//! - `library`: one facade routing opaque ids to the right store
//! - `fs_utils`: path containment and crash-safe moves
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use chatshelf::{Config, SessionLibrary};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = chatshelf::cli::Cli::parse_from(["chatshelf", "list"]);
//!     let config = Config::load(None, &cli)?;
//!     config.validate()?;
//!
//!     let library = SessionLibrary::new(&config.resolve()?);
//!     let listing = library.list_all().await?;
//!     println!("{} sessions", listing.counts.total);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod library;
pub mod providers;
pub mod title;
pub mod trash;

// Re-export commonly used types
pub use batch::{BatchFailure, BatchReport, BatchSuccess};
pub use config::{Config, ResolvedPaths};
pub use error::{ChatshelfError, Result};
pub use library::SessionLibrary;
pub use providers::{Provider, SessionItem, SessionListing, SessionState};
pub use trash::{TrashItem, TrashStore};

#[cfg(test)]
pub mod test_utils;
