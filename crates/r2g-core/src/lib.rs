pub mod backend;
pub mod bootstrap;
pub mod cache_size;
pub mod config;
pub mod driver;
pub mod error;
pub mod extension_policy;
pub mod ignore_file;
pub mod jazzignore;
pub mod message;
pub mod partition;
pub mod template;
pub mod types;

#[cfg(feature = "libgit2")]
pub mod git2_backend;

pub use driver::{CommitDriver, CycleOutcome, Migrator};
pub use error::MigrateError;
