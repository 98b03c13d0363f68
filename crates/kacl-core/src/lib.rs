//! Core library for kacl.
//!
//! A model, parser and renderer for changelogs in the
//! [Keep a Changelog](https://keepachangelog.com/en/1.0.0/) format, plus the
//! validation and update flows built on top of them.
//!
//! # Modules
//!
//! - [`changelog`] - The in-memory model and its mutation operations
//! - [`category`] - The closed set of change categories
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`format`] - Post-processing of rendered text
//! - [`git`] - Git queries used by updates
//! - [`parse`] - Changelog text parsing
//! - [`update`] - Adding commits and cutting releases
//! - [`validate`] - Validation against the canonical rendering
//!
//! # Quick Start
//!
//! ```
//! use kacl_core::{AddChange, AddRelease, Changelog, ChangelogOptions, ParseOptions};
//!
//! let mut changelog = Changelog::new(ChangelogOptions::new("https://github.com/acme/widget"));
//! changelog.add_release(AddRelease::new("1.0.0")).unwrap();
//! changelog
//!     .add_change(AddChange::new("Added", "First release").for_release("1.0.0"))
//!     .unwrap();
//!
//! let text = changelog.to_string();
//! let options = ParseOptions::new(ChangelogOptions::new("https://github.com/acme/widget"));
//! let reparsed = Changelog::parse(&text, &options).unwrap();
//! assert_eq!(reparsed.to_string(), text);
//! ```
#![deny(unsafe_code)]

pub mod category;

pub mod changelog;

pub mod config;

pub mod error;

pub mod format;

pub mod git;

mod links;

pub mod parse;

mod pr_links;

mod stringify;

pub mod update;

pub mod validate;

pub use category::Category;

pub use changelog::{
    AddChange, AddRelease, Change, Changelog, ChangelogOptions, PackageRename, Position, Release,
    ReleaseChanges, SectionKey, UNRELEASED,
};

pub use config::{ChangelogConfig, Config, ConfigLoader, LogLevel};

pub use error::{
    ChangelogError, ChangelogResult, ConfigError, ConfigResult, Line, ParseError, ParseResult,
};

pub use format::{CommandFormatter, FormatError, FormatResult, Formatter};

pub use parse::ParseOptions;

pub use update::{NewEntry, UpdateError, UpdateOptions, init_changelog, update_changelog};

pub use validate::{ValidateOptions, ValidationError, validate_changelog};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
