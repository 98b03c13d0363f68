//! Error types for kacl-core

use std::fmt;

use semver::Version;
use thiserror::Error;

/// Errors from mutating a [`Changelog`](crate::Changelog).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangelogError {
    /// A release was added without a version.
    #[error("version required")]
    MissingVersion,

    /// A release version is not valid semver.
    #[error("invalid semver version: '{version}'")]
    InvalidVersion {
        /// The rejected version text.
        version: String,
        /// Why the semver parser rejected it.
        reason: String,
    },

    /// A release with this version already exists.
    #[error("release {0} already exists")]
    DuplicateRelease(Version),

    /// A release status that is not a single word.
    #[error("invalid release status: '{0}'")]
    InvalidStatus(String),

    /// A change was added without a category.
    #[error("category required")]
    MissingCategory,

    /// A change category outside the registry.
    #[error("unrecognized category: '{0}'")]
    UnknownCategory(String),

    /// A change was added with an empty description.
    #[error("description required")]
    MissingDescription,

    /// The referenced release version is not in the changelog.
    #[error("release {0} does not exist")]
    ReleaseNotFound(String),
}

/// Result alias using [`ChangelogError`].
pub type ChangelogResult<T> = Result<T, ChangelogError>;

/// Longest line excerpt carried by a [`ParseError`].
const MAX_LINE_EXCERPT: usize = 80;

/// The offending line of a [`ParseError`], truncated for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number within the parsed text.
    pub number: usize,
    /// Line content, cut to 80 characters (with `...` appended when cut).
    pub text: String,
}

impl Line {
    pub(crate) fn new(number: usize, text: &str) -> Self {
        let text = if text.chars().count() > MAX_LINE_EXCERPT {
            let mut excerpt: String = text.chars().take(MAX_LINE_EXCERPT).collect();
            excerpt.push_str("...");
            excerpt
        } else {
            text.to_string()
        };
        Self { number, text }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: '{}'", self.number, self.text)
    }
}

/// Structural errors from parsing changelog text.
///
/// Parsing aborts at the first error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No `## [Unreleased]` line.
    #[error("failed to find Unreleased header")]
    MissingUnreleasedHeader,

    /// No `[Unreleased]: ` link reference definition after the header.
    #[error("failed to find Unreleased link reference definition")]
    MissingUnreleasedLink,

    /// A `## ` line that is not `## [<version>][ - <date>][ [<status>]]`.
    #[error("malformed release header, {0}")]
    MalformedReleaseHeader(Line),

    /// A release header whose version is not valid semver.
    #[error("invalid semver version in release header, {0}")]
    InvalidReleaseVersion(Line),

    /// A release header whose date is not a calendar date.
    #[error("invalid date in release header, {0}")]
    InvalidReleaseDate(Line),

    /// A `### ` line that is not a single word.
    #[error("malformed category header, {0}")]
    MalformedCategoryHeader(Line),

    /// A category header naming a category outside the registry.
    #[error("invalid change category, {0}")]
    UnknownCategory(Line),

    /// A change bullet with no preceding category header.
    #[error("category missing for change, {0}")]
    MissingCategory(Line),

    /// A line that matches no grammar rule.
    #[error("unrecognized line, {0}")]
    UnrecognizedLine(Line),

    /// Replaying a parsed line into the model failed.
    #[error("{source}, {line}")]
    Change {
        /// The line whose replay failed.
        line: Line,
        /// The mutation error.
        source: ChangelogError,
    },
}

impl ParseError {
    /// The offending line, for errors tied to one.
    pub const fn line(&self) -> Option<&Line> {
        match self {
            Self::MissingUnreleasedHeader | Self::MissingUnreleasedLink => None,
            Self::MalformedReleaseHeader(line)
            | Self::InvalidReleaseVersion(line)
            | Self::InvalidReleaseDate(line)
            | Self::MalformedCategoryHeader(line)
            | Self::UnknownCategory(line)
            | Self::MissingCategory(line)
            | Self::UnrecognizedLine(line)
            | Self::Change { line, .. } => Some(line),
        }
    }
}

/// Result alias using [`ParseError`].
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
