//! The in-memory changelog model and its mutation operations.
//!
//! A [`Changelog`] owns an insertion-ordered list of [`Release`]s and, for
//! every release plus the Unreleased bucket, a map from [`Category`] to the
//! [`Change`]s filed under it. State is only changed through
//! [`Changelog::add_release`], [`Changelog::add_change`] and
//! [`Changelog::migrate_unreleased_changes_to_release`]; every accessor
//! hands out shared borrows.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::category::Category;
use crate::error::{ChangelogError, ChangelogResult};
use crate::format::{FormatResult, Formatter};
use crate::stringify;

/// Label of the Unreleased bucket, in headers and link definitions.
///
/// Never a valid semantic version, so it cannot collide with a release.
pub const UNRELEASED: &str = "Unreleased";

/// Tag prefix used when none is configured.
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// Grammar of a release status token, shared with the release header parser.
pub(crate) const STATUS_PATTERN: &str = r"\w+";

static STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{STATUS_PATTERN}$"))
        .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Changes of one section, keyed by category.
pub type ReleaseChanges = BTreeMap<Category, Vec<Change>>;

/// Identifies a section of the changelog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKey {
    /// The Unreleased bucket.
    Unreleased,
    /// A concrete release.
    Release(Version),
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreleased => f.write_str(UNRELEASED),
            Self::Release(version) => write!(f, "{version}"),
        }
    }
}

/// A single changelog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    description: String,
    pr_numbers: Vec<u64>,
}

impl Change {
    /// The entry text. Later lines (sub-bullets, wrapped text) are kept verbatim.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Pull request numbers referenced by the entry.
    pub fn pr_numbers(&self) -> &[u64] {
        &self.pr_numbers
    }
}

/// Release metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl Release {
    /// The release version.
    pub const fn version(&self) -> &Version {
        &self.version
    }

    /// The release date, if recorded.
    pub const fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// The status token (e.g. `WITHDRAWN`), if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

/// Where a new release or change is inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Position {
    /// Prepend: the newest entry goes on top, as when editing by hand.
    #[default]
    Start,
    /// Append: used when replaying a document top to bottom.
    End,
}

/// Arguments for [`Changelog::add_release`].
#[derive(Debug, Clone, Default)]
pub struct AddRelease<'a> {
    version: &'a str,
    date: Option<NaiveDate>,
    status: Option<&'a str>,
    position: Position,
}

impl<'a> AddRelease<'a> {
    /// A release for `version`, undated, with no status, prepended.
    pub fn new(version: &'a str) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Set the release date.
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the status token.
    pub const fn with_status(mut self, status: &'a str) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the insertion position.
    pub const fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// Arguments for [`Changelog::add_change`].
#[derive(Debug, Clone, Default)]
pub struct AddChange<'a> {
    category: &'a str,
    description: &'a str,
    version: Option<&'a str>,
    pr_numbers: Vec<u64>,
    position: Position,
}

impl<'a> AddChange<'a> {
    /// A change for the Unreleased bucket, prepended to its category.
    pub fn new(category: &'a str, description: &'a str) -> Self {
        Self {
            category,
            description,
            ..Self::default()
        }
    }

    /// File the change under release `version` instead of Unreleased.
    pub const fn for_release(mut self, version: &'a str) -> Self {
        self.version = Some(version);
        self
    }

    /// Attach referenced pull request numbers.
    pub fn with_pr_numbers(mut self, pr_numbers: Vec<u64>) -> Self {
        self.pr_numbers = pr_numbers;
        self
    }

    /// Set the insertion position.
    pub const fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

/// Tag naming for releases published before a package rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRename {
    /// Last version released under the old name.
    pub version_before_rename: Version,
    /// Tag prefix used up to and including `version_before_rename`.
    pub tag_prefix_before_rename: String,
}

/// Repository settings that shape the link reference definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogOptions {
    /// Repository base URL, e.g. `https://github.com/acme/widget`.
    pub repo_url: String,
    /// Prefix turning a version into a tag name.
    pub tag_prefix: String,
    /// Old tag naming for releases predating a rename.
    pub package_rename: Option<PackageRename>,
}

impl ChangelogOptions {
    /// Options for `repo_url` with the default `v` tag prefix.
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            package_rename: None,
        }
    }

    /// Use `tag_prefix` instead of `v`.
    pub fn with_tag_prefix(mut self, tag_prefix: impl Into<String>) -> Self {
        self.tag_prefix = tag_prefix.into();
        self
    }

    /// Use older tag names for releases up to the rename.
    pub fn with_package_rename(mut self, package_rename: PackageRename) -> Self {
        self.package_rename = Some(package_rename);
        self
    }
}

/// A Keep a Changelog document.
pub struct Changelog {
    options: ChangelogOptions,
    releases: Vec<Release>,
    changes: HashMap<SectionKey, ReleaseChanges>,
    formatter: Option<Box<dyn Formatter>>,
}

impl fmt::Debug for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changelog")
            .field("options", &self.options)
            .field("releases", &self.releases)
            .field("changes", &self.changes)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

impl Changelog {
    /// An empty changelog: no releases and an empty Unreleased bucket.
    pub fn new(options: ChangelogOptions) -> Self {
        debug_assert!(
            Version::parse(UNRELEASED).is_err(),
            "the Unreleased label must never parse as a version"
        );
        let mut changes = HashMap::new();
        changes.insert(SectionKey::Unreleased, ReleaseChanges::new());
        Self {
            options,
            releases: Vec::new(),
            changes,
            formatter: None,
        }
    }

    /// Pass rendered text through `formatter` in [`Changelog::render`].
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Same as [`Changelog::with_formatter`], for an already boxed formatter.
    #[must_use]
    pub fn with_boxed_formatter(mut self, formatter: Option<Box<dyn Formatter>>) -> Self {
        self.formatter = formatter;
        self
    }

    /// The repository settings this changelog was built with.
    pub const fn options(&self) -> &ChangelogOptions {
        &self.options
    }

    /// Add a release.
    ///
    /// # Errors
    ///
    /// [`ChangelogError::MissingVersion`] for an empty version,
    /// [`ChangelogError::InvalidVersion`] when it is not semver,
    /// [`ChangelogError::InvalidStatus`] when the status is not a single
    /// word, and [`ChangelogError::DuplicateRelease`] when it already exists.
    #[instrument(skip_all, fields(version = release.version))]
    pub fn add_release(&mut self, release: AddRelease<'_>) -> ChangelogResult<()> {
        if release.version.is_empty() {
            return Err(ChangelogError::MissingVersion);
        }
        let version =
            Version::parse(release.version).map_err(|e| ChangelogError::InvalidVersion {
                version: release.version.to_string(),
                reason: e.to_string(),
            })?;
        let status = release.status.filter(|status| !status.is_empty());
        if let Some(status) = status
            && !STATUS.is_match(status)
        {
            return Err(ChangelogError::InvalidStatus(status.to_string()));
        }
        if self.releases.iter().any(|r| r.version == version) {
            return Err(ChangelogError::DuplicateRelease(version));
        }

        let entry = Release {
            version: version.clone(),
            date: release.date,
            status: status.map(str::to_string),
        };
        match release.position {
            Position::Start => self.releases.insert(0, entry),
            Position::End => self.releases.push(entry),
        }
        self.changes
            .insert(SectionKey::Release(version), ReleaseChanges::new());

        debug!(position = ?release.position, "release added");
        Ok(())
    }

    /// Add a change to a release, or to Unreleased when no version is given.
    ///
    /// # Errors
    ///
    /// [`ChangelogError::MissingCategory`] / [`ChangelogError::UnknownCategory`]
    /// for a bad category, [`ChangelogError::MissingDescription`] for an
    /// empty description, and [`ChangelogError::ReleaseNotFound`] when the
    /// release does not exist.
    pub fn add_change(&mut self, change: AddChange<'_>) -> ChangelogResult<()> {
        let category: Category = change.category.parse()?;
        if change.description.is_empty() {
            return Err(ChangelogError::MissingDescription);
        }
        let key = match change.version {
            Some(version) => self.release_key(version)?,
            None => SectionKey::Unreleased,
        };

        let entry = Change {
            description: change.description.to_string(),
            pr_numbers: change.pr_numbers,
        };
        let entries = self
            .changes
            .entry(key)
            .or_default()
            .entry(category)
            .or_default();
        match change.position {
            Position::Start => entries.insert(0, entry),
            Position::End => entries.push(entry),
        }
        Ok(())
    }

    /// Move everything in Unreleased into release `version`.
    ///
    /// Per category, the unreleased entries land above the release's existing
    /// entries; both sides keep their order. Unreleased is empty afterwards.
    ///
    /// # Errors
    ///
    /// [`ChangelogError::ReleaseNotFound`] when the release does not exist.
    #[instrument(skip(self))]
    pub fn migrate_unreleased_changes_to_release(&mut self, version: &str) -> ChangelogResult<()> {
        let key = self.release_key(version)?;
        let unreleased = std::mem::take(self.changes.entry(SectionKey::Unreleased).or_default());
        let migrated = unreleased.len();

        let release_changes = self.changes.entry(key).or_default();
        for (category, mut entries) in unreleased {
            let existing = release_changes.entry(category).or_default();
            entries.append(existing);
            *existing = entries;
        }

        debug!(categories = migrated, "unreleased changes migrated");
        Ok(())
    }

    /// All releases, in insertion order.
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Metadata of release `version`.
    pub fn release(&self, version: &str) -> Option<&Release> {
        let version = Version::parse(version).ok()?;
        self.releases.iter().find(|r| r.version == version)
    }

    /// Changes of release `version`.
    ///
    /// # Errors
    ///
    /// [`ChangelogError::ReleaseNotFound`] when the release does not exist.
    pub fn release_changes(&self, version: &str) -> ChangelogResult<&ReleaseChanges> {
        let key = self.release_key(version)?;
        self.changes
            .get(&key)
            .ok_or_else(|| ChangelogError::ReleaseNotFound(version.to_string()))
    }

    /// Changes in the Unreleased bucket.
    pub fn unreleased_changes(&self) -> &ReleaseChanges {
        static EMPTY: ReleaseChanges = ReleaseChanges::new();
        self.changes.get(&SectionKey::Unreleased).unwrap_or(&EMPTY)
    }

    /// Changes of any section.
    pub fn section_changes(&self, key: &SectionKey) -> Option<&ReleaseChanges> {
        self.changes.get(key)
    }

    /// The rendered section of release `version`.
    ///
    /// # Errors
    ///
    /// [`ChangelogError::ReleaseNotFound`] when the release does not exist.
    pub fn stringified_release(&self, version: &str) -> ChangelogResult<String> {
        let changes = self.release_changes(version)?;
        let release = self
            .release(version)
            .ok_or_else(|| ChangelogError::ReleaseNotFound(version.to_string()))?;
        Ok(stringify::release_section(
            release,
            changes,
            &self.options.repo_url,
        ))
    }

    /// The rendered Unreleased section.
    pub fn stringified_unreleased(&self) -> String {
        stringify::unreleased_section(self.unreleased_changes(), &self.options.repo_url)
    }

    /// The canonical text passed through the configured formatter, if any.
    ///
    /// The formatter runs exactly once per call.
    ///
    /// # Errors
    ///
    /// Whatever the formatter reports.
    pub fn render(&self) -> FormatResult<String> {
        let text = self.to_string();
        match &self.formatter {
            Some(formatter) => formatter.format(text),
            None => Ok(text),
        }
    }

    fn release_key(&self, version: &str) -> ChangelogResult<SectionKey> {
        let not_found = || ChangelogError::ReleaseNotFound(version.to_string());
        let version = Version::parse(version).map_err(|_| not_found())?;
        if self.releases.iter().any(|r| r.version == version) {
            Ok(SectionKey::Release(version))
        } else {
            Err(not_found())
        }
    }
}

impl fmt::Display for Changelog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringify::changelog(self))
    }
}
