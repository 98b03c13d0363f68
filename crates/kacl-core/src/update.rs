//! Changelog updates from commit history.
//!
//! New entries (usually commit subjects since the last tag) land in
//! Unreleased under `Uncategorized`, newest on top, skipping anything the
//! changelog already mentions. Cutting a release candidate additionally
//! creates the release section and moves Unreleased into it.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::category::Category;
use crate::changelog::{AddChange, AddRelease, Changelog, ChangelogOptions};
use crate::error::{ChangelogError, ParseError};
use crate::format::{FormatError, FormatResult, Formatter};
use crate::links;
use crate::parse::ParseOptions;
use crate::pr_links;

static TRAILING_PR_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(#(?P<number>\d+)\)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Errors from [`update_changelog`].
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The existing text is not a well-formed changelog.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A mutation was rejected.
    #[error(transparent)]
    Change(#[from] ChangelogError),

    /// The formatter failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Release candidate updates need a version.
    #[error("current version required for a release candidate update")]
    CurrentVersionRequired,

    /// The version being cut has already been tagged.
    #[error("version {version} is already tagged as {tag}")]
    AlreadyTagged {
        /// The version being cut.
        version: String,
        /// The existing tag.
        tag: String,
    },
}

/// Result alias using [`UpdateError`].
pub type UpdateResult<T> = Result<T, UpdateError>;

/// A candidate changelog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Entry text.
    pub description: String,
    /// Referenced pull requests.
    pub pr_numbers: Vec<u64>,
}

impl NewEntry {
    /// An entry without pull request references.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            pr_numbers: Vec::new(),
        }
    }

    /// Build an entry from a commit subject, turning a trailing `(#123)`
    /// into a pull request reference.
    pub fn from_commit_subject(subject: &str) -> Self {
        let subject = subject.trim();
        if let Some(captures) = TRAILING_PR_NUMBER.captures(subject)
            && let (Some(whole), Some(number)) = (captures.get(0), captures.name("number"))
            && let Ok(number) = number.as_str().parse::<u64>()
            && whole.start() > 0
        {
            return Self {
                description: subject[..whole.start()].to_string(),
                pr_numbers: vec![number],
            };
        }
        Self::new(subject)
    }
}

/// Settings for [`update_changelog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Version being released.
    pub current_version: Option<String>,
    /// Cut the current version from Unreleased.
    pub release_candidate: bool,
    /// Date recorded on a release created by this update.
    pub release_date: Option<NaiveDate>,
    /// Latest existing tag, checked against the version being cut.
    pub most_recent_tag: Option<String>,
    /// Entries to add, newest first.
    pub new_entries: Vec<NewEntry>,
}

/// Apply `update` to changelog text.
///
/// Returns the new text, or `None` when nothing changed.
///
/// # Errors
///
/// See [`UpdateError`].
#[instrument(skip_all, fields(
    release_candidate = update.release_candidate,
    entries = update.new_entries.len(),
))]
pub fn update_changelog(
    content: &str,
    options: &ParseOptions,
    formatter: Option<Box<dyn Formatter>>,
    update: &UpdateOptions,
) -> UpdateResult<Option<String>> {
    let mut changelog = Changelog::parse(content, options)?.with_boxed_formatter(formatter);

    let release = if update.release_candidate {
        let version = update
            .current_version
            .as_deref()
            .ok_or(UpdateError::CurrentVersionRequired)?;
        prepare_release(&mut changelog, version, update)?;
        Some(version)
    } else {
        None
    };

    let added = add_new_entries(&mut changelog, &update.new_entries)?;
    if let Some(version) = release {
        changelog.migrate_unreleased_changes_to_release(version)?;
    }

    let updated = changelog.render()?;
    debug!(added, changed = updated != content, "changelog updated");
    Ok((updated != content).then_some(updated))
}

/// The rendered empty changelog.
///
/// # Errors
///
/// Whatever the formatter reports.
pub fn init_changelog(
    options: &ChangelogOptions,
    formatter: Option<Box<dyn Formatter>>,
) -> FormatResult<String> {
    Changelog::new(options.clone())
        .with_boxed_formatter(formatter)
        .render()
}

fn prepare_release(changelog: &mut Changelog, version: &str, update: &UpdateOptions) -> UpdateResult<()> {
    let parsed = Version::parse(version).map_err(|e| ChangelogError::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })?;
    let tag = links::tag_name(changelog.options(), &parsed);
    if update.most_recent_tag.as_deref() == Some(tag.as_str()) {
        return Err(UpdateError::AlreadyTagged {
            version: version.to_string(),
            tag,
        });
    }

    if changelog.release(version).is_none() {
        let mut release = AddRelease::new(version);
        if let Some(date) = update.release_date {
            release = release.with_date(date);
        }
        changelog.add_release(release)?;
    }
    Ok(())
}

/// Add entries not yet mentioned anywhere in the changelog.
fn add_new_entries(changelog: &mut Changelog, entries: &[NewEntry]) -> UpdateResult<usize> {
    let mut logged_prs: HashSet<u64> = HashSet::new();
    let mut logged_descriptions: HashSet<String> = HashSet::new();
    let repo_url = changelog.options().repo_url.clone();
    let sections = std::iter::once(changelog.unreleased_changes()).chain(
        changelog
            .releases()
            .iter()
            .filter_map(|release| changelog.release_changes(&release.version().to_string()).ok()),
    );
    for changes in sections {
        for change in changes.values().flatten() {
            logged_prs.extend(change.pr_numbers());
            // Links are left in the text when extraction is off.
            let extracted = pr_links::extract(change.description(), &repo_url);
            logged_prs.extend(extracted.pr_numbers);
            logged_descriptions.insert(extracted.description);
        }
    }

    // Oldest first, each prepended, so the newest ends up on top.
    let mut added = 0;
    for entry in entries.iter().rev() {
        let known = if entry.pr_numbers.is_empty() {
            logged_descriptions.contains(&entry.description)
        } else {
            entry.pr_numbers.iter().any(|n| logged_prs.contains(n))
        };
        if known || entry.description.trim().is_empty() {
            continue;
        }

        changelog.add_change(
            AddChange::new(Category::Uncategorized.as_str(), &entry.description)
                .with_pr_numbers(entry.pr_numbers.clone()),
        )?;
        logged_prs.extend(&entry.pr_numbers);
        logged_descriptions.insert(entry.description.clone());
        added += 1;
    }
    Ok(added)
}
