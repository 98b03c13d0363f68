//! Canonical text rendering.
//!
//! ```text
//! # Changelog
//! <description>
//!
//! ## [Unreleased]
//! ### Added
//! - Entry
//!
//! ## [1.0.0] - 2020-01-01 [WITHDRAWN]
//! ...
//!
//! [Unreleased]: <url>
//! [1.0.0]: <url>
//! ```

use crate::category::Category;
use crate::changelog::{Change, Changelog, Release, ReleaseChanges, SectionKey};
use crate::links;

pub(crate) const TITLE: &str = "# Changelog";

pub(crate) const DESCRIPTION: &str = "\
All notable changes to this project will be documented in this file.

The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),
and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html).";

/// Header line of the Unreleased section.
pub(crate) const UNRELEASED_HEADER: &str = "## [Unreleased]";

/// Start of the Unreleased link reference definition.
pub(crate) const UNRELEASED_LINK_PREFIX: &str = "[Unreleased]: ";

/// Render the whole document.
pub(crate) fn changelog(changelog: &Changelog) -> String {
    let repo_url = &changelog.options().repo_url;

    let mut sections = Vec::with_capacity(changelog.releases().len() + 1);
    sections.push(unreleased_section(changelog.unreleased_changes(), repo_url));
    for release in changelog.releases() {
        let key = SectionKey::Release(release.version().clone());
        let changes = changelog.section_changes(&key);
        sections.push(match changes {
            Some(changes) => release_section(release, changes, repo_url),
            None => release_header(release),
        });
    }

    format!(
        "{TITLE}\n{DESCRIPTION}\n\n{}\n\n{}",
        sections.join("\n\n"),
        links::link_reference_definitions(changelog.options(), changelog.releases())
    )
}

pub(crate) fn unreleased_section(changes: &ReleaseChanges, repo_url: &str) -> String {
    section(UNRELEASED_HEADER.to_string(), changes, repo_url)
}

pub(crate) fn release_section(release: &Release, changes: &ReleaseChanges, repo_url: &str) -> String {
    section(release_header(release), changes, repo_url)
}

fn release_header(release: &Release) -> String {
    let mut header = format!("## [{}]", release.version());
    if let Some(date) = release.date() {
        header.push_str(&format!(" - {}", date.format("%Y-%m-%d")));
    }
    if let Some(status) = release.status() {
        header.push_str(&format!(" [{status}]"));
    }
    header
}

fn section(header: String, changes: &ReleaseChanges, repo_url: &str) -> String {
    let categories: Vec<String> = Category::ALL
        .iter()
        .filter_map(|category| {
            changes
                .get(category)
                .filter(|entries| !entries.is_empty())
                .map(|entries| category_section(*category, entries, repo_url))
        })
        .collect();

    if categories.is_empty() {
        header
    } else {
        format!("{header}\n{}", categories.join("\n\n"))
    }
}

fn category_section(category: Category, entries: &[Change], repo_url: &str) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("### {category}"));
    lines.extend(entries.iter().map(|entry| change_line(entry, repo_url)));
    lines.join("\n")
}

/// `- <first line>[ (<pr links>)]` followed by the remaining lines verbatim.
fn change_line(change: &Change, repo_url: &str) -> String {
    let description = change.description();
    if change.pr_numbers().is_empty() {
        return format!("- {description}");
    }

    let pr_links = change
        .pr_numbers()
        .iter()
        .map(|number| links::pr_link(repo_url, *number))
        .collect::<Vec<_>>()
        .join(", ");
    match description.split_once('\n') {
        Some((first, rest)) => format!("- {first} ({pr_links})\n{rest}"),
        None => format!("- {description} ({pr_links})"),
    }
}
