//! Changelog text parsing.
//!
//! The parser replays a document into a fresh [`Changelog`] through the
//! public mutation operations, appending as it goes so document order is
//! kept. Only the region between the `## [Unreleased]` header and the
//! `[Unreleased]: ` link reference definition is interpreted; the title,
//! boilerplate, and link block are regenerated on output.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use tracing::{debug, instrument};

use crate::category::Category;
use crate::changelog::{
    AddChange, AddRelease, Changelog, ChangelogOptions, Position, STATUS_PATTERN,
};
use crate::error::{Line, ParseError, ParseResult};
use crate::pr_links;
use crate::stringify::{UNRELEASED_HEADER, UNRELEASED_LINK_PREFIX};

static RELEASE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^## \[(?P<version>[^\[\]]+)\](?: - (?P<date>\d{{4}}-\d{{2}}-\d{{2}}))?(?: \[(?P<status>{STATUS_PATTERN})\])?$"
    ))
    .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

static CATEGORY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^### (?P<category>\w+)$").unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// Settings for [`Changelog::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Repository settings of the parsed changelog.
    pub changelog: ChangelogOptions,
    /// Split trailing pull request links off change descriptions.
    pub extract_pr_links: bool,
}

impl ParseOptions {
    /// Parse without PR link extraction.
    pub const fn new(changelog: ChangelogOptions) -> Self {
        Self {
            changelog,
            extract_pr_links: false,
        }
    }

    /// Enable or disable PR link extraction.
    #[must_use]
    pub const fn with_pr_link_extraction(mut self, enabled: bool) -> Self {
        self.extract_pr_links = enabled;
        self
    }
}

impl Changelog {
    /// Parse changelog text.
    ///
    /// # Errors
    ///
    /// The first structural problem found, as a [`ParseError`].
    pub fn parse(content: &str, options: &ParseOptions) -> ParseResult<Self> {
        Parser::new(options).run(content)
    }
}

/// A change whose text may still grow with continuation lines.
struct PendingChange {
    category: Category,
    text: String,
    line: Line,
}

struct Parser<'a> {
    options: &'a ParseOptions,
    changelog: Changelog,
    version: Option<String>,
    category: Option<Category>,
    pending: Option<PendingChange>,
}

impl<'a> Parser<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            changelog: Changelog::new(options.changelog.clone()),
            version: None,
            category: None,
            pending: None,
        }
    }

    #[instrument(skip_all, fields(bytes = content.len()))]
    fn run(mut self, content: &str) -> ParseResult<Changelog> {
        let lines: Vec<&str> = content.split('\n').collect();
        let header = lines
            .iter()
            .position(|line| *line == UNRELEASED_HEADER)
            .ok_or(ParseError::MissingUnreleasedHeader)?;
        let link = lines[header + 1..]
            .iter()
            .position(|line| line.starts_with(UNRELEASED_LINK_PREFIX))
            .map(|offset| header + 1 + offset)
            .ok_or(ParseError::MissingUnreleasedLink)?;

        for (index, text) in lines.iter().enumerate().take(link).skip(header + 1) {
            self.line(index + 1, text)?;
        }
        self.finalize(true)?;

        debug!(
            releases = self.changelog.releases().len(),
            "changelog parsed"
        );
        Ok(self.changelog)
    }

    fn line(&mut self, number: usize, text: &str) -> ParseResult<()> {
        if text.starts_with("## ") {
            self.finalize(true)?;
            self.release_header(number, text)
        } else if text.starts_with("### ") {
            self.finalize(true)?;
            self.category_header(number, text)
        } else if let Some(description) = text.strip_prefix("- ") {
            let Some(category) = self.category else {
                return Err(ParseError::MissingCategory(Line::new(number, text)));
            };
            self.finalize(false)?;
            self.pending = Some(PendingChange {
                category,
                text: description.to_string(),
                line: Line::new(number, text),
            });
            Ok(())
        } else if let Some(pending) = &mut self.pending {
            pending.text.push('\n');
            pending.text.push_str(text);
            Ok(())
        } else if text.is_empty() {
            Ok(())
        } else {
            Err(ParseError::UnrecognizedLine(Line::new(number, text)))
        }
    }

    fn release_header(&mut self, number: usize, text: &str) -> ParseResult<()> {
        let line = || Line::new(number, text);
        let captures = RELEASE_HEADER
            .captures(text)
            .ok_or_else(|| ParseError::MalformedReleaseHeader(line()))?;
        let version = captures
            .name("version")
            .map(|m| m.as_str())
            .ok_or_else(|| ParseError::MalformedReleaseHeader(line()))?;
        if Version::parse(version).is_err() {
            return Err(ParseError::InvalidReleaseVersion(line()));
        }

        let mut release = AddRelease::new(version).at(Position::End);
        if let Some(date) = captures.name("date") {
            let date = NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d")
                .map_err(|_| ParseError::InvalidReleaseDate(line()))?;
            release = release.with_date(date);
        }
        if let Some(status) = captures.name("status") {
            release = release.with_status(status.as_str());
        }
        self.changelog
            .add_release(release)
            .map_err(|source| ParseError::Change {
                line: line(),
                source,
            })?;

        self.version = Some(version.to_string());
        self.category = None;
        Ok(())
    }

    fn category_header(&mut self, number: usize, text: &str) -> ParseResult<()> {
        let captures = CATEGORY_HEADER
            .captures(text)
            .ok_or_else(|| ParseError::MalformedCategoryHeader(Line::new(number, text)))?;
        let label = captures.name("category").map_or("", |m| m.as_str());
        let category = label
            .parse::<Category>()
            .map_err(|_| ParseError::UnknownCategory(Line::new(number, text)))?;
        self.category = Some(category);
        Ok(())
    }

    /// Commit the open change, dropping one trailing newline at a section
    /// boundary.
    fn finalize(&mut self, at_boundary: bool) -> ParseResult<()> {
        let Some(PendingChange {
            category,
            mut text,
            line,
        }) = self.pending.take()
        else {
            return Ok(());
        };
        if at_boundary && text.ends_with('\n') {
            text.pop();
        }

        let (description, pr_numbers) = if self.options.extract_pr_links {
            let extracted = pr_links::extract(&text, &self.options.changelog.repo_url);
            (extracted.description, extracted.pr_numbers)
        } else {
            (text, Vec::new())
        };

        let mut change = AddChange::new(category.as_str(), &description)
            .with_pr_numbers(pr_numbers)
            .at(Position::End);
        if let Some(version) = &self.version {
            change = change.for_release(version);
        }
        self.changelog
            .add_change(change)
            .map_err(|source| ParseError::Change { line, source })
    }
}
