//! Changelog validation.
//!
//! A changelog is valid when it parses, when rendering it reproduces the
//! file byte for byte, and (for a release candidate) when the release being
//! cut is present with its changes and nothing is left in Unreleased.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::changelog::Changelog;
use crate::error::ParseError;
use crate::format::{FormatError, Formatter};
use crate::parse::ParseOptions;

/// Why a changelog failed validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The text is not a well-formed changelog.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The formatter failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Release candidate checks need a version.
    #[error("current version required for release candidate validation")]
    CurrentVersionRequired,

    /// The release being cut is missing, or has no changes.
    #[error("missing changelog entries for current version {0}")]
    MissingCurrentVersion(String),

    /// Unreleased still holds changes while cutting a release.
    #[error("unreleased changes must be moved to release {0}")]
    UnreleasedChanges(String),

    /// The file differs from its canonical rendering.
    #[error("changelog is not formatted")]
    Formatting {
        /// Canonical rendering.
        expected: String,
        /// Text as found.
        actual: String,
    },
}

/// Result alias using [`ValidationError`].
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Extra checks for [`validate_changelog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Version being released.
    pub current_version: Option<String>,
    /// Check that the current version is ready to ship.
    pub release_candidate: bool,
}

/// Validate changelog text, returning the parsed changelog.
///
/// # Errors
///
/// The first failed check, as a [`ValidationError`].
#[instrument(skip_all, fields(release_candidate = validate.release_candidate))]
pub fn validate_changelog(
    content: &str,
    options: &ParseOptions,
    formatter: Option<Box<dyn Formatter>>,
    validate: &ValidateOptions,
) -> ValidationResult<Changelog> {
    let changelog = Changelog::parse(content, options)?.with_boxed_formatter(formatter);

    if validate.release_candidate {
        let version = validate
            .current_version
            .as_deref()
            .ok_or(ValidationError::CurrentVersionRequired)?;
        let has_changes = changelog
            .release_changes(version)
            .is_ok_and(|changes| changes.values().any(|entries| !entries.is_empty()));
        if !has_changes {
            return Err(ValidationError::MissingCurrentVersion(version.to_string()));
        }
        if changelog
            .unreleased_changes()
            .values()
            .any(|entries| !entries.is_empty())
        {
            return Err(ValidationError::UnreleasedChanges(version.to_string()));
        }
    }

    let expected = changelog.render()?;
    if expected != content {
        return Err(ValidationError::Formatting {
            expected,
            actual: content.to_string(),
        });
    }

    debug!("changelog valid");
    Ok(changelog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangelogOptions;
    use crate::format::FormatResult;

    const REPO: &str = "https://github.com/acme/widget";

    fn options() -> ParseOptions {
        ParseOptions::new(ChangelogOptions::new(REPO))
    }

    fn render(body: &str) -> String {
        let changelog = Changelog::parse(
            &format!("## [Unreleased]\n{body}\n\n[Unreleased]: x\n"),
            &options(),
        )
        .unwrap();
        changelog.to_string()
    }

    fn rc(version: &str) -> ValidateOptions {
        ValidateOptions {
            current_version: Some(version.into()),
            release_candidate: true,
        }
    }

    #[test]
    fn canonical_text_is_valid() {
        let text = render("### Added\n- Thing");
        assert!(validate_changelog(&text, &options(), None, &ValidateOptions::default()).is_ok());
    }

    #[test]
    fn unformatted_text_reports_both_versions() {
        let text = render("### Added\n- Thing").replace("## [Unreleased]\n", "## [Unreleased]\n\n");
        match validate_changelog(&text, &options(), None, &ValidateOptions::default()) {
            Err(ValidationError::Formatting { expected, actual }) => {
                assert_eq!(actual, text);
                assert_eq!(expected, render("### Added\n- Thing"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parse_errors_pass_through() {
        let err = validate_changelog("# Changelog\n", &options(), None, &ValidateOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Parse(ParseError::MissingUnreleasedHeader)
        ));
    }

    #[test]
    fn formatter_output_is_the_expected_text() {
        let canonical = render("### Added\n- Thing");
        let formatter: Box<dyn Formatter> =
            Box::new(|text: String| -> FormatResult<String> { Ok(text.to_uppercase()) });
        let err = validate_changelog(
            &canonical,
            &options(),
            Some(formatter),
            &ValidateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Formatting { expected, .. } if expected == canonical.to_uppercase()
        ));
    }

    #[test]
    fn release_candidate_requires_the_release() {
        let text = render("### Added\n- Thing");
        let err = validate_changelog(&text, &options(), None, &rc("1.0.0")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingCurrentVersion(v) if v == "1.0.0"));
    }

    #[test]
    fn release_candidate_requires_changes_in_the_release() {
        let text = render("\n## [1.0.0]");
        let err = validate_changelog(&text, &options(), None, &rc("1.0.0")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingCurrentVersion(_)));
    }

    #[test]
    fn release_candidate_requires_empty_unreleased() {
        let text = render("### Fixed\n- Pending\n\n## [1.0.0]\n### Added\n- Shipped");
        let err = validate_changelog(&text, &options(), None, &rc("1.0.0")).unwrap_err();
        assert!(matches!(err, ValidationError::UnreleasedChanges(_)));
    }

    #[test]
    fn release_candidate_passes_when_ready() {
        let text = render("\n## [1.0.0]\n### Added\n- Shipped");
        let changelog = validate_changelog(&text, &options(), None, &rc("1.0.0")).unwrap();
        assert_eq!(changelog.releases().len(), 1);
    }

    #[test]
    fn release_candidate_needs_a_version() {
        let text = render("");
        let validate = ValidateOptions {
            current_version: None,
            release_candidate: true,
        };
        let err = validate_changelog(&text, &options(), None, &validate).unwrap_err();
        assert!(matches!(err, ValidationError::CurrentVersionRequired));
    }
}
