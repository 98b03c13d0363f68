//! Validate command: check structure, release readiness and formatting.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use kacl_core::config::Config;
use kacl_core::{ValidateOptions, ValidationError, validate_changelog};

use super::{ChangelogArgs, ChangelogTarget};
use crate::diff::unified_diff;

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub changelog: ChangelogArgs,

    /// Also check that the current version is ready to release
    #[arg(long, requires = "current_version")]
    pub rc: bool,

    /// Version being released
    #[arg(long, value_name = "VERSION")]
    pub current_version: Option<String>,

    /// Rewrite the file in canonical form instead of failing
    #[arg(long)]
    pub fix: bool,
}

#[derive(Serialize)]
struct ValidationReport<'a> {
    path: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    fixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Validate the changelog file.
#[instrument(name = "cmd_validate", skip_all, fields(json_output))]
pub fn cmd_validate(
    args: ValidateArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(
        json_output = global_json,
        rc = args.rc,
        fix = args.fix,
        "executing validate command"
    );

    let target = ChangelogTarget::resolve(&args.changelog, &config.changelog, cwd)?;
    let content = target.read()?;
    let options = ValidateOptions {
        current_version: args.current_version.clone(),
        release_candidate: args.rc,
    };
    let path = target.display_path().as_str();

    let outcome = validate_changelog(
        &content,
        &target.parse_options(),
        target.formatter(cwd),
        &options,
    );
    let (valid, fixed, error) = match outcome {
        Ok(_) => (true, false, None),
        Err(ValidationError::Formatting { expected, .. }) if args.fix => {
            target.write(&expected)?;
            debug!(%path, "rewrote changelog in canonical form");
            (true, true, None)
        }
        Err(ValidationError::Formatting { expected, actual }) => {
            if !global_json {
                print!("{}", unified_diff(path, &actual, &expected));
            }
            (false, false, Some("changelog is not formatted".to_string()))
        }
        Err(e) => (false, false, Some(e.to_string())),
    };

    if global_json {
        let report = ValidationReport {
            path,
            valid,
            fixed,
            error: error.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if fixed {
        println!("  {} Formatted {}", "✓".green(), path.bold());
    } else if valid {
        println!("  {} {} is valid", "✓".green(), path.bold());
    } else if let Some(ref message) = error {
        println!("  {} {}: {message}", "✗".red(), path.bold());
    }

    match error {
        Some(message) => {
            warn!(%path, %message, "validation failed");
            Err(anyhow::anyhow!("{path}: {message}"))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    const REPO: &str = "https://github.com/acme/widget";

    const CANONICAL: &str = "\
# Changelog
All notable changes to this project will be documented in this file.

The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),
and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html).

## [Unreleased]

## [1.0.0] - 2024-01-02
### Added
- Widgets

[Unreleased]: https://github.com/acme/widget/compare/v1.0.0...HEAD
[1.0.0]: https://github.com/acme/widget/releases/tag/v1.0.0
";

    fn scratch(content: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        std::fs::write(root.join("CHANGELOG.md"), content).unwrap();
        (tmp, root)
    }

    fn args() -> ValidateArgs {
        ValidateArgs {
            changelog: ChangelogArgs {
                repo: Some(REPO.into()),
                ..ChangelogArgs::default()
            },
            ..ValidateArgs::default()
        }
    }

    #[test]
    fn canonical_file_is_valid() {
        let (_tmp, root) = scratch(CANONICAL);
        cmd_validate(args(), true, &Config::default(), &root).unwrap();
    }

    #[test]
    fn fix_rewrites_unformatted_file() {
        let unformatted = CANONICAL.replace("## [Unreleased]\n", "## [Unreleased]\n\n");
        let (_tmp, root) = scratch(&unformatted);
        assert!(cmd_validate(args(), true, &Config::default(), &root).is_err());

        let mut fix = args();
        fix.fix = true;
        cmd_validate(fix, true, &Config::default(), &root).unwrap();
        let written = std::fs::read_to_string(root.join("CHANGELOG.md")).unwrap();
        assert_eq!(written, CANONICAL);
    }

    #[test]
    fn release_candidate_requires_the_version() {
        let (_tmp, root) = scratch(CANONICAL);
        let mut rc = args();
        rc.rc = true;
        rc.current_version = Some("1.1.0".into());
        let err = cmd_validate(rc, true, &Config::default(), &root).unwrap_err();
        assert!(err.to_string().contains("1.1.0"));
    }
}
