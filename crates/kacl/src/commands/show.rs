//! Show command: print one section of the changelog.

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use kacl_core::config::Config;
use kacl_core::{Changelog, Release, ReleaseChanges, UNRELEASED};

use super::{ChangelogArgs, ChangelogTarget};

/// Arguments for the `show` subcommand.
#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    #[command(flatten)]
    pub changelog: ChangelogArgs,

    /// Release to show (default: Unreleased)
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,
}

#[derive(Serialize)]
struct SectionReport<'a> {
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    changes: &'a ReleaseChanges,
}

impl<'a> SectionReport<'a> {
    fn release(release: Option<&'a Release>, version: &str, changes: &'a ReleaseChanges) -> Self {
        Self {
            version: version.to_string(),
            date: release.and_then(Release::date),
            status: release.and_then(Release::status),
            changes,
        }
    }
}

/// Print a release section, or Unreleased.
#[instrument(name = "cmd_show", skip_all, fields(json_output))]
pub fn cmd_show(
    args: ShowArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, version = ?args.version, "executing show command");

    let target = ChangelogTarget::resolve(&args.changelog, &config.changelog, cwd)?;
    let content = target.read()?;
    let changelog = Changelog::parse(&content, &target.parse_options())?;

    let requested = args
        .version
        .as_deref()
        .filter(|version| !version.eq_ignore_ascii_case(UNRELEASED));

    if global_json {
        let report = match requested {
            Some(version) => SectionReport::release(
                changelog.release(version),
                version,
                changelog.release_changes(version)?,
            ),
            None => SectionReport::release(None, UNRELEASED, changelog.unreleased_changes()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let section = match requested {
            Some(version) => changelog.stringified_release(version)?,
            None => changelog.stringified_unreleased(),
        };
        println!("{section}");
    }
    Ok(())
}
