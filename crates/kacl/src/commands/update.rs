//! Update command: record commits since the last tag, optionally cutting a
//! release.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use kacl_core::config::Config;
use kacl_core::{NewEntry, UpdateOptions, git, update_changelog};

use super::{ChangelogArgs, ChangelogTarget};

/// Arguments for the `update` subcommand.
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub changelog: ChangelogArgs,

    /// Cut the current version: create its section and move Unreleased into it
    #[arg(long, requires = "current_version")]
    pub rc: bool,

    /// Version being released
    #[arg(long, value_name = "VERSION")]
    pub current_version: Option<String>,

    /// Release date for --rc (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Serialize)]
struct UpdateReport<'a> {
    path: &'a str,
    updated: bool,
    commits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    since: Option<&'a str>,
}

/// Update the changelog from git history.
#[instrument(name = "cmd_update", skip_all, fields(json_output))]
pub fn cmd_update(
    args: UpdateArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, rc = args.rc, "executing update command");

    let target = ChangelogTarget::resolve(&args.changelog, &config.changelog, cwd)?;
    let content = target.read()?;

    let most_recent_tag = git::most_recent_tag(cwd, &target.settings.tag_prefix)
        .context("failed to list release tags")?;
    let subjects = git::commit_subjects_since(cwd, most_recent_tag.as_deref())
        .context("failed to read commit history")?;
    debug!(tag = ?most_recent_tag, commits = subjects.len(), "collected commits");

    let release_date = args
        .rc
        .then(|| args.date.unwrap_or_else(|| chrono::Local::now().date_naive()));
    let options = UpdateOptions {
        current_version: args.current_version.clone(),
        release_candidate: args.rc,
        release_date,
        most_recent_tag: most_recent_tag.clone(),
        new_entries: subjects
            .iter()
            .map(|subject| NewEntry::from_commit_subject(subject))
            .collect(),
    };

    let updated = update_changelog(
        &content,
        &target.parse_options(),
        target.formatter(cwd),
        &options,
    )?;
    if let Some(ref text) = updated {
        target.write(text)?;
    }

    let path = target.display_path().as_str();
    if global_json {
        let report = UpdateReport {
            path,
            updated: updated.is_some(),
            commits: subjects.len(),
            since: most_recent_tag.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if updated.is_some() {
        match (&args.current_version, args.rc) {
            (Some(version), true) => println!(
                "  {} Updated {} for release {}",
                "✓".green(),
                path.bold(),
                version.cyan()
            ),
            _ => println!("  {} Updated {}", "✓".green(), path.bold()),
        }
    } else {
        println!("  {} {} is up to date", "○".yellow(), path.bold());
    }
    Ok(())
}
