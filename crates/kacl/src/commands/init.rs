//! Init command: write an empty changelog.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use kacl_core::config::Config;
use kacl_core::init_changelog;

use super::{ChangelogArgs, ChangelogTarget};

/// Arguments for the `init` subcommand.
#[derive(Args, Debug, Default)]
pub struct InitArgs {
    #[command(flatten)]
    pub changelog: ChangelogArgs,

    /// Overwrite an existing changelog
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
struct InitReport<'a> {
    path: &'a str,
    created: bool,
}

/// Create the changelog file.
#[instrument(name = "cmd_init", skip_all, fields(json_output))]
pub fn cmd_init(
    args: InitArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, force = args.force, "executing init command");

    let target = ChangelogTarget::resolve(&args.changelog, &config.changelog, cwd)?;
    if target.path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display_path()
        );
    }

    let content = init_changelog(&target.changelog_options(), target.formatter(cwd))?;
    if let Some(parent) = target.path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    target.write(&content)?;

    if global_json {
        let report = InitReport {
            path: target.display_path().as_str(),
            created: true,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "  {} Created {}",
            "✓".green(),
            target.display_path().as_str().bold()
        );
    }
    Ok(())
}
