//! Command implementations

pub mod init;

pub mod show;

pub mod update;

pub mod validate;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use tracing::debug;

use kacl_core::config::ChangelogConfig;
use kacl_core::{ChangelogOptions, CommandFormatter, Formatter, ParseOptions, git};

/// Changelog location and rendering flags shared by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct ChangelogArgs {
    /// Changelog file (default: changelog.path from config, or CHANGELOG.md)
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<Utf8PathBuf>,

    /// Repository URL used for comparison links (default: from the origin remote)
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,

    /// Prefix of release tags
    #[arg(long, value_name = "PREFIX")]
    pub tag_prefix: Option<String>,

    /// Extract trailing pull request links into entry metadata
    #[arg(long)]
    pub pr_links: bool,
}

/// Everything a command needs to read and render one changelog.
pub struct ChangelogTarget {
    /// Absolute path of the changelog file.
    pub path: Utf8PathBuf,
    /// Effective changelog settings after applying command-line overrides.
    pub settings: ChangelogConfig,
    /// Repository URL the links point at.
    pub repo_url: String,
}

impl ChangelogTarget {
    /// Resolve command-line flags against the loaded configuration.
    ///
    /// The repository URL comes from `--repo`, then `changelog.repo_url`,
    /// then the `origin` remote of the repository at `cwd`.
    pub fn resolve(args: &ChangelogArgs, config: &ChangelogConfig, cwd: &Utf8Path) -> anyhow::Result<Self> {
        let mut settings = config.clone();
        if let Some(file) = &args.file {
            settings.path.clone_from(file);
        }
        if let Some(prefix) = &args.tag_prefix {
            settings.tag_prefix.clone_from(prefix);
        }
        settings.extract_pr_links |= args.pr_links;

        let repo_url = match args.repo.clone().or_else(|| settings.repo_url.clone()) {
            Some(url) => url,
            None => detect_repo_url(cwd)?,
        };
        let repo_url = repo_url.trim_end_matches('/').to_string();

        let path = cwd.join(&settings.path);
        debug!(%path, %repo_url, tag_prefix = %settings.tag_prefix, "resolved changelog target");
        Ok(Self {
            path,
            settings,
            repo_url,
        })
    }

    /// Model options for this changelog.
    pub fn changelog_options(&self) -> ChangelogOptions {
        self.settings.changelog_options(self.repo_url.as_str())
    }

    /// Parser options for this changelog.
    pub fn parse_options(&self) -> ParseOptions {
        self.settings.parse_options(self.repo_url.as_str())
    }

    /// The configured formatter, run from `cwd`.
    pub fn formatter(&self, cwd: &Utf8Path) -> Option<Box<dyn Formatter>> {
        self.settings.formatter.as_ref().map(|command| {
            Box::new(CommandFormatter::new(command.as_str()).in_dir(cwd)) as Box<dyn Formatter>
        })
    }

    /// Read the changelog file.
    pub fn read(&self) -> anyhow::Result<String> {
        std::fs::read_to_string(&self.path).with_context(|| {
            format!(
                "failed to read {} (run `kacl init` to create it)",
                self.path
            )
        })
    }

    /// Overwrite the changelog file.
    pub fn write(&self, content: &str) -> anyhow::Result<()> {
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path))
    }

    /// The path as given relative to the working directory, for display.
    pub fn display_path(&self) -> &Utf8Path {
        &self.settings.path
    }
}

fn detect_repo_url(cwd: &Utf8Path) -> anyhow::Result<String> {
    let remote = git::remote_url(cwd, "origin").ok().flatten();
    remote
        .as_deref()
        .and_then(git::repository_url)
        .with_context(|| {
            "no repository URL: pass --repo, set changelog.repo_url, or add an origin remote"
        })
}
