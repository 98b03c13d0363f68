//! Link reference definitions.
//!
//! Comparison targets follow semver precedence, not document order. The
//! Unreleased link compares against the highest version ever released, and
//! each release compares against the nearest lower version found further
//! down the document. With `0.0.3` (a backport published after `1.0.0`),
//! `1.0.0`, `0.0.2` in document order, `0.0.3` and `1.0.0` both compare
//! against `0.0.2` and Unreleased compares against `1.0.0`.

use std::cmp::Ordering;

use semver::Version;

use crate::changelog::{ChangelogOptions, Release, UNRELEASED};

/// Render the trailing `[label]: url` block, one line per section.
pub(crate) fn link_reference_definitions(options: &ChangelogOptions, releases: &[Release]) -> String {
    let mut lines = Vec::with_capacity(releases.len() + 1);
    lines.push(format!("[{UNRELEASED}]: {}", unreleased_link(options, releases)));
    for (index, release) in releases.iter().enumerate() {
        lines.push(format!(
            "[{}]: {}",
            release.version(),
            release_link(options, releases, index)
        ));
    }

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

/// Markdown link to pull request `number`.
pub(crate) fn pr_link(repo_url: &str, number: u64) -> String {
    format!("[#{number}]({})", pr_url(repo_url, number))
}

/// URL of pull request `number` in `repo_url`.
pub(crate) fn pr_url(repo_url: &str, number: u64) -> String {
    format!("{}/pull/{number}", repo_base(repo_url))
}

/// Compare two versions by semver precedence, ignoring build metadata.
pub(crate) fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Tag name of `version`, honouring a package rename.
pub(crate) fn tag_name(options: &ChangelogOptions, version: &Version) -> String {
    let prefix = match &options.package_rename {
        Some(rename) if precedence(version, &rename.version_before_rename) != Ordering::Greater => {
            &rename.tag_prefix_before_rename
        }
        _ => &options.tag_prefix,
    };
    format!("{prefix}{version}")
}

fn repo_base(repo_url: &str) -> &str {
    repo_url.trim_end_matches('/')
}

fn unreleased_link(options: &ChangelogOptions, releases: &[Release]) -> String {
    let highest = releases
        .iter()
        .map(Release::version)
        .max_by(|a, b| precedence(a, b));
    match highest {
        Some(version) => format!(
            "{}/compare/{}...HEAD",
            repo_base(&options.repo_url),
            tag_name(options, version)
        ),
        None => format!("{}/", repo_base(&options.repo_url)),
    }
}

fn release_link(options: &ChangelogOptions, releases: &[Release], index: usize) -> String {
    let version = releases[index].version();
    let previous = releases[index + 1..]
        .iter()
        .map(Release::version)
        .find(|candidate| precedence(candidate, version) == Ordering::Less);
    let base = repo_base(&options.repo_url);
    match previous {
        Some(previous) => format!(
            "{base}/compare/{}...{}",
            tag_name(options, previous),
            tag_name(options, version)
        ),
        None => format!("{base}/releases/tag/{}", tag_name(options, version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::{AddRelease, Changelog, PackageRename, Position};

    const REPO: &str = "https://example.test/repo";

    fn changelog_with(options: ChangelogOptions, versions: &[&str]) -> Changelog {
        let mut changelog = Changelog::new(options);
        for version in versions {
            changelog
                .add_release(AddRelease::new(version).at(Position::End))
                .unwrap();
        }
        changelog
    }

    fn links(changelog: &Changelog) -> Vec<String> {
        link_reference_definitions(changelog.options(), changelog.releases())
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn no_releases_points_unreleased_at_repo_root() {
        let changelog = changelog_with(ChangelogOptions::new(REPO), &[]);
        assert_eq!(links(&changelog), ["[Unreleased]: https://example.test/repo/"]);
    }

    #[test]
    fn trailing_slash_on_repo_url_is_normalized() {
        let changelog = changelog_with(ChangelogOptions::new(format!("{REPO}/")), &["1.0.0"]);
        assert_eq!(
            links(&changelog),
            [
                "[Unreleased]: https://example.test/repo/compare/v1.0.0...HEAD",
                "[1.0.0]: https://example.test/repo/releases/tag/v1.0.0",
            ]
        );
    }

    #[test]
    fn first_release_gets_a_tag_link() {
        let changelog = changelog_with(ChangelogOptions::new(REPO), &["2.0.0", "1.0.0"]);
        assert_eq!(
            links(&changelog),
            [
                "[Unreleased]: https://example.test/repo/compare/v2.0.0...HEAD",
                "[2.0.0]: https://example.test/repo/compare/v1.0.0...v2.0.0",
                "[1.0.0]: https://example.test/repo/releases/tag/v1.0.0",
            ]
        );
    }

    #[test]
    fn backport_release_does_not_become_the_unreleased_base() {
        let changelog = changelog_with(
            ChangelogOptions::new(REPO),
            &["0.0.3", "1.0.0", "0.0.2", "0.0.1"],
        );
        assert_eq!(
            links(&changelog),
            [
                "[Unreleased]: https://example.test/repo/compare/v1.0.0...HEAD",
                "[0.0.3]: https://example.test/repo/compare/v0.0.2...v0.0.3",
                "[1.0.0]: https://example.test/repo/compare/v0.0.2...v1.0.0",
                "[0.0.2]: https://example.test/repo/compare/v0.0.1...v0.0.2",
                "[0.0.1]: https://example.test/repo/releases/tag/v0.0.1",
            ]
        );
    }

    #[test]
    fn prerelease_orders_below_its_release() {
        let changelog = changelog_with(
            ChangelogOptions::new(REPO),
            &["1.0.0", "1.0.0-rc.1", "0.9.0"],
        );
        assert_eq!(
            links(&changelog)[1..],
            [
                "[1.0.0]: https://example.test/repo/compare/v1.0.0-rc.1...v1.0.0",
                "[1.0.0-rc.1]: https://example.test/repo/compare/v0.9.0...v1.0.0-rc.1",
                "[0.9.0]: https://example.test/repo/releases/tag/v0.9.0",
            ]
        );
    }

    #[test]
    fn custom_tag_prefix_is_used_for_every_tag() {
        let changelog = changelog_with(
            ChangelogOptions::new(REPO).with_tag_prefix("@acme/widget@"),
            &["1.1.0", "1.0.0"],
        );
        assert_eq!(
            links(&changelog),
            [
                "[Unreleased]: https://example.test/repo/compare/@acme/widget@1.1.0...HEAD",
                "[1.1.0]: https://example.test/repo/compare/@acme/widget@1.0.0...@acme/widget@1.1.0",
                "[1.0.0]: https://example.test/repo/releases/tag/@acme/widget@1.0.0",
            ]
        );
    }

    #[test]
    fn package_rename_switches_prefix_at_the_boundary() {
        let options = ChangelogOptions::new(REPO)
            .with_tag_prefix("new-name@")
            .with_package_rename(PackageRename {
                version_before_rename: Version::new(1, 0, 0),
                tag_prefix_before_rename: "old-name@".into(),
            });
        let changelog = changelog_with(options, &["1.1.0", "1.0.0", "0.9.0"]);
        assert_eq!(
            links(&changelog),
            [
                "[Unreleased]: https://example.test/repo/compare/new-name@1.1.0...HEAD",
                "[1.1.0]: https://example.test/repo/compare/old-name@1.0.0...new-name@1.1.0",
                "[1.0.0]: https://example.test/repo/compare/old-name@0.9.0...old-name@1.0.0",
                "[0.9.0]: https://example.test/repo/releases/tag/old-name@0.9.0",
            ]
        );
    }

    #[test]
    fn package_rename_applies_to_unreleased_when_nothing_shipped_since() {
        let options = ChangelogOptions::new(REPO).with_package_rename(PackageRename {
            version_before_rename: Version::new(2, 0, 0),
            tag_prefix_before_rename: "old@".into(),
        });
        let changelog = changelog_with(options, &["2.0.0"]);
        assert_eq!(
            links(&changelog)[0],
            "[Unreleased]: https://example.test/repo/compare/old@2.0.0...HEAD"
        );
    }

    #[test]
    fn build_metadata_does_not_affect_ordering() {
        let a = Version::parse("1.0.0+build.1").unwrap();
        let b = Version::parse("1.0.0+build.2").unwrap();
        assert_eq!(precedence(&a, &b), Ordering::Equal);
    }

    #[test]
    fn pr_links_use_the_repo_base() {
        assert_eq!(
            pr_link("https://example.test/repo/", 42),
            "[#42](https://example.test/repo/pull/42)"
        );
    }
}
