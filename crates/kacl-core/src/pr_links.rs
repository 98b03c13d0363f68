//! Pull request links trailing the first line of a change.
//!
//! A change line may end in one or more parenthesized groups of
//! `[#N](<repo>/pull/N)` links separated by commas or whitespace:
//!
//! ```text
//! - Fix crash ([#12](https://github.com/acme/widget/pull/12), [#14](https://github.com/acme/widget/pull/14))
//! ```
//!
//! A group is only extracted when every link in it points at the configured
//! repository and its label matches its URL. Anything else stays in the
//! description as literal text.

use std::sync::LazyLock;

use regex::Regex;

use crate::links;

static TRAILING_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    let link = r"\[#\d+\]\([^()\s]*\)";
    Regex::new(&format!(
        r" \((?P<links>{link}(?:(?:\s*,\s*|\s+){link})*)\)$"
    ))
    .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[#(?P<number>\d+)\]\((?P<url>[^()\s]*)\)")
        .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
});

/// A description with its trailing pull request links split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Extracted {
    pub(crate) description: String,
    pub(crate) pr_numbers: Vec<u64>,
}

/// Split recognized PR link groups off the end of the first line.
///
/// Each group is stripped together with exactly one preceding space, so any
/// other trailing whitespace stays in the description. Numbers come back in
/// reading order with duplicates removed. Several groups collapse into one
/// list, which renders back as a single group.
pub(crate) fn extract(description: &str, repo_url: &str) -> Extracted {
    let (first, rest) = match description.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (description, None),
    };

    let mut first = first;
    let mut groups: Vec<Vec<u64>> = Vec::new();
    while let Some(captures) = TRAILING_GROUP.captures(first) {
        let (Some(whole), Some(group)) = (captures.get(0), captures.name("links")) else {
            break;
        };
        let Some(numbers) = group_numbers(group.as_str(), repo_url) else {
            break;
        };
        // Nothing left to describe once the links are gone.
        if whole.start() == 0 {
            break;
        }
        groups.push(numbers);
        first = &first[..whole.start()];
    }

    if groups.is_empty() {
        return Extracted {
            description: description.to_string(),
            pr_numbers: Vec::new(),
        };
    }

    let mut pr_numbers = Vec::new();
    for number in groups.into_iter().rev().flatten() {
        if !pr_numbers.contains(&number) {
            pr_numbers.push(number);
        }
    }

    let description = match rest {
        Some(rest) => format!("{first}\n{rest}"),
        None => first.to_string(),
    };
    Extracted {
        description,
        pr_numbers,
    }
}

fn group_numbers(group: &str, repo_url: &str) -> Option<Vec<u64>> {
    LINK.captures_iter(group)
        .map(|link| {
            let number: u64 = link.name("number")?.as_str().parse().ok()?;
            let url = link.name("url")?.as_str();
            (url == links::pr_url(repo_url, number)).then_some(number)
        })
        .collect()
}
