//! Unified diffs for formatting failures.

use owo_colors::{OwoColorize, Stream};
use similar::{ChangeTag, TextDiff};

/// Lines of context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Render a unified diff from `actual` (the file) to `expected` (the
/// canonical text), colored when stdout supports it.
pub fn unified_diff(path: &str, actual: &str, expected: &str) -> String {
    let diff = TextDiff::from_lines(actual, expected);
    let mut out = String::new();
    out.push_str(&format!("--- {path}\n+++ {path} (formatted)\n"));

    for group in diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old = first.old_range().start..last.old_range().end;
        let new = first.new_range().start..last.new_range().end;
        let header = format!(
            "@@ -{},{} +{},{} @@",
            old.start + 1,
            old.len(),
            new.start + 1,
            new.len()
        );
        out.push_str(&format!(
            "{}\n",
            header.if_supports_color(Stream::Stdout, |text| text.cyan())
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let value = change.value();
                let line = match change.tag() {
                    ChangeTag::Equal => format!(" {value}"),
                    ChangeTag::Delete => format!(
                        "{}",
                        format!("-{value}").if_supports_color(Stream::Stdout, |text| text.red())
                    ),
                    ChangeTag::Insert => format!(
                        "{}",
                        format!("+{value}").if_supports_color(Stream::Stdout, |text| text.green())
                    ),
                };
                out.push_str(&line);
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }
    out
}
