//! The closed set of change categories.
//!
//! [`Category::ALL`] is the only place the labels are listed. Validation in
//! [`Changelog::add_change`](crate::Changelog::add_change), the parser's
//! category-header check, and the stringifier's output order all go through
//! it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChangelogError;

/// A recognized change category.
///
/// The derived ordering matches [`Category::ALL`], which is also the order
/// categories are rendered within a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Changes that have not been sorted into a category yet.
    Uncategorized,
    /// New features.
    Added,
    /// Changes in existing functionality.
    Changed,
    /// Soon-to-be removed features.
    Deprecated,
    /// Removed features.
    Removed,
    /// Bug fixes.
    Fixed,
    /// Vulnerability fixes.
    Security,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: &[Self] = &[
        Self::Uncategorized,
        Self::Added,
        Self::Changed,
        Self::Deprecated,
        Self::Removed,
        Self::Fixed,
        Self::Security,
    ];

    /// The label used in `### <Category>` headers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncategorized => "Uncategorized",
            Self::Added => "Added",
            Self::Changed => "Changed",
            Self::Deprecated => "Deprecated",
            Self::Removed => "Removed",
            Self::Fixed => "Fixed",
            Self::Security => "Security",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ChangelogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ChangelogError::MissingCategory);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ChangelogError::UnknownCategory(s.to_string()))
    }
}
