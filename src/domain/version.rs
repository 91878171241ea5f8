//! Version tags (`v1`, `v2`, ...)
//!
//! Tags are parsed leniently: the trailing digits are the version number,
//! and a tag without trailing digits counts as version 1.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monotonic version tag of a page or translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VersionTag(u32);

impl VersionTag {
    /// The version every new record starts at
    pub const INITIAL: VersionTag = VersionTag(1);

    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Parses the trailing digits of a tag; malformed tags count as 1
    pub fn parse_lenient(tag: &str) -> Self {
        let tag = tag.trim();
        let digits_start = tag
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);

        digits_start
            .and_then(|start| tag[start..].parse::<u32>().ok())
            .map(Self)
            .unwrap_or(Self::INITIAL)
    }

    /// Returns the numeric part
    pub fn number(&self) -> u32 {
        self.0
    }

    /// Returns the following version, `None` past `u32::MAX`
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl Default for VersionTag {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl From<String> for VersionTag {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.to_string()
    }
}

/// Increments a raw tag string: `"v14"` -> `"v15"`, `""` -> `"v2"`
pub fn increment(tag: &str) -> String {
    let number = u64::from(VersionTag::parse_lenient(tag).number());
    format!("v{}", number + 1)
}
