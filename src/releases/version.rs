// Go release tag parsing and ordering

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

lazy_static::lazy_static! {
    static ref RELEASE_TAG: Regex = Regex::new(r"^go(\d+)\.?(\d*)\.?(\d*)$")
        .expect("release tag pattern is valid");
}

/// One numeric group of a release tag.
///
/// `Unknown` marks a group that was absent or did not fit in a `u64`. It orders
/// below every number, so `go1.21` sorts before `go1.21.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Unknown,
    Number(u64),
}

impl Component {
    fn parse(group: &str) -> Self {
        group.parse().map(Self::Number).unwrap_or(Self::Unknown)
    }
}

/// A parsed upstream release tag such as `go1.21.3`.
///
/// Equality and ordering only look at the numeric triple; the raw tag is kept
/// for display and for the release cache.
#[derive(Debug, Clone)]
pub struct GoVersion {
    name: String,
    pub major: Component,
    pub minor: Component,
    pub patch: Component,
}

impl GoVersion {
    /// Parse a release tag, returning `None` for anything that is not a release
    /// (branch names, weekly snapshots, release candidates).
    pub fn parse(tag: &str) -> Option<Self> {
        let captures = RELEASE_TAG.captures(tag)?;
        let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

        Some(Self {
            name: tag.to_string(),
            major: Component::parse(group(1)),
            minor: Component::parse(group(2)),
            patch: Component::parse(group(3)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> (Component, Component, Component) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for GoVersion {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for GoVersion {}

impl PartialOrd for GoVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GoVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Parse a batch of tags, silently dropping the ones that are not releases.
pub fn parse_releases<I, S>(tags: I) -> Vec<GoVersion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|tag| GoVersion::parse(tag.as_ref()))
        .collect()
}

/// Sort ascending and drop later duplicates of an equal triple.
pub fn sort_releases(releases: &mut Vec<GoVersion>) {
    // stable sort keeps the first-seen tag of equal versions in front
    releases.sort();
    releases.dedup();
}

pub fn release_names(releases: &[GoVersion]) -> Vec<String> {
    releases.iter().map(|r| r.name.clone()).collect()
}
