//! Dot-separated paths addressing nodes in the tree.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use smallvec::SmallVec;

use crate::error::{Error, Result};

type Parts = SmallVec<[String; 4]>;

/// A sequence of node names locating a node within the tree.
///
/// The dot form is `.a.b.c`; the empty path (the root) prints as `.`.
/// Each part must match `[A-Za-z0-9:_-]+`. Paths are totally ordered with
/// the part count as the primary key and part-wise comparison secondary,
/// which is the ordering the render tree iterates and diffs in.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    parts: Parts,
}

/// True iff `part` is usable as a single path segment.
pub fn is_valid_path_part(part: &str) -> bool {
    part_pattern().is_match(part)
}

fn part_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-zA-Z0-9:_-]+$").expect("part pattern is well-formed"))
}

impl Path {
    /// The empty (root) path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from owned parts, validating each one.
    pub fn from_parts<I>(parts: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let parts: Parts = parts.into_iter().map(Into::into).collect();
        for part in &parts {
            if !is_valid_path_part(part) {
                return Err(invalid_part(part));
            }
        }
        Ok(Self { parts })
    }

    /// Builds a path from parts already known to be valid (node names are
    /// validated when nodes are constructed).
    pub(crate) fn from_parts_unchecked<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self { parts: parts.into_iter().map(Into::into).collect() }
    }

    /// The parts in order.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// True when at most one part remains.
    pub fn is_leaf(&self) -> bool {
        self.parts.len() <= 1
    }

    /// The first part, or `""` for the root.
    pub fn first(&self) -> &str {
        self.parts.first().map_or("", String::as_str)
    }

    /// The last part, or `""` for the root.
    pub fn last(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// The path with its first part removed.
    pub fn without_first(&self) -> Path {
        if self.is_empty() {
            return Path::root();
        }
        Path { parts: self.parts[1..].iter().cloned().collect() }
    }

    /// The path with its last part removed (the parent path).
    pub fn without_last(&self) -> Path {
        if self.is_empty() {
            return Path::root();
        }
        Path { parts: self.parts[..self.parts.len() - 1].iter().cloned().collect() }
    }

    /// True iff `self` is exactly one level below `other`.
    pub fn is_child_of(&self, other: &Path) -> bool {
        self.len() == other.len() + 1 && self.is_strict_descendant_of(other)
    }

    /// True iff `other` is a proper prefix of `self`, or (`or_are_same`)
    /// `self` itself.
    pub fn is_descendant_of(&self, other: &Path, or_are_same: bool) -> bool {
        let candidate_len = other.len();
        if candidate_len > self.len() {
            return false;
        }
        if !or_are_same && candidate_len == self.len() {
            return false;
        }
        self.parts[..candidate_len] == other.parts[..]
    }

    /// Strict variant of [`is_descendant_of`](Path::is_descendant_of).
    pub fn is_strict_descendant_of(&self, other: &Path) -> bool {
        self.is_descendant_of(other, false)
    }

    /// The longest shared prefix of the two paths.
    pub fn common_ancestor_with(&self, other: &Path) -> Path {
        Path { parts: self.parts[..self.common_prefix_len(other)].iter().cloned().collect() }
    }

    /// The path with the shared prefix removed.
    pub fn without_common_ancestor(&self, other: &Path) -> Path {
        Path { parts: self.parts[self.common_prefix_len(other)..].iter().cloned().collect() }
    }

    /// The shared prefix extended by one further part of `self`, when one
    /// exists.
    pub fn child_of_common_ancestor_with(&self, other: &Path) -> Path {
        let mut end = self.common_prefix_len(other);
        if end < self.len() {
            end += 1;
        }
        Path { parts: self.parts[..end].iter().cloned().collect() }
    }

    /// Splices `other` onto `self` at the first occurrence of `other`'s
    /// leading part, replacing everything from that point on.
    pub fn join_after_common_descendant(&self, other: &Path) -> Path {
        let splice_at = if other.is_empty() {
            0
        } else {
            self.parts.iter().position(|part| part == other.first()).unwrap_or(self.len())
        };
        let mut parts: Parts = self.parts[..splice_at].iter().cloned().collect();
        parts.extend(other.parts.iter().cloned());
        Path { parts }
    }

    /// Every ancestor path from the immediate parent up to (not including)
    /// the root, optionally led by `self`.
    pub fn ancestor_paths(&self, including_self: bool) -> Vec<Path> {
        let mut paths = Vec::new();
        if including_self {
            paths.push(self.clone());
        }
        let mut current = self.without_last();
        while !current.is_empty() {
            paths.push(current.clone());
            current = current.without_last();
        }
        paths
    }

    /// The paths walked upward from `self` until reaching a path `other`
    /// descends from (inclusively), optionally led by `self`.
    pub fn paths_between(&self, other: &Path, including_self: bool) -> Vec<Path> {
        let mut intermediate = Vec::new();
        if including_self {
            intermediate.push(self.clone());
        }
        if self.is_empty() {
            return intermediate;
        }

        let mut current = self.without_last();
        while !other.is_descendant_of(&current, true) {
            intermediate.push(current.clone());
            current = current.without_last();
        }
        intermediate
    }

    /// Extends the path by one validated part.
    pub fn join_part(&self, part: &str) -> Result<Path> {
        if !is_valid_path_part(part) {
            return Err(invalid_part(part));
        }
        let mut parts = self.parts.clone();
        parts.push(part.to_string());
        Ok(Path { parts })
    }

    /// Concatenates two paths.
    pub fn join(&self, other: &Path) -> Path {
        let mut parts = self.parts.clone();
        parts.extend(other.parts.iter().cloned());
        Path { parts }
    }

    fn common_prefix_len(&self, other: &Path) -> usize {
        self.parts
            .iter()
            .zip(other.parts.iter())
            .take_while(|(ours, theirs)| ours == theirs)
            .count()
    }
}

fn invalid_part(part: &str) -> Error {
    Error::InvalidPath(format!(
        "part '{part}' is not a valid path part (parts must match [a-zA-Z0-9:_-]+)"
    ))
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.parts.cmp(&other.parts))
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(dot_string: &str) -> Result<Self> {
        if dot_string.is_empty() || dot_string == "." {
            return Ok(Path::root());
        }

        let stripped = dot_string.strip_prefix('.').unwrap_or(dot_string);
        let mut parts = Parts::new();
        for part in stripped.split('.') {
            if part.is_empty() {
                return Err(Error::InvalidPath(format!("path '{dot_string}' has '..' within it")));
            }
            if !is_valid_path_part(part) {
                return Err(invalid_part(part));
            }
            parts.push(part.to_string());
        }
        Ok(Path { parts })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(".");
        }
        for part in &self.parts {
            write!(f, ".{part}")?;
        }
        Ok(())
    }
}
