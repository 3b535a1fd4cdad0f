//! # Version Derivation and Composition
//!
//! This module turns raw git tag and describe output into well-ordered,
//! composable versions. A [`Version`] is an ordered sequence of release
//! numbers plus an optional post-release counter, where the post counter
//! is repurposed to mean "commits since the nearest tag".
//!
//! ## Ordering
//!
//! Release sequences compare element-wise left to right, with the shorter
//! sequence zero-padded on the right, so `0.0` and `0.0.0` are equal.
//! Post counters break the tie, with an absent counter sorting before any
//! integer (`1.0 < 1.0.post1`).
//!
//! ## Parsing
//!
//! The accepted grammar is a release sequence (`1.0.1`), an optional
//! pre-release marker (`rc1`, `-rc1` and similar; recognized so such
//! tags parse, but dropped from the value), and an optional post counter
//! (`-265` or `.post265`). Anything else, including "legacy" unstructured
//! strings, is a [`Error::VersionParse`]. The tag-list parser logs and
//! skips such tags instead of failing.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::error::{Error, Result};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
          (?P<release>\d+(?:\.\d+)*)
          (?:[-._]?(?:a|b|c|rc|alpha|beta|pre|preview)[-._]?\d*)?
          (?:-(?P<post>\d+)|[-._]?post[-._]?(?P<postword>\d+))?
          $",
    )
    .expect("version grammar is valid")
});

/// An immutable structured version: release numbers plus an optional
/// post-release counter.
#[derive(Debug, Clone)]
pub struct Version {
    /// The ordered release sequence, e.g. `[1, 0, 1]` for `1.0.1`.
    pub release: Vec<u64>,
    /// Commits-since-tag counter, when present.
    pub post: Option<u64>,
}

impl Version {
    /// Parse a bare version string (no leading `v`, no trailing
    /// `-g<hash>`; callers strip those first).
    pub fn parse(input: &str) -> Result<Version> {
        let caps = VERSION_RE.captures(input).ok_or_else(|| Error::VersionParse {
            input: input.to_string(),
            message: "not a structured version".to_string(),
        })?;

        let release = caps["release"]
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|e| Error::VersionParse {
                    input: input.to_string(),
                    message: format!("release component {part:?}: {e}"),
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        let post = caps
            .name("post")
            .or_else(|| caps.name("postword"))
            .map(|m| {
                m.as_str().parse::<u64>().map_err(|e| Error::VersionParse {
                    input: input.to_string(),
                    message: format!("post counter {:?}: {e}", m.as_str()),
                })
            })
            .transpose()?;

        Ok(Version { release, post })
    }

    /// The externally persisted numeric identity: the release sequence
    /// followed by the post counter (which may be absent).
    pub fn version_tuple(&self) -> VersionTuple {
        VersionTuple {
            release: self.release.clone(),
            post: self.post,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release = self
            .release
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match self.post {
            Some(post) => write!(f, "{release}.post{post}"),
            None => write!(f, "{release}"),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            let a = self.release.get(i).copied().unwrap_or(0);
            let b = other.release.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        // None sorts before any integer
        match (self.post, other.post) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}

/// The fixed-shape numeric version identity, rendered the way the
/// packaging templates expect it: `(1, 0, 1, 265)` or `(0, 0, None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTuple {
    pub release: Vec<u64>,
    pub post: Option<u64>,
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for n in &self.release {
            write!(f, "{n}, ")?;
        }
        match self.post {
            Some(post) => write!(f, "{post})"),
            None => write!(f, "None)"),
        }
    }
}

/// Raw `git describe` output together with its parsed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Describe {
    /// The describe string as git printed it, e.g. `v1.2.3-42-gabcdef0`.
    pub raw: String,
    /// The parsed version, with the commit distance as post counter.
    pub version: Version,
}

/// Parse `git describe` output of the shape
/// `<tag>-<distance>-<abbrev-hash>`.
///
/// The leading `v` is stripped and the last two `-`-delimited fields are
/// split off; the remaining tag and the distance recombine into a version
/// whose post counter is the distance. Output without the three-field
/// tail is a hard parse error, not a silent default.
pub fn parse_describe(raw: &str) -> Result<Describe> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let mut fields = body.rsplitn(3, '-');
    let (Some(_hash), Some(distance), Some(tag)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::VersionParse {
            input: raw.to_string(),
            message: "describe output does not end in <tag>-<distance>-<hash>".to_string(),
        });
    };

    let version = Version::parse(&format!("{tag}-{distance}"))?;
    Ok(Describe {
        raw: trimmed.to_string(),
        version,
    })
}

/// Parse one raw tag name into a version.
///
/// The tag loses a single leading `v` and anything from the first
/// `-g<hash>` marker on, which discards the abbreviated commit while
/// keeping a commit-distance component that precedes it. This also
/// accepts full describe output and recorded describe strings, bare
/// tags included.
pub fn parse_tag(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let mut body = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if let Some(pos) = body.find("-g") {
        body = &body[..pos];
    }
    Version::parse(body)
}

/// Parse raw tag-list text (one tag per line) into `(version, raw tag)`
/// pairs sorted ascending by version.
///
/// Unparseable and unstructured tags are dropped with a diagnostic. The
/// sort is stable, so tags with equal versions keep their encounter
/// order.
pub fn parse_tags(text: &str) -> Vec<(Version, String)> {
    let mut tags = Vec::new();
    for line in text.lines() {
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        match parse_tag(raw) {
            Ok(version) => tags.push((version, raw.to_string())),
            Err(err) => warn!("skipping tag {raw:?}: {err}"),
        }
    }
    tags.sort_by(|a, b| a.0.cmp(&b.0));
    tags
}

/// Compose a tool version and a data version into one combined version.
///
/// Both version tuples are reversed least-significant first (a present
/// post counter rides along as the least significant element), the
/// shorter side is right-padded with zeros, and the elements are summed.
/// The least-significant summed element becomes the combined post counter
/// and the rest, re-reversed, become the release sequence. Joining `1.2`
/// with `3.4.5` therefore yields `3.5.post7`.
///
/// The combined version strictly increases whenever either input
/// advances, at the cost of not being invertible: callers that need the
/// originals must keep them separately. Note the asymmetry on the post
/// field: a joined version always carries a present post counter, even
/// when both inputs had none.
pub fn version_join(tool: &Version, data: &Version) -> Version {
    fn reversed_tuple(v: &Version) -> Vec<u64> {
        let mut t = v.release.clone();
        if let Some(post) = v.post {
            t.push(post);
        }
        t.reverse();
        t
    }

    let mut a = reversed_tuple(tool);
    let mut b = reversed_tuple(data);
    let len = a.len().max(b.len());
    a.resize(len, 0);
    b.resize(len, 0);

    let summed: Vec<u64> = a.iter().zip(&b).map(|(x, y)| x + y).collect();

    let post = summed[0];
    let mut release: Vec<u64> = summed[1..].to_vec();
    release.reverse();
    if release.is_empty() {
        release.push(0);
    }

    Version {
        release,
        post: Some(post),
    }
}
