//! # Upstream Mirror Management
//!
//! Each module with an upstream source keeps a local bare mirror under
//! the srcs root, keyed by the destination repository name. The mirror is
//! cloned once and fetched (all refs plus tags) before every use; it is
//! the source of truth for the module's tags, describe output and the
//! commit that gets subtree-merged into the destination repository.
//!
//! Histories that carry no `v0.0` tag get an annotated `v0.0` created on
//! their first commit, so describe-based versioning always has a stable
//! root. That tag becomes a permanent part of the mirror's tag set.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::Result;
use crate::git;
use crate::version::{parse_describe, parse_tags, Describe, Version};

/// The literal tag every mirrored history must resolve.
pub const BOOTSTRAP_TAG: &str = "v0.0";

/// One structured tag in the mirror: parsed version, raw tag name, and
/// the commit it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    pub version: Version,
    pub raw: String,
    pub hash: String,
}

/// A local bare mirror of a module's upstream repository.
#[derive(Debug)]
pub struct UpstreamMirror {
    dir: PathBuf,
}

impl UpstreamMirror {
    /// Clone the mirror if absent, otherwise fetch all refs; tags are
    /// fetched in either case.
    pub fn open(srcs_root: &Path, repo: &str, src_url: &str) -> Result<UpstreamMirror> {
        fs::create_dir_all(srcs_root)?;
        let dir = srcs_root.join(repo);

        if dir.exists() {
            debug!("fetching mirror {}", dir.display());
            git::fetch_all(&dir)?;
        } else {
            info!("cloning mirror of {src_url} into {}", dir.display());
            git::clone_mirror(src_url, &dir)?;
        }
        git::fetch_tags(&dir)?;

        let mirror = UpstreamMirror { dir };
        mirror.ensure_bootstrap_tag()?;
        Ok(mirror)
    }

    /// Absolute path of the mirror, suitable for subtree commands that
    /// run inside the destination checkout.
    pub fn local_path(&self) -> Result<PathBuf> {
        Ok(std::path::absolute(&self.dir)?)
    }

    /// Structured tags sorted ascending by version. Unparseable tags are
    /// dropped by the tag parser with a diagnostic.
    pub fn tags(&self) -> Result<Vec<TagEntry>> {
        let listing = git::list_tags(&self.dir)?;
        parse_tags(&listing)
            .into_iter()
            .map(|(version, raw)| {
                let hash = git::rev_parse(&self.dir, &raw)?;
                Ok(TagEntry { version, raw, hash })
            })
            .collect()
    }

    /// Resolve a ref to its full commit identifier.
    pub fn resolve(&self, refname: &str) -> Result<String> {
        git::rev_parse(&self.dir, refname)
    }

    /// Describe a ref against the mirror's `v*` tags.
    pub fn describe(&self, refname: &str) -> Result<Describe> {
        parse_describe(&git::describe(&self.dir, refname)?)
    }

    /// Full log message of a commit.
    pub fn commit_message(&self, commit: &str) -> Result<String> {
        git::log_message(&self.dir, commit)
    }

    /// Create the annotated bootstrap tag on the first commit when no
    /// tag with the literal name exists yet.
    fn ensure_bootstrap_tag(&self) -> Result<()> {
        let listing = git::list_tags(&self.dir)?;
        if listing.lines().any(|line| line.trim() == BOOTSTRAP_TAG) {
            return Ok(());
        }

        let (first_hash, subject) = git::first_commit(&self.dir)?;
        info!(
            "tagging first commit {first_hash} ({subject:?}) as {BOOTSTRAP_TAG} in {}",
            self.dir.display()
        );
        git::tag_annotated(
            &self.dir,
            BOOTSTRAP_TAG,
            &first_hash,
            "Bootstrap tag on the first commit so git-describe works",
        )
    }
}
