//! # Git Subprocess Boundary
//!
//! Blocking wrappers around the system `git` command, which automatically
//! handles SSH keys, credential helpers and anything else configured in
//! `~/.gitconfig`. Bare-mirror operations address the repository through
//! `GIT_DIR`; working-copy operations run with the checkout as the
//! current directory.
//!
//! Every non-zero exit becomes an [`Error::GitCommand`] carrying the
//! command line and captured stderr. Failures are fatal for the module
//! being processed, never for the whole pipeline.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Tag glob passed to `git describe`.
const DESCRIBE_MATCH: &str = "v*";
/// Tags containing `-r` are release candidates and never describe a
/// version.
const DESCRIBE_EXCLUDE: &str = "*-r*";

/// Which subtree operation to run against the embed directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeOp {
    /// First import: the embed directory does not exist yet.
    Add,
    /// Subsequent merge into an existing embed directory.
    Pull,
}

impl SubtreeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SubtreeOp::Add => "add",
            SubtreeOp::Pull => "pull",
        }
    }
}

fn dir_label(cwd: Option<&Path>, git_dir: Option<&Path>) -> String {
    cwd.or(git_dir)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Run git with the given arguments and return its stdout.
fn git(args: &[&str], cwd: Option<&Path>, git_dir: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    if let Some(git_dir) = git_dir {
        cmd.env("GIT_DIR", git_dir);
    }

    let output = cmd.output().map_err(|e| Error::GitCommand {
        command: args.join(" "),
        dir: dir_label(cwd, git_dir),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            dir: dir_label(cwd, git_dir),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

// --- bare mirror operations -------------------------------------------

/// Clone an upstream repository as a bare mirror.
pub fn clone_mirror(url: &str, mirror: &Path) -> Result<()> {
    git(
        &["clone", "--bare", "--mirror", url, &mirror.to_string_lossy()],
        None,
        None,
    )
    .map(drop)
}

/// Fetch all refs into an existing mirror.
pub fn fetch_all(mirror: &Path) -> Result<()> {
    git(&["fetch", "--all"], None, Some(mirror)).map(drop)
}

/// Fetch all tags into an existing mirror.
pub fn fetch_tags(mirror: &Path) -> Result<()> {
    git(&["fetch", "--tags"], None, Some(mirror)).map(drop)
}

/// Raw `git tag --list` output, one tag per line.
pub fn list_tags(mirror: &Path) -> Result<String> {
    git(&["tag", "--list"], None, Some(mirror))
}

/// Resolve a ref to its full commit identifier.
pub fn rev_parse(mirror: &Path, refname: &str) -> Result<String> {
    git(&["rev-parse", refname], None, Some(mirror)).map(|out| out.trim().to_string())
}

/// `git describe` restricted to `v*` tags, excluding release candidates.
pub fn describe(mirror: &Path, refname: &str) -> Result<String> {
    git(
        &[
            "describe",
            "--tags",
            refname,
            "--match",
            DESCRIBE_MATCH,
            "--exclude",
            DESCRIBE_EXCLUDE,
        ],
        None,
        Some(mirror),
    )
    .map(|out| out.trim().to_string())
}

/// `git describe` against a working copy (used for the tool's own
/// version).
pub fn describe_workdir(dir: &Path, refname: &str) -> Result<String> {
    git(
        &[
            "describe",
            "--tags",
            refname,
            "--match",
            DESCRIBE_MATCH,
            "--exclude",
            DESCRIBE_EXCLUDE,
        ],
        Some(dir),
        None,
    )
    .map(|out| out.trim().to_string())
}

/// Full `git log -1` message text for a commit.
pub fn log_message(mirror: &Path, commit: &str) -> Result<String> {
    git(&["log", "-1", commit], None, Some(mirror))
}

/// Hash and subject of the first commit on the default history.
pub fn first_commit(mirror: &Path) -> Result<(String, String)> {
    let out = git(&["log", "--reverse", "--pretty=%H %s"], None, Some(mirror))?;
    parse_first_commit(&out).ok_or_else(|| Error::GitCommand {
        command: "log --reverse --pretty=%H %s".to_string(),
        dir: mirror.display().to_string(),
        stderr: "history is empty".to_string(),
    })
}

fn parse_first_commit(log: &str) -> Option<(String, String)> {
    let line = log.lines().find(|l| !l.trim().is_empty())?;
    let (hash, subject) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
    Some((hash.to_string(), subject.to_string()))
}

/// Create an annotated tag in the mirror.
pub fn tag_annotated(mirror: &Path, name: &str, target: &str, message: &str) -> Result<()> {
    git(&["tag", "-a", "-m", message, name, target], None, Some(mirror)).map(drop)
}

// --- working copy operations ------------------------------------------

/// Clone a repository into a local working copy.
pub fn clone(url: &str, dest: &Path) -> Result<()> {
    git(&["clone", url, &dest.to_string_lossy()], None, None).map(drop)
}

/// Fast-forward an existing working copy.
pub fn pull(dest: &Path) -> Result<()> {
    git(&["pull"], Some(dest), None).map(drop)
}

/// Push all branches, optionally to an explicit (token-bearing) URL.
pub fn push(dest: &Path, url: Option<&str>) -> Result<()> {
    match url {
        Some(url) => git(&["push", "--all", url], Some(dest), None).map(drop),
        None => git(&["push", "--all"], Some(dest), None).map(drop),
    }
}

/// Porcelain status summary; empty output means a clean tree.
pub fn status_porcelain(dest: &Path) -> Result<String> {
    git(&["status", "--porcelain"], Some(dest), None)
}

/// Stage one file, addressed relative to the working copy root.
pub fn add(dest: &Path, relative: &Path) -> Result<()> {
    git(&["add", &relative.to_string_lossy()], Some(dest), None).map(drop)
}

/// Commit staged changes with the given message (fed over stdin, so the
/// message never touches the filesystem).
pub fn commit(dest: &Path, message: &str) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(["commit", "-F", "-"])
        .current_dir(dest)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| Error::GitCommand {
        command: "commit -F -".to_string(),
        dir: dest.display().to_string(),
        stderr: e.to_string(),
    })?;

    if let Some(stdin) = child.stdin.take() {
        let mut stdin = stdin;
        stdin.write_all(message.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(Error::GitCommand {
            command: "commit -F -".to_string(),
            dir: dest.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

/// Fold the mirror's history into the embed directory, either importing
/// it for the first time or merging new upstream commits.
pub fn subtree(dest: &Path, op: SubtreeOp, prefix: &str, mirror: &Path, commit: &str) -> Result<()> {
    git(
        &[
            "subtree",
            op.as_str(),
            "-P",
            prefix,
            &mirror.to_string_lossy(),
            commit,
        ],
        Some(dest),
        None,
    )
    .map(drop)
}
