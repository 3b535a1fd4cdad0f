//! # Repository Synchronization
//!
//! The per-module state machine that materializes the template tree into
//! the destination checkout, stages and commits the result, and folds
//! upstream history into the embed directory with `git subtree`.
//!
//! Steps, terminal on success or first unrecovered error:
//!
//! 1. Ensure the destination working copy is present (clone or pull).
//! 2. Walk the template tree top-down, creating mapped directories and
//!    rendering/copying mapped files, staging each written file.
//! 3. Commit when the tree is dirty; a clean tree is a no-op, so
//!    re-running the sync on unchanged inputs is idempotent.
//! 4. Subtree-add or subtree-pull the upstream mirror at the resolved
//!    commit, depending on whether the embed directory already exists.
//!
//! A failure during the walk aborts the module before anything is
//! committed; nothing is pushed from here.

use std::fs;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use crate::config::ModuleConfig;
use crate::error::{Error, Result};
use crate::git::{self, SubtreeOp};
use crate::template::{classify, render, repo_path, FileAction};

/// Where updates committed by this tool point back to.
const TOOL_ORIGIN: &str = env!("CARGO_PKG_REPOSITORY");

/// Run the full synchronization state machine for one module.
pub fn run(module: &ModuleConfig, templates_root: &Path) -> Result<()> {
    ensure_checkout(module)?;
    walk_templates(module, templates_root)?;
    commit_if_dirty(module)?;
    subtree_merge(module)?;
    Ok(())
}

/// Clone the destination working copy if absent, otherwise fast-forward
/// it. A path that exists without being a git checkout is fatal.
pub fn ensure_checkout(module: &ModuleConfig) -> Result<()> {
    if module.checkout_dir.exists() {
        if !module.checkout_dir.join(".git").exists() {
            return Err(Error::config(format!(
                "{} exists but is not a git working copy",
                module.checkout_dir.display()
            )));
        }
        git::pull(&module.checkout_dir)
    } else {
        info!("cloning {} into {}", module.repo_url, module.checkout_dir.display());
        git::clone(&module.repo_url, &module.checkout_dir)
    }
}

/// Walk the template tree top-down, materializing every entry into the
/// checkout and staging every written file.
pub fn walk_templates(module: &ModuleConfig, templates_root: &Path) -> Result<()> {
    info!("updating {} from {}", module.repo, templates_root.display());

    for entry in WalkDir::new(templates_root) {
        let entry = entry.map_err(|e| {
            Error::config(format!(
                "cannot walk template tree {}: {e}",
                templates_root.display()
            ))
        })?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            let dest = repo_path(module, templates_root, path)?;
            if !dest.exists() {
                debug!("{:>10} {}", "creating", dest.display());
                fs::create_dir_all(&dest)?;
            }
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        let mut dest = repo_path(module, templates_root, path)?;
        match classify(&file_name) {
            FileAction::Skip => continue,
            FileAction::Render => {
                dest.set_extension("");
                debug!("{:>10} {} from {}", "rendering", dest.display(), path.display());
                let text = fs::read_to_string(path)?;
                let rendered = render(module, path, &text)?;
                fs::write(&dest, rendered)?;
            }
            FileAction::Copy => {
                debug!("{:>10} {} from {}", "copying", dest.display(), path.display());
                fs::copy(path, &dest)?;
            }
        }

        let relative = dest.strip_prefix(&module.checkout_dir).map_err(|_| {
            Error::config(format!(
                "mapped path {} escapes the checkout {}",
                dest.display(),
                module.checkout_dir.display()
            ))
        })?;
        git::add(&module.checkout_dir, relative)?;
    }

    Ok(())
}

/// Commit staged and unstaged changes when present. Returns whether a
/// commit was made; a clean tree is a successful no-op.
pub fn commit_if_dirty(module: &ModuleConfig) -> Result<bool> {
    let status = git::status_porcelain(&module.checkout_dir)?;
    if status.trim().is_empty() {
        debug!("{} is clean, nothing to commit", module.repo);
        return Ok(false);
    }

    let message = build_commit_message(module);
    git::commit(&module.checkout_dir, &message)?;
    info!("committed update to {}", module.repo);
    Ok(true)
}

/// Build the commit message: a structured upstream header when upstream
/// metadata is present, and always a trailer naming the tool version and
/// its origin.
pub fn build_commit_message(module: &ModuleConfig) -> String {
    let mut message = String::new();

    if let (Some(describe), Some(version), Some(hash), Some(src), Some(git_msg)) = (
        &module.git_describe,
        &module.version,
        &module.git_hash,
        &module.src,
        &module.git_msg,
    ) {
        message.push_str(&format!("Updating data to {describe}\n\n"));
        message.push_str(&format!("Updated to {version} based on {hash} from {src}.\n"));
        message.push_str(&quote_block(git_msg));
        message.push('\n');
    }

    message.push_str(&format!(
        "Updated using {} from {}\n",
        module.tool_describe, TOOL_ORIGIN
    ));
    message
}

/// Reformat an upstream log message as an indented quoted block.
fn quote_block(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold the upstream mirror into the embed directory: a subtree add on
/// first import, a subtree pull afterwards. Modules without an upstream
/// source have nothing to merge.
pub fn subtree_merge(module: &ModuleConfig) -> Result<()> {
    if module.src.is_none() {
        return Ok(());
    }
    let (Some(src_local), Some(hash)) = (&module.src_local, &module.git_hash) else {
        return Err(Error::config(format!(
            "module {} has an upstream source but no resolved mirror state",
            module.name
        )));
    };

    let op = if module.checkout_dir.join(&module.dir).exists() {
        SubtreeOp::Pull
    } else {
        SubtreeOp::Add
    };
    info!("subtree {} of {} at {} into {}", op.as_str(), module.repo, hash, module.dir);
    git::subtree(&module.checkout_dir, op, &module.dir, src_local, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;
    use std::path::PathBuf;

    fn module_with_upstream() -> ModuleConfig {
        let mut module = ModuleConfig {
            name: "serv".to_string(),
            repo: "pkg-data-fpga-serv".to_string(),
            src: Some("https://example.com/serv.git".to_string()),
            tool_describe: "v0.2-5-gabc1234".to_string(),
            ..Default::default()
        };
        module.set_upstream_state(
            PathBuf::from("/srcs/pkg-data-fpga-serv"),
            "5f0c7a7000".to_string(),
            "v1.0.1-265-g5f0c7a7".to_string(),
            Version::parse("1.0.1-265").unwrap(),
            "commit 5f0c7a7000\nAuthor: A <a@example.com>\n\n    Fix decoder\n".to_string(),
        );
        module
    }

    #[test]
    fn test_commit_message_with_upstream() {
        let message = build_commit_message(&module_with_upstream());
        assert!(message.starts_with("Updating data to v1.0.1-265-g5f0c7a7\n\n"));
        assert!(message.contains(
            "Updated to 1.0.1.post265 based on 5f0c7a7000 from https://example.com/serv.git.\n"
        ));
        // upstream log is quoted line by line, bare '>' for empty lines
        assert!(message.contains("> commit 5f0c7a7000\n"));
        assert!(message.contains(">\n>     Fix decoder\n"));
        assert!(message.ends_with(&format!(
            "Updated using v0.2-5-gabc1234 from {TOOL_ORIGIN}\n"
        )));
    }

    #[test]
    fn test_commit_message_without_upstream() {
        let module = ModuleConfig {
            tool_describe: "v0.2-5-gabc1234".to_string(),
            ..Default::default()
        };
        let message = build_commit_message(&module);
        assert_eq!(
            message,
            format!("Updated using v0.2-5-gabc1234 from {TOOL_ORIGIN}\n")
        );
    }

    #[test]
    fn test_quote_block() {
        assert_eq!(quote_block("a\n\nb\n"), "> a\n>\n> b\n>");
    }

    #[test]
    fn test_subtree_merge_without_src_is_noop() {
        let module = ModuleConfig::default();
        assert!(subtree_merge(&module).is_ok());
    }

    #[test]
    fn test_subtree_merge_requires_mirror_state() {
        let module = ModuleConfig {
            src: Some("https://example.com/serv.git".to_string()),
            ..Default::default()
        };
        let err = subtree_merge(&module).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_ensure_checkout_rejects_non_git_path() {
        let tmp = tempfile::tempdir().unwrap();
        let module = ModuleConfig {
            checkout_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let err = ensure_checkout(&module).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("not a git working copy"));
    }
}
