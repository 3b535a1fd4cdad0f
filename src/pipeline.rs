//! # The Per-Module Pipeline
//!
//! Drives every module in the configuration through the same stages:
//! remote reconciliation, upstream version resolution, template
//! synchronization, and finally (when requested) a push of the destination
//! repository.
//!
//! A module failure is logged and isolates to that module; the remaining
//! modules still run, and the caller gets a summary naming the modules
//! that synchronized and the ones that failed.

use std::path::PathBuf;

use log::{error, info};

use crate::config::{load_modules, AuthMode, GitMode, ModuleConfig, Settings};
use crate::error::{Error, Result};
use crate::git;
use crate::mirror::UpstreamMirror;
use crate::remote::{RemoteReconciler, RepoMetadata};
use crate::sync;
use crate::version::{parse_describe, parse_tag, version_join, Version};

/// Everything the pipeline needs beyond the module list itself.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Path to the module list INI file.
    pub config: PathBuf,
    /// Root of the template tree.
    pub templates_root: PathBuf,
    /// Parent directory of destination checkouts.
    pub repos_root: PathBuf,
    /// Parent directory of upstream bare mirrors.
    pub srcs_root: PathBuf,
    /// Push destination repositories after synchronizing.
    pub push: bool,
    pub git_mode: GitMode,
    pub auth: AuthMode,
    /// `git describe` output for the tool itself.
    pub tool_describe: String,
}

/// Which modules made it through and which did not.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub synced: Vec<String>,
    pub failed: Vec<String>,
}

impl Summary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The tool's own version, from either describe output or a plain
/// version string.
pub fn parse_tool_version(raw: &str) -> Result<Version> {
    match parse_describe(raw) {
        Ok(describe) => Ok(describe.version),
        Err(_) => {
            let trimmed = raw.trim();
            Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
        }
    }
}

/// Run the pipeline over every module in the configuration.
pub fn run(opts: &PipelineOptions, reconciler: &dyn RemoteReconciler) -> Result<Summary> {
    let tool_version = parse_tool_version(&opts.tool_describe)?;
    let (settings, raw_modules) = load_modules(&opts.config)?;

    let mut summary = Summary::default();
    let mut synced = Vec::new();
    for raw in raw_modules {
        let mut module = raw.derive(
            &settings,
            opts.git_mode,
            &opts.repos_root,
            &opts.tool_describe,
        );
        info!("processing module {} -> {}", module.name, module.repo);

        match process_module(&mut module, opts, reconciler, &tool_version) {
            Ok(()) => synced.push(module),
            Err(e) => {
                error!("module {} failed: {e}", module.name);
                summary.failed.push(module.name);
            }
        }
    }

    if opts.push {
        push_modules(opts, &settings, synced, &mut summary);
    } else {
        summary.synced.extend(synced.into_iter().map(|m| m.name));
    }

    Ok(summary)
}

fn process_module(
    module: &mut ModuleConfig,
    opts: &PipelineOptions,
    reconciler: &dyn RemoteReconciler,
    tool_version: &Version,
) -> Result<()> {
    let metadata = RepoMetadata::for_module(module);
    reconciler.ensure_repo(&module.repo, &metadata)?;

    resolve_versions(module, opts, tool_version)?;

    sync::run(module, &opts.templates_root)
}

/// Push every synchronized module in a pass of its own after the sync
/// loop finishes. A failed push demotes that module to failed without
/// touching the others.
fn push_modules(
    opts: &PipelineOptions,
    settings: &Settings,
    modules: Vec<ModuleConfig>,
    summary: &mut Summary,
) {
    for module in modules {
        let push_url = opts.auth.push_url(&settings.org, &module.repo);
        info!("pushing {}", module.repo);
        match git::push(&module.checkout_dir, push_url.as_deref()) {
            Ok(()) => summary.synced.push(module.name),
            Err(e) => {
                error!("push of {} failed: {e}", module.repo);
                summary.failed.push(module.name);
            }
        }
    }
}

/// Fill in the module's version state: from the upstream mirror when it
/// has a source, from the recorded describe/hash pair otherwise. Either
/// way the combined version is the join of the tool and data versions.
fn resolve_versions(
    module: &mut ModuleConfig,
    opts: &PipelineOptions,
    tool_version: &Version,
) -> Result<()> {
    if let Some(src) = module.src.clone() {
        let mirror = UpstreamMirror::open(&opts.srcs_root, &module.repo, &src)?;
        let describe = mirror.describe(&module.branch)?;
        let hash = mirror.resolve(&module.branch)?;
        let message = mirror.commit_message(&hash)?;
        module.set_upstream_state(
            mirror.local_path()?,
            hash,
            describe.raw,
            describe.version,
            message,
        );
    } else {
        let recorded = module.git_describe.clone().ok_or_else(|| {
            Error::config(format!("module {} has no recorded git_describe", module.name))
        })?;
        // a recorded describe may be a bare tag (exactly-tagged commit)
        let version = match parse_describe(&recorded) {
            Ok(describe) => describe.version,
            Err(_) => parse_tag(&recorded)?,
        };
        module.version = Some(version);
    }

    let data_version = module.version.as_ref().ok_or_else(|| {
        Error::config(format!("module {} resolved no data version", module.name))
    })?;
    module.set_combined_version(version_join(tool_version, data_version));
    Ok(())
}
