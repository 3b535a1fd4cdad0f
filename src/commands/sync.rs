//! Sync command implementation
//!
//! Resolves the runtime environment (git transport mode, hosting-service
//! credentials, the tool's own version) and hands the module list to the
//! pipeline. The command fails when any module failed, but only after
//! every module has been attempted.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use pkg_mirror::config::{AuthMode, GitMode};
use pkg_mirror::git;
use pkg_mirror::pipeline::{self, PipelineOptions};
use pkg_mirror::remote::{Disabled, GithubReconciler, RemoteReconciler};

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the module list file
    #[arg(short, long, value_name = "PATH", default_value = "modules.ini")]
    pub config: PathBuf,

    /// Root of the template tree
    #[arg(long, value_name = "PATH", default_value = "templates")]
    pub templates: PathBuf,

    /// Parent directory for destination checkouts
    #[arg(long, value_name = "PATH", default_value = "repos")]
    pub repos_root: PathBuf,

    /// Parent directory for upstream mirrors
    #[arg(long, value_name = "PATH", default_value = "srcs")]
    pub srcs_root: PathBuf,

    /// Push destination repositories after synchronizing
    #[arg(long)]
    pub push: bool,

    /// Skip hosting-service reconciliation entirely
    #[arg(long)]
    pub no_remote: bool,

    /// Git transport for destination repository URLs (git+ssh, https)
    #[arg(long, value_name = "MODE", env = "GIT_MODE", default_value = "git+ssh")]
    pub git_mode: String,

    /// Hosting-service user for authenticated pushes
    #[arg(long, value_name = "USER", env = "GH_USER")]
    pub gh_user: Option<String>,

    /// Hosting-service token for authenticated pushes and API calls
    #[arg(long, value_name = "TOKEN", env = "GH_TOKEN", hide_env_values = true)]
    pub gh_token: Option<String>,

    /// Override the tool version instead of asking git describe
    #[arg(long, value_name = "VERSION")]
    pub tool_version: Option<String>,
}

/// Execute the sync command
pub fn execute(args: SyncArgs) -> Result<()> {
    if !args.config.exists() {
        anyhow::bail!("Module list file not found: {}", args.config.display());
    }

    let git_mode = GitMode::parse(&args.git_mode)?;
    let auth = AuthMode::resolve(args.gh_user, args.gh_token);

    let tool_describe = match args.tool_version {
        Some(version) => version,
        None => git::describe_workdir(std::path::Path::new("."), "HEAD")?,
    };

    let (settings, _) = pkg_mirror::config::load_modules(&args.config)?;
    let reconciler: Box<dyn RemoteReconciler> = if args.no_remote {
        Box::new(Disabled)
    } else {
        Box::new(GithubReconciler::new(settings.org, auth.clone()))
    };

    let opts = PipelineOptions {
        config: args.config,
        templates_root: args.templates,
        repos_root: args.repos_root,
        srcs_root: args.srcs_root,
        push: args.push,
        git_mode,
        auth,
        tool_describe,
    };

    let summary = pipeline::run(&opts, reconciler.as_ref())?;
    println!(
        "Synchronized {} module(s), {} failed",
        summary.synced.len(),
        summary.failed.len()
    );
    if !summary.all_succeeded() {
        anyhow::bail!("modules failed: {}", summary.failed.join(", "));
    }
    Ok(())
}
