//! # Remote Repository Reconciliation
//!
//! Before a module is synchronized, its destination repository on the
//! hosting service is reconciled: looked up, its metadata updated, and
//! created under the configured organization when it persistently does
//! not exist. The trait seam keeps the pipeline testable without network
//! access; the GitHub implementation talks to the REST API with a
//! blocking client.
//!
//! Reconciliation is bounded: [`with_attempts`] runs the
//! lookup/create cycle at most [`MAX_ATTEMPTS`] times, and a module whose
//! repository never materializes is skipped entirely rather than retried
//! forever.

use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::config::{AuthMode, ModuleConfig};
use crate::error::{Error, Result};

/// Attempt budget for the lookup/create cycle.
pub const MAX_ATTEMPTS: u32 = 3;

const API_ROOT: &str = "https://api.github.com";

/// Outcome of one attempt in a bounded-retry loop.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Finished; stop retrying.
    Done(T),
    /// Not there yet; spend another attempt if the budget allows.
    Retry,
}

/// Run `op` up to `budget` times (attempt numbers start at 1). Returns
/// `Ok(None)` when the budget runs out without a `Done`; errors abort
/// immediately.
pub fn with_attempts<T>(
    budget: u32,
    mut op: impl FnMut(u32) -> Result<Attempt<T>>,
) -> Result<Option<T>> {
    for attempt in 1..=budget {
        match op(attempt)? {
            Attempt::Done(value) => return Ok(Some(value)),
            Attempt::Retry => {}
        }
    }
    Ok(None)
}

/// Destination repository metadata kept in sync on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub description: String,
    pub homepage: Option<String>,
}

impl RepoMetadata {
    /// Metadata for a module's destination repository. Generated-source
    /// modules point their homepage at the generator input.
    pub fn for_module(module: &ModuleConfig) -> RepoMetadata {
        RepoMetadata {
            description: format!(
                "Packaged data files for using {} via {}",
                module.human_name, module.import_path
            ),
            homepage: module.gen_src.clone().or_else(|| module.src.clone()),
        }
    }
}

/// Reconcile a destination repository on the hosting service.
pub trait RemoteReconciler {
    /// Ensure the named repository exists with the given metadata,
    /// creating it when the lookup persistently fails. Returns whether
    /// the repository existed before this call.
    fn ensure_repo(&self, name: &str, metadata: &RepoMetadata) -> Result<bool>;
}

/// No-op reconciler for `--no-remote` runs and tests.
pub struct Disabled;

impl RemoteReconciler for Disabled {
    fn ensure_repo(&self, name: &str, _metadata: &RepoMetadata) -> Result<bool> {
        debug!("remote reconciliation disabled, assuming {name} exists");
        Ok(true)
    }
}

/// Request body for both repository creation and metadata updates.
/// Issues, wikis, downloads and project boards stay disabled; the
/// repositories are machine-maintained.
#[derive(Debug, Serialize)]
struct RepoPayload<'a> {
    name: &'a str,
    description: &'a str,
    homepage: Option<&'a str>,
    has_issues: bool,
    has_wiki: bool,
    has_downloads: bool,
    has_projects: bool,
}

impl<'a> RepoPayload<'a> {
    fn new(name: &'a str, metadata: &'a RepoMetadata) -> RepoPayload<'a> {
        RepoPayload {
            name,
            description: &metadata.description,
            homepage: metadata.homepage.as_deref(),
            has_issues: false,
            has_wiki: false,
            has_downloads: false,
            has_projects: false,
        }
    }
}

/// GitHub REST reconciler.
pub struct GithubReconciler {
    client: Client,
    api_root: String,
    org: String,
    auth: AuthMode,
}

impl GithubReconciler {
    pub fn new(org: String, auth: AuthMode) -> GithubReconciler {
        GithubReconciler {
            client: Client::new(),
            api_root: API_ROOT.to_string(),
            org,
            auth,
        }
    }

    fn request(&self, method: Method, url: String) -> reqwest::blocking::RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .header(USER_AGENT, concat!("pkg-mirror/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = self.auth.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Whether the repository currently exists.
    fn lookup(&self, name: &str) -> Result<bool> {
        let url = format!("{}/repos/{}/{}", self.api_root, self.org, name);
        let response = self.request(Method::GET, url).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(Error::RemoteReconcile {
                repo: name.to_string(),
                message: format!("lookup failed with status {status}"),
            }),
        }
    }

    fn update(&self, name: &str, metadata: &RepoMetadata) -> Result<()> {
        let url = format!("{}/repos/{}/{}", self.api_root, self.org, name);
        let response = self
            .request(Method::PATCH, url)
            .json(&RepoPayload::new(name, metadata))
            .send()?;
        if !response.status().is_success() {
            return Err(Error::RemoteReconcile {
                repo: name.to_string(),
                message: format!("metadata update failed with status {}", response.status()),
            });
        }
        Ok(())
    }

    fn create(&self, name: &str, metadata: &RepoMetadata) -> Result<()> {
        let url = format!("{}/orgs/{}/repos", self.api_root, self.org);
        let response = self
            .request(Method::POST, url)
            .json(&RepoPayload::new(name, metadata))
            .send()?;
        if !response.status().is_success() {
            return Err(Error::RemoteReconcile {
                repo: name.to_string(),
                message: format!("creation failed with status {}", response.status()),
            });
        }
        Ok(())
    }
}

impl RemoteReconciler for GithubReconciler {
    fn ensure_repo(&self, name: &str, metadata: &RepoMetadata) -> Result<bool> {
        let existed = with_attempts(MAX_ATTEMPTS, |attempt| {
            if self.lookup(name)? {
                self.update(name, metadata)?;
                Ok(Attempt::Done(true))
            } else {
                warn!(
                    "repository {}/{name} not found (attempt {attempt}/{MAX_ATTEMPTS}), creating",
                    self.org
                );
                self.create(name, metadata)?;
                Ok(Attempt::Retry)
            }
        })?;

        existed.ok_or_else(|| Error::RemoteReconcile {
            repo: name.to_string(),
            message: format!("repository still missing after {MAX_ATTEMPTS} attempts"),
        })
    }
}
