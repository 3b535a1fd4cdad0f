//! # Package Mirror Library
//!
//! This library keeps a family of downstream packaging repositories in
//! sync with their upstream sources. It is designed to be used by the
//! `pkg-mirror` command-line tool but the pieces are usable on their own.
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The module list INI file with its
//!   global settings, and the typed per-module configuration derived from
//!   it that flows through every stage.
//! - **Versioning (`version`)**: Parsing git tags and `git describe`
//!   output into structured versions, and joining the tool and data
//!   versions into the combined version stamped into generated files.
//! - **Templates (`template`)**: Mapping template tree paths (including
//!   `__key__` placeholder segments) to destination paths, and rendering
//!   `.jinja` files against the module configuration.
//! - **Git (`git`, `mirror`)**: Subprocess wrappers around the system
//!   `git`, and the local bare mirrors kept for upstream repositories.
//! - **Remote (`remote`)**: Reconciling destination repositories on the
//!   hosting service, with a bounded create-then-recheck retry.
//! - **Synchronization (`sync`, `pipeline`)**: The per-module state
//!   machine (checkout, render, commit, subtree-merge) and the driver
//!   that runs every configured module through it, isolating failures to
//!   the module that raised them.
//!
//! ## Execution Flow
//!
//! For each module the pipeline:
//!
//! 1. Reconciles the destination repository on the hosting service.
//! 2. Mirrors the upstream repository and resolves its version from
//!    `git describe`, or reuses the recorded describe/hash pair.
//! 3. Materializes the template tree into the destination checkout and
//!    commits the result when anything changed.
//! 4. Subtree-merges the upstream history into the embed directory.
//! 5. Optionally pushes the destination repository.

pub mod config;
pub mod error;
pub mod git;
pub mod mirror;
pub mod pipeline;
pub mod remote;
pub mod sync;
pub mod template;
pub mod version;
