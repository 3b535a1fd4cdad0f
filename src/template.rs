//! # Template Path Mapping and Rendering
//!
//! The template tree is a read-only directory tree whose path segments
//! are either literal or placeholders of the form `__key__`. A
//! placeholder segment is replaced wholesale by the module configuration
//! value for `key`, never partially substituted. File names ending in
//! `.jinja` are rendered through minijinja and lose the extension; editor
//! swap files are skipped; everything else is copied byte-for-byte.
//!
//! Path mapping is pure: the same module configuration and template path
//! always produce the same destination path, with no filesystem access.

use std::path::{Component, Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::config::ModuleConfig;
use crate::error::{Error, Result};

/// File extension of templates that go through the renderer.
pub const TEMPLATE_EXT: &str = "jinja";

/// Editor swap file extensions, never synchronized.
const SWAP_EXTS: &[&str] = &["swp", "swo"];

/// How the sync walk treats one template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Render through the template engine, stripping the extension.
    Render,
    /// Copy byte-for-byte.
    Copy,
    /// Skip entirely.
    Skip,
}

/// Classify a template file by its extension.
pub fn classify(file_name: &str) -> FileAction {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext == TEMPLATE_EXT => FileAction::Render,
        Some(ext) if SWAP_EXTS.contains(&ext) => FileAction::Skip,
        _ => FileAction::Copy,
    }
}

/// Split a path into normalized segments, resolving `.` and `..` and
/// dropping any root.
///
/// `/a/b/../` and `a/b/../` both normalize to `[a]`; `/a/b/./` and
/// `a/b/./` both normalize to `[a, b]`.
pub fn split_segments(path: &Path) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                segments.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    segments
}

/// Map a template path to its destination inside the module's checkout.
///
/// The path is taken relative to `template_root`, normalized, and each
/// `__key__` segment is rewritten to the module's value for `key`. A
/// missing placeholder value is a configuration error, as is a malformed
/// marker (trailing `__` without the leading one).
pub fn repo_path(module: &ModuleConfig, template_root: &Path, path: &Path) -> Result<PathBuf> {
    let relative = path.strip_prefix(template_root).map_err(|_| {
        Error::config(format!(
            "template path {} is outside the template root {}",
            path.display(),
            template_root.display()
        ))
    })?;

    let mut out = module.checkout_dir.clone();
    for segment in split_segments(relative) {
        if !segment.ends_with("__") {
            out.push(segment);
            continue;
        }
        let key = segment
            .strip_prefix("__")
            .and_then(|s| s.strip_suffix("__"))
            .ok_or_else(|| {
                Error::config(format!("malformed placeholder segment {segment:?}"))
            })?;
        let value = module.var(key).ok_or_else(|| Error::Config {
            message: format!("no value for placeholder '__{key}__'"),
            hint: Some(format!("add '{key}' to the module section")),
        })?;
        out.push(value);
    }
    Ok(out)
}

/// Render template text against the module's configuration context.
///
/// Undefined variables are errors, not empty output, and the result is
/// normalized to exactly one trailing newline when non-empty.
/// `template_path` only labels errors.
pub fn render(module: &ModuleConfig, template_path: &Path, text: &str) -> Result<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let context = Value::from_serialize(&module.vars());
    let rendered = env.render_str(text, context).map_err(|e| Error::Render {
        path: template_path.display().to_string(),
        message: e.to_string(),
    })?;

    let trimmed = rendered.trim_end_matches('\n');
    if trimmed.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{trimmed}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with(pairs: &[(&str, &str)], checkout: &str) -> ModuleConfig {
        let mut module = ModuleConfig {
            checkout_dir: PathBuf::from(checkout),
            ..Default::default()
        };
        for (k, v) in pairs {
            module.extra.insert(k.to_string(), v.to_string());
        }
        module
    }

    #[test]
    fn test_split_segments_plain() {
        assert_eq!(split_segments(Path::new("/a/b/c/d")), vec!["a", "b", "c", "d"]);
        assert_eq!(split_segments(Path::new("a/b/c/d")), vec!["a", "b", "c", "d"]);
        assert_eq!(split_segments(Path::new("/a/b/c/")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_segments_parent() {
        assert_eq!(split_segments(Path::new("/a/b/../")), vec!["a"]);
        assert_eq!(split_segments(Path::new("a/b/../")), vec!["a"]);
    }

    #[test]
    fn test_split_segments_curdir() {
        assert_eq!(split_segments(Path::new("/a/b/./")), vec!["a", "b"]);
        assert_eq!(split_segments(Path::new("a/b/./")), vec!["a", "b"]);
    }

    #[test]
    fn test_repo_path_literal() {
        let module = module_with(&[], "repos/r");
        assert_eq!(
            repo_path(&module, Path::new("t"), Path::new("t/a")).unwrap(),
            PathBuf::from("repos/r/a")
        );
        assert_eq!(
            repo_path(&module, Path::new("t"), Path::new("t/a/b")).unwrap(),
            PathBuf::from("repos/r/a/b")
        );
    }

    #[test]
    fn test_repo_path_placeholder() {
        let module = module_with(&[("a", "c")], "repos/r");
        assert_eq!(
            repo_path(&module, Path::new("t"), Path::new("t/__a__/b")).unwrap(),
            PathBuf::from("repos/r/c/b")
        );
    }

    #[test]
    fn test_repo_path_typed_placeholder() {
        let mut module = module_with(&[], "repos/pkg-data-fpga-serv");
        module.import_path = "pkg.data.fpga.serv".to_string();
        assert_eq!(
            repo_path(
                &module,
                Path::new("templates"),
                Path::new("templates/__import_path__/data.py")
            )
            .unwrap(),
            PathBuf::from("repos/pkg-data-fpga-serv/pkg.data.fpga.serv/data.py")
        );
    }

    #[test]
    fn test_repo_path_missing_placeholder() {
        let module = module_with(&[], "repos/r");
        let err = repo_path(&module, Path::new("t"), Path::new("t/__nope__/b")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("__nope__"));
    }

    #[test]
    fn test_repo_path_malformed_marker() {
        let module = module_with(&[], "repos/r");
        let err = repo_path(&module, Path::new("t"), Path::new("t/oops__/b")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_repo_path_root_maps_to_checkout() {
        let module = module_with(&[], "repos/r");
        assert_eq!(
            repo_path(&module, Path::new("t"), Path::new("t")).unwrap(),
            PathBuf::from("repos/r")
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("setup.py.jinja"), FileAction::Render);
        assert_eq!(classify("README.md"), FileAction::Copy);
        assert_eq!(classify(".setup.py.swp"), FileAction::Skip);
        assert_eq!(classify("foo.swo"), FileAction::Skip);
        assert_eq!(classify("Makefile"), FileAction::Copy);
    }

    #[test]
    fn test_render_substitution() {
        let mut module = module_with(&[], "repos/r");
        module.human_name = "SERV".to_string();
        module.repo = "pkg-data-fpga-serv".to_string();
        let out = render(
            &module,
            Path::new("t/README.md.jinja"),
            "# {{ human_name }}\n\nLives in {{ repo }}.",
        )
        .unwrap();
        assert_eq!(out, "# SERV\n\nLives in pkg-data-fpga-serv.\n");
    }

    #[test]
    fn test_render_conditionals_and_loops() {
        let mut module = module_with(&[], "repos/r");
        module.src = Some("https://example.com/serv.git".to_string());
        let out = render(
            &module,
            Path::new("t/x.jinja"),
            "{% if src %}from {{ src }}{% endif %}\n{% for c in \"ab\" %}{{ c }}{% endfor %}",
        )
        .unwrap();
        assert_eq!(out, "from https://example.com/serv.git\nab\n");
    }

    #[test]
    fn test_render_exactly_one_trailing_newline() {
        let module = module_with(&[], "repos/r");
        assert_eq!(render(&module, Path::new("t"), "x").unwrap(), "x\n");
        assert_eq!(render(&module, Path::new("t"), "x\n\n\n").unwrap(), "x\n");
        assert_eq!(render(&module, Path::new("t"), "").unwrap(), "");
    }

    #[test]
    fn test_render_undefined_variable_fails() {
        let module = module_with(&[], "repos/r");
        let err = render(&module, Path::new("t/bad.jinja"), "{{ nope }}").unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
        assert!(err.to_string().contains("t/bad.jinja"));
    }

    #[test]
    fn test_render_syntax_error_fails() {
        let module = module_with(&[], "repos/r");
        let err = render(&module, Path::new("t/bad.jinja"), "{% if %}").unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }
}
