//! Subcommands and the source loading they share

pub mod check;
pub mod symbols;

use anyhow::Context;
use sluice_engine::{Binder, BinderConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::BindArgs;

/// Extension of Sluice source files
const SOURCE_EXTENSION: &str = "spl";

/// Collect all source files from the given paths (files or directories).
pub fn collect_source_files(paths: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path_str in paths {
        let path = Path::new(path_str);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            collect_in_dir(path, &mut files)?;
        } else {
            anyhow::bail!("no such file or directory: {}", path_str);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Recursively collect source files in a directory, skipping hidden ones
fn collect_in_dir(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_in_dir(&path, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}

/// Configuration from `--config`, overridden by the individual flags
pub fn binder_config(args: &BindArgs) -> anyhow::Result<BinderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            BinderConfig::from_json(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => BinderConfig::default(),
    };
    if args.syntax_only {
        config.syntax_only = true;
    }
    if let Some(main) = &args.main {
        config.main_composite = Some(main.clone());
    }
    Ok(config)
}

/// Read and bind every source named by `args`; returns the binder and the file count
pub fn bind_sources(args: &BindArgs, config: BinderConfig) -> anyhow::Result<(Binder, usize)> {
    let files = collect_source_files(&args.files)?;
    if files.is_empty() {
        anyhow::bail!("no .{} files found", SOURCE_EXTENSION);
    }
    let mut binder = Binder::new(config);
    for path in &files {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        debug!(file = %path.display(), bytes = source.len(), "adding source");
        binder.add_source(path.display().to_string(), source);
    }
    binder.bind();
    Ok((binder, files.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(files: Vec<String>) -> BindArgs {
        BindArgs {
            files,
            config: None,
            main: None,
            syntax_only: false,
        }
    }

    #[test]
    fn test_collects_sources_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("a.spl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("nested/b.spl"), "").unwrap();
        fs::write(dir.path().join(".hidden/c.spl"), "").unwrap();

        let files = collect_source_files(&[dir.path().display().to_string()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "spl"));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(collect_source_files(&["/definitely/not/here".into()]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sluice.json");
        fs::write(&path, r#"{ "main_composite": "a::Main", "syntax_only": false }"#).unwrap();

        let mut bind = args(vec![]);
        bind.config = Some(path);
        bind.syntax_only = true;
        let config = binder_config(&bind).unwrap();
        assert!(config.syntax_only);
        assert_eq!(config.main_composite.as_deref(), Some("a::Main"));

        bind.main = Some("b::Main".into());
        let config = binder_config(&bind).unwrap();
        assert_eq!(config.main_composite.as_deref(), Some("b::Main"));
    }

    #[test]
    fn test_bind_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.spl"),
            "namespace demo; type T = tuple<int32 a>; composite Main { }",
        )
        .unwrap();
        let bind = args(vec![dir.path().display().to_string()]);
        let (binder, count) = bind_sources(&bind, BinderConfig::default()).unwrap();
        assert_eq!(count, 1);
        assert!(!binder.diagnostics().has_errors());
        assert_eq!(binder.main_instances().len(), 1);
    }
}
