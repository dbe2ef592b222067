//! Page discovery: which files on disk a scan target expands to.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct PageSet {
    pub root: PathBuf,
    pub pages: Vec<PathBuf>,
    pub error_count: u64,
}

/// Expands `root` into the HTML pages to scan.
///
/// A file is returned as-is. A directory is walked, keeping files whose path
/// relative to `root` matches `include` and skipping anything under an
/// `exclude` match. Pages come back sorted for stable output.
pub fn discover_pages(root: &Path, include: &[String], exclude: &[String]) -> Result<PageSet> {
    if root.is_file() {
        return Ok(PageSet {
            root: root.to_path_buf(),
            pages: vec![root.to_path_buf()],
            error_count: 0,
        });
    }
    if !root.is_dir() {
        anyhow::bail!("scan target does not exist: {}", root.display());
    }

    let include_set = build_glob_set(include, "include")?;
    let exclude_set = build_exclude_set(exclude)?;

    let mut pages = Vec::new();
    let mut error_count: u64 = 0;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let rel = e.path().strip_prefix(root).unwrap_or(e.path());
            !exclude_set.is_match(rel) && !exclude_set.is_match(e.path())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                error_count = error_count.saturating_add(1);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if include_set.is_match(rel) || include_set.is_match(entry.path()) {
            pages.push(entry.path().to_path_buf());
        }
    }

    pages.sort();
    Ok(PageSet {
        root: root.to_path_buf(),
        pages,
        error_count,
    })
}

pub fn validate_globs(include: &[String], exclude: &[String]) -> Result<()> {
    let _ = build_glob_set(include, "include")?;
    let _ = build_exclude_set(exclude)?;
    Ok(())
}

fn build_exclude_set(excludes: &[String]) -> Result<GlobSet> {
    let mut patterns: Vec<String> = ["**/.git", "**/.git/**", "**/target", "**/target/**"]
        .iter()
        .map(|p| p.to_string())
        .collect();
    patterns.extend(excludes.iter().cloned());
    build_glob_set(&patterns, "exclude")
}

fn build_glob_set(patterns: &[String], kind: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat).with_context(|| format!("invalid {kind} glob: {pat}"))?);
    }
    Ok(builder.build()?)
}
