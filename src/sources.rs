//! Landing-directory scan.
//!
//! The transport collaborator (an external scheduler plus whatever fetch
//! mechanism it uses) drops source files into a local landing directory.
//! This module turns that directory into a list of [`SourceDocument`]s with
//! declared kinds. A missing landing directory means the transport delivered
//! nothing, which is an empty list rather than a failure.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

use walkdir::WalkDir;

use crate::config::Config;
use crate::models::{DocumentKind, SourceDocument};

pub fn scan_landing(config: &Config) -> Result<Vec<SourceDocument>> {
    let ingest = &config.ingest;
    let root = &ingest.landing_dir;

    if !root.exists() {
        return Ok(Vec::new());
    }

    let include_set = build_globset(&ingest.include_globs)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !include_set.is_match(relative) {
            continue;
        }

        // Files without a recognized kind are skipped, not fatal
        let Some(kind) = DocumentKind::from_path(path) else {
            continue;
        };

        documents.push(SourceDocument::new(path.to_path_buf(), kind));
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
