//! Finding and loading BC3 files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bc3::{parse_bytes, Config, Document, ParseOptions};
use rayon::prelude::*;
use walkdir::WalkDir;

const EXTENSION: &str = "bc3";

/// A parsed input file.
#[derive(Debug)]
pub struct Input {
    pub path: PathBuf,
    pub document: Document,
}

/// Expands the given paths into BC3 files.
///
/// Files are taken as given, whatever their extension. Directories are
/// walked recursively for `*.bc3` files, in file name order.
pub fn collect_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && has_bc3_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    tracing::debug!(files = files.len(), "collected input files");
    Ok(files)
}

fn has_bc3_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(EXTENSION))
}

/// Reads and parses every file in parallel, keeping the input order.
pub fn load(paths: &[PathBuf], config: &Config) -> anyhow::Result<Vec<Input>> {
    let options = ParseOptions::from(config);
    paths
        .par_iter()
        .map(|path| -> anyhow::Result<Input> {
            let raw =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let options = ParseOptions {
                source: Some(path.display().to_string()),
                ..options.clone()
            };
            Ok(Input {
                path: path.clone(),
                document: parse_bytes(&raw, &options),
            })
        })
        .collect()
}
