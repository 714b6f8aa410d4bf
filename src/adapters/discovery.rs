use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

const CSV_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DiscoveryError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) => path.as_path(),
            Self::ReadDir { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedInputs {
    pub files: Vec<PathBuf>,
    pub failures: Vec<DiscoveryError>,
}

/// Expands user paths into CSV files. Files are kept in the order given;
/// a directory contributes its immediate `*.csv` children sorted by path.
pub fn resolve_inputs<I, P>(paths: I) -> ResolvedInputs
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut resolved = ResolvedInputs::default();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            match csv_children(path) {
                Ok(children) => {
                    if children.is_empty() {
                        tracing::warn!(path = %path.display(), "directory contains no csv files");
                    }
                    resolved.files.extend(children);
                }
                Err(source) => resolved.failures.push(DiscoveryError::ReadDir {
                    path: path.to_path_buf(),
                    source,
                }),
            }
        } else if path.exists() {
            resolved.files.push(path.to_path_buf());
        } else {
            resolved
                .failures
                .push(DiscoveryError::NotFound(path.to_path_buf()));
        }
    }

    resolved
}

fn csv_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_csv_extension(&path) {
            children.push(path);
        }
    }
    children.sort();
    Ok(children)
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(CSV_EXTENSION))
}
