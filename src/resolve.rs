use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn is_sql(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("sql"))
        .unwrap_or(false)
}

/// Recursively collect `.sql` files under `root`, in file-name order.
/// A plain file is returned as-is.
pub fn collect_sql_files(root: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(root).map_err(|e| Error::io(root, e))?;
    if !meta.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_sql(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Expand a mix of files and directories into a deduplicated list of SQL files.
pub fn resolve_files<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for input in inputs {
        let input = input.as_ref();
        if input.as_os_str().is_empty() {
            continue;
        }
        let meta = fs::metadata(input).map_err(|e| Error::io(input, e))?;
        let found = if meta.is_dir() {
            collect_sql_files(input)?
        } else if is_sql(input) {
            vec![input.to_path_buf()]
        } else {
            tracing::debug!(path = %input.display(), "skipping non-SQL input");
            continue;
        };
        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }
    if files.is_empty() {
        return Err(Error::NoInputs {
            inputs: inputs.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        });
    }
    Ok(files)
}

/// Split comma-separated command-line inputs, dropping blanks.
pub fn split_inputs(input: &str) -> Vec<PathBuf> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}
