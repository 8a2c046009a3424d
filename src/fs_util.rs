use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteStatus {
    Written { path: String },
    Overwritten { path: String },
    Conflict { path: String },
}

impl WriteStatus {
    pub fn path(&self) -> &str {
        match self {
            WriteStatus::Written { path }
            | WriteStatus::Overwritten { path }
            | WriteStatus::Conflict { path } => path,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteStatus::Conflict { .. })
    }
}

pub fn glob_utf8(pattern: &str) -> Result<Vec<Utf8PathBuf>, CatalogError> {
    let entries = glob::glob(pattern).map_err(|err| CatalogError::InvalidGlob {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => match Utf8PathBuf::from_path_buf(path) {
                Ok(path) => paths.push(path),
                Err(path) => debug!(path = %path.display(), "skipping non-utf8 path"),
            },
            Err(err) => debug!(error = %err, "skipping unreadable glob entry"),
        }
    }
    Ok(paths)
}

pub fn list_subdirs(dir: &Utf8Path) -> Result<Vec<String>, CatalogError> {
    let pattern = format!("{}/*", glob::Pattern::escape(dir.as_str()));
    let mut names = glob_utf8(&pattern)?
        .into_iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| path.file_name().map(str::to_string))
        .collect::<Vec<_>>();
    names.sort();
    Ok(names)
}

pub fn file_size(path: &Utf8Path) -> Option<u64> {
    fs::metadata(path.as_std_path()).ok().map(|meta| meta.len())
}

pub fn human_size(bytes: u64) -> String {
    const SYMBOLS: [&str; 7] = ["Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];
    for (idx, symbol) in SYMBOLS.iter().enumerate().rev() {
        let unit = 1u128 << (10 * (idx + 1));
        if u128::from(bytes) >= unit {
            return format!("{:.1}{symbol}", bytes as f64 / unit as f64);
        }
    }
    format!("{:.1}Bi", bytes as f64)
}

pub fn ensure_parent(path: &Utf8Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CatalogError::Filesystem(format!("create {parent}: {err}")))?;
        }
    }
    Ok(())
}

/// Writes `content` to a path that must not exist yet.
pub fn write_new(path: &Utf8Path, content: &[u8]) -> Result<WriteStatus, CatalogError> {
    ensure_parent(path)?;
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path.as_std_path());
    let file = match file {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            warn!(%path, "refusing to overwrite existing file");
            return Ok(WriteStatus::Conflict {
                path: path.to_string(),
            });
        }
        Err(err) => return Err(CatalogError::Filesystem(format!("create {path}: {err}"))),
    };
    fill_new(path, file, content)?;
    Ok(WriteStatus::Written {
        path: path.to_string(),
    })
}

// Removes the partial file when the write fails.
fn fill_new<W: Write>(path: &Utf8Path, mut file: W, content: &[u8]) -> Result<(), CatalogError> {
    if let Err(err) = file.write_all(content).and_then(|()| file.flush()) {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path.as_std_path()) {
            warn!(%path, error = %remove_err, "failed to remove partial file");
        }
        return Err(CatalogError::Filesystem(format!("write {path}: {err}")));
    }
    Ok(())
}

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CatalogError> {
    ensure_parent(path)?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix("kira-sc-file")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Writes `content`, replacing an existing file only when `overwrite` is set.
pub fn write_file(
    path: &Utf8Path,
    content: &[u8],
    overwrite: bool,
) -> Result<WriteStatus, CatalogError> {
    if !overwrite {
        return write_new(path, content);
    }
    let existed = path.as_std_path().exists();
    write_atomic(path, content)?;
    let path = path.to_string();
    Ok(if existed {
        WriteStatus::Overwritten { path }
    } else {
        WriteStatus::Written { path }
    })
}
