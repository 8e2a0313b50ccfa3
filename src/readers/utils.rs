use super::types::{FileError, FileType, ReadError};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub fn reader_from_filetype(path: &Path) -> Result<FileType, FileError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tif") | Some("tiff") => Ok(FileType::GeoTiff),
        _ => Err(FileError::UnknownFileType),
    }
}

fn is_pattern(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Resolve a configured input path to the files it names.
///
/// Glob patterns expand to every match, sorted. A plain path that does not
/// exist is searched by file name under `search_directory`, recursively.
pub fn resolve_paths(path: &str, search_directory: Option<&Path>) -> Result<Vec<PathBuf>, ReadError> {
    if is_pattern(path) {
        let mut matches = glob::glob(path)
            .map_err(|e| ReadError::Pattern(format!("{}: {}", path, e)))?
            .filter_map(|entry| entry.ok())
            .collect::<Vec<_>>();
        matches.sort();

        if matches.is_empty() {
            return Err(ReadError::NotFound(path.to_string()));
        }
        return Ok(matches);
    }

    let direct = Path::new(path);
    if direct.exists() {
        return Ok(vec![direct.to_path_buf()]);
    }

    if let Some(base_dir) = search_directory
        && let Some(file_name) = direct.file_name()
        && let Some(found) = search_file_recursively(base_dir, &file_name.to_string_lossy())
    {
        debug!("Resolved {} to {}", path, found.display());
        return Ok(vec![found]);
    }

    Err(ReadError::NotFound(path.to_string()))
}

/// Search for a file recursively within a directory
fn search_file_recursively(base_dir: &Path, filename: &str) -> Option<PathBuf> {
    if !base_dir.exists() {
        return None;
    }

    WalkDir::new(base_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_string_lossy() == filename)
        .map(|entry| entry.into_path())
}
