use crate::error::AppError;
use std::collections::HashSet;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Expands the given paths into the list of files to upload.
///
/// Files named directly are kept as they are. Directories are walked and
/// only files with an allowed extension are picked up.
pub fn collect_uploads(paths: &[PathBuf], allowed_extensions: &HashSet<String>) -> Result<Vec<PathBuf>, AppError> {
    log::debug!("Configured allowed extensions: {:?}", allowed_extensions);

    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            log::trace!("Using file as given: {:?}", path);
            files.push(path.clone());
            continue;
        }

        log::info!("Collecting photos in {:?}", path);

        let mut found = Vec::new();

        for entry in WalkDir::new(path) {
            let entry = entry?;

            if !entry.file_type().is_file() {
                log::trace!("Skipping non-file entry: {:?}", entry.path());
                continue;
            }

            let path = entry.path();

            match path.extension().and_then(|s| s.to_str()) {
                Some(ext) if allowed_extensions.contains(&ext.to_lowercase()) => {
                    log::debug!("Queueing photo for upload: {:?}", path);
                    found.push(path.to_path_buf());
                }
                Some(_) => log::trace!("Skipping file due to unsupported extension: {:?}", path),
                None => log::trace!("Skipping file with no extension: {:?}", path),
            }
        }

        // walk order is platform dependent
        found.sort();
        files.extend(found);
    }

    Ok(files)
}
