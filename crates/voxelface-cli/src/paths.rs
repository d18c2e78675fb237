//! Output and backup path naming.

use std::path::{Path, PathBuf};

/// Insert a suffix before the volume extension:
/// `sub-01_T1w.nii.gz` + `_defaced` -> `sub-01_T1w_defaced.nii.gz`.
///
/// Understands the double `.nii.gz` extension; anything else gets the
/// suffix appended to the file name.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return path.to_path_buf(),
    };

    for ext in [".nii.gz", ".nii"] {
        if let Some(stem) = name.strip_suffix(ext) {
            return path.with_file_name(format!("{stem}{suffix}{ext}"));
        }
    }
    path.with_file_name(format!("{name}{suffix}"))
}

/// Default output path: the input with a `_defaced` suffix.
pub fn derive_output_path(infile: &Path) -> PathBuf {
    with_suffix(infile, "_defaced")
}

/// Backup path for in-place mode: the input with a `_faced` suffix.
pub fn backup_path(infile: &Path) -> PathBuf {
    with_suffix(infile, "_faced")
}
