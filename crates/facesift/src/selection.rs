//! Native dialogs for picking the reference images and the candidate folder.

use crate::worker::Job;
use std::path::PathBuf;
use thiserror::Error;

/// Extensions offered by the reference picker's image filter.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no reference images selected")]
    NoReferences,
    #[error("no image folder selected")]
    NoFolder,
}

/// Multi-select file dialog. Returns an empty list when cancelled.
pub fn select_references() -> Vec<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select Reference Images")
        .add_filter("Images", IMAGE_EXTENSIONS)
        .add_filter("All files", &["*"])
        .pick_files()
        .unwrap_or_default()
}

/// Folder picker. Returns `None` when cancelled.
pub fn select_folder() -> Option<PathBuf> {
    rfd::FileDialog::new().set_title("Select Image Folder").pick_folder()
}

/// Build the job from command-line paths, asking through dialogs for
/// whatever was not given.
pub fn resolve(references: Vec<PathBuf>, folder: Option<PathBuf>) -> Result<Job, SelectionError> {
    resolve_with(references, folder, select_references, select_folder)
}

pub fn resolve_with(
    references: Vec<PathBuf>,
    folder: Option<PathBuf>,
    pick_references: impl FnOnce() -> Vec<PathBuf>,
    pick_folder: impl FnOnce() -> Option<PathBuf>,
) -> Result<Job, SelectionError> {
    let references = if references.is_empty() { pick_references() } else { references };
    if references.is_empty() {
        return Err(SelectionError::NoReferences);
    }

    let folder = folder.or_else(pick_folder).ok_or(SelectionError::NoFolder)?;

    tracing::info!(
        references = references.len(),
        folder = %folder.display(),
        "selection complete"
    );
    Ok(Job { references, folder })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_paths_skip_dialogs() {
        let job = resolve_with(
            vec![PathBuf::from("r.jpg")],
            Some(PathBuf::from("photos")),
            || panic!("reference dialog should not open"),
            || panic!("folder dialog should not open"),
        )
        .unwrap();
        assert_eq!(job.references, vec![PathBuf::from("r.jpg")]);
        assert_eq!(job.folder, PathBuf::from("photos"));
    }

    #[test]
    fn test_dialogs_fill_missing_inputs() {
        let job = resolve_with(
            vec![],
            None,
            || vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
            || Some(PathBuf::from("candidates")),
        )
        .unwrap();
        assert_eq!(job.references.len(), 2);
        assert_eq!(job.folder, PathBuf::from("candidates"));
    }

    #[test]
    fn test_cancelled_reference_dialog() {
        let err = resolve_with(vec![], None, Vec::new, || Some(PathBuf::from("x"))).unwrap_err();
        assert_eq!(err, SelectionError::NoReferences);
    }

    #[test]
    fn test_cancelled_folder_dialog() {
        let err = resolve_with(vec![PathBuf::from("r.jpg")], None, Vec::new, || None).unwrap_err();
        assert_eq!(err, SelectionError::NoFolder);
    }
}
