use crate::error::{EditError, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Parallel batch processing using Rayon
///
/// Each input file is an independent request: it is decoded, edited and
/// encoded on its own worker with no shared state. Nothing is written until
/// every file has been processed, so a failing batch leaves `out_dir`
/// untouched.

/// Apply `operation` to every input file and write the results into `out_dir`
/// under the input's file name.
///
/// # Example
/// ```rust,no_run
/// use pdfedit::parallel;
/// use pdfedit::pdf_ops::PdfEditor;
/// use std::path::Path;
///
/// let editor: PdfEditor = PdfEditor::default();
/// let written = parallel::process_files(
///     &["a.pdf", "b.pdf"],
///     Path::new("rotated"),
///     |bytes| editor.rotate(bytes, 90),
/// );
/// ```
pub fn process_files<P, F>(inputs: &[P], out_dir: &Path, operation: F) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path> + Sync,
    F: Fn(&[u8]) -> Result<Vec<u8>> + Sync + Send,
{
    let targets = output_paths(inputs, out_dir)?;

    let results: Vec<Vec<u8>> = inputs
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            std::fs::read(path)
                .map_err(EditError::from)
                .and_then(|bytes| operation(&bytes))
                .map_err(|e| e.in_file(path))
        })
        .collect::<Result<_>>()?;

    std::fs::create_dir_all(out_dir)?;
    for (target, bytes) in targets.iter().zip(&results) {
        std::fs::write(target, bytes)?;
    }
    info!(files = targets.len(), out_dir = %out_dir.display(), "[batch] processed files");
    Ok(targets)
}

/// `out_dir/<file name>` for each input; two inputs may not share a name.
fn output_paths<P: AsRef<Path>>(inputs: &[P], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let name = path.file_name().ok_or_else(|| {
                EditError::Validation(format!("'{}' is not a file path", path.display()))
            })?;
            if !seen.insert(name.to_os_string()) {
                return Err(EditError::Validation(format!(
                    "more than one input is named '{}'",
                    name.to_string_lossy()
                )));
            }
            Ok(out_dir.join(name))
        })
        .collect()
}
