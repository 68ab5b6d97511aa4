use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tempfile::TempPath;

use crate::utils::config::PackagePaths;

/// Uniquely named sibling of `dest` to write into (`.photo.avif.Xa3kq9.part`). Two items that
/// map to the same output get different partial files. The file is removed when the returned
/// path is dropped without being persisted.
pub fn create_partial(dest: &Path) -> Result<TempPath> {
    let paths = PackagePaths::get();
    let parent = dest.parent().unwrap_or(Path::new("."));
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(paths.partial_suffix())
        .tempfile_in(parent)
        .with_context(|| format!("create partial output in {}", parent.display()))?;
    Ok(file.into_temp_path())
}

/// Atomically move a finished partial file onto `dest`, replacing whatever is there.
pub fn persist_partial(partial: TempPath, dest: &Path) -> Result<()> {
    partial.persist(dest).map_err(|e| {
        anyhow::Error::new(e.error).context(format!(
            "move finished output into place ({})",
            dest.display()
        ))
    })
}

/// Create `root` if needed and prove it is a writable directory (probe file written then removed).
pub fn ensure_writable_dir(root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("create output root {}", root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("output root {} is not a directory", root.display());
    }
    let probe = root.join(PackagePaths::get().probe_filename());
    fs::write(&probe, b"")
        .with_context(|| format!("output root {} is not writable", root.display()))?;
    let _ = fs::remove_file(&probe);
    Ok(())
}
