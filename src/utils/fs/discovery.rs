//! Source workbook discovery.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lists files in `dir` (not recursive) whose extension matches `extension`
/// case-insensitively, sorted by file name.
///
/// Office lock files (`~$name.xlsx`) and hidden files are skipped. A missing
/// directory yields an empty list.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
///
/// # Examples
///
/// ```rust,no_run
/// use gadash_cli::utils::fs::find_files_with_extension;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let workbooks = find_files_with_extension(Path::new("input"), "xlsx")?;
/// # Ok(())
/// # }
/// ```
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if name.starts_with("~$") || name.starts_with('.') {
            continue;
        }

        if path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_workbooks_sorted_and_filtered() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        fs::write(root.join("b_report.xlsx"), "").unwrap();
        fs::write(root.join("A_report.XLSX"), "").unwrap();
        fs::write(root.join("~$b_report.xlsx"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::create_dir(root.join("nested.xlsx")).unwrap();

        let files = find_files_with_extension(root, "xlsx").unwrap();
        let names: Vec<_> =
            files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["A_report.XLSX", "b_report.xlsx"]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let temp = tempdir().unwrap();
        assert!(find_files_with_extension(&temp.path().join("input"), "xlsx").unwrap().is_empty());
    }
}
